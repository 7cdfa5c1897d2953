use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::CombchatsConfig};

/// Config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "combchats.toml",
    "combchats.yaml",
    "combchats.yml",
    "combchats.json",
];

/// Load config from `path` (format picked by extension) after `${ENV}`
/// substitution.
pub fn load_config(path: &Path) -> anyhow::Result<CombchatsConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    parse_config(&substitute_env(&raw), path)
}

/// Load from `explicit` when given, otherwise from the first discovered file.
///
/// An explicit path that fails to load is an error; a broken discovered
/// file is logged and replaced by defaults.
pub fn discover_and_load(explicit: Option<&Path>) -> anyhow::Result<CombchatsConfig> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading config");
        return load_config(path);
    }
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return Ok(CombchatsConfig::default());
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            Ok(CombchatsConfig::default())
        },
    }
}

/// First config file in `./`, then in [`config_dir`].
pub fn find_config_file() -> Option<PathBuf> {
    find_in(Path::new(".")).or_else(|| config_dir().and_then(|dir| find_in(&dir)))
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// User-global config directory, e.g. `~/.config/combchats/`.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "combchats").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<CombchatsConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn loads_every_supported_format() {
        let dir = tempfile::tempdir().unwrap();
        let files = [
            ("combchats.toml", "[combine]\nchannels = [\"twitch:a\"]\n"),
            ("combchats.yaml", "combine:\n  channels: [\"twitch:a\"]\n"),
            ("combchats.json", r#"{"combine": {"channels": ["twitch:a"]}}"#),
        ];
        for (name, body) in files {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            let cfg = load_config(&path).unwrap();
            assert_eq!(cfg.combine.channels, vec!["twitch:a"], "{name}");
        }
    }

    #[test]
    fn substitutes_env_before_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combchats.toml");
        // PATH is always set; the value itself does not matter.
        std::fs::write(&path, "[telegram]\ntoken = \"${PATH}\"\n").unwrap();
        let cfg = load_config(&path).unwrap();
        let token = cfg.telegram.token.unwrap();
        assert_eq!(token.expose_secret(), &std::env::var("PATH").unwrap());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combchats.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(discover_and_load(Some(&missing)).is_err());
    }

    #[test]
    fn finds_first_file_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_in(dir.path()).is_none());
        std::fs::write(dir.path().join("combchats.yml"), "{}").unwrap();
        std::fs::write(dir.path().join("combchats.json"), "{}").unwrap();
        assert_eq!(
            find_in(dir.path()).unwrap(),
            dir.path().join("combchats.yml")
        );
    }
}
