//! Configuration validation.
//!
//! Flags unknown or misspelled keys, type errors, and session settings that
//! would fail at start: unknown platforms, empty channel lists, forwarding
//! into a room without a token.

use std::{collections::HashMap, path::Path};

use combchats_relay::ForwardMode;

use crate::{
    env_subst::substitute_env,
    schema::{CombchatsConfig, EndpointConfig},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

/// A single validation finding.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// "syntax", "unknown-field", "type-error", "channel", "identity", "relay"
    pub category: &'static str,
    /// Dotted path, e.g. "forward.first.channel"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Known keys ──────────────────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

fn schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    let endpoint = || {
        Struct(HashMap::from([
            ("channel", Leaf),
            ("display_name", Leaf),
            ("token", Leaf),
        ]))
    };

    Struct(HashMap::from([
        (
            "telegram",
            Struct(HashMap::from([("token", Leaf), ("poll_timeout_secs", Leaf)])),
        ),
        (
            "vkplay",
            Struct(HashMap::from([
                ("api_base", Leaf),
                ("ws_url", Leaf),
                ("origin", Leaf),
                ("request_timeout_secs", Leaf),
            ])),
        ),
        (
            "relay",
            Struct(HashMap::from([
                ("dedup_capacity", Leaf),
                ("output_buffer", Leaf),
            ])),
        ),
        ("combine", Struct(HashMap::from([("channels", Leaf)]))),
        (
            "forward",
            Struct(HashMap::from([
                ("mode", Leaf),
                ("first", endpoint()),
                ("second", endpoint()),
            ])),
        ),
        ("metrics", Struct(HashMap::from([("enabled", Leaf)]))),
    ]))
}

/// Levenshtein edit distance.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (toml::Value::Table(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };
    let mut known: Vec<&str> = fields.keys().copied().collect();
    known.sort_unstable();

    for (key, child) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match fields.get(key.as_str()) {
            Some(child_schema) => check_unknown_fields(child, child_schema, &path, diagnostics),
            None => {
                let message = match suggest(key, &known, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic::new(
                    Severity::Error,
                    "unknown-field",
                    path,
                    message,
                ));
            },
        }
    }
}

// ── Entry points ────────────────────────────────────────────

/// Validate the file at `path`, or the discovered config when `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };
    let Some(actual) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "syntax",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let mut result = match std::fs::read_to_string(&actual) {
        Ok(raw) => match actual.extension().and_then(|e| e.to_str()) {
            Some("toml") | None => validate_toml_str(&substitute_env(&raw)),
            Some(_) => match crate::loader::load_config(&actual) {
                Ok(cfg) => validate_config(&cfg),
                Err(e) => ValidationResult {
                    diagnostics: vec![Diagnostic::new(
                        Severity::Error,
                        "type-error",
                        "",
                        e.to_string(),
                    )],
                    config_path: None,
                },
            },
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(actual);
    result
}

/// Validate TOML text without touching the filesystem.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("TOML syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&value, &schema_map(), "", &mut diagnostics);

    match toml::from_str::<CombchatsConfig>(toml_str) {
        Ok(config) => diagnostics.extend(validate_config(&config).diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Semantic checks on a parsed config.
#[must_use]
pub fn validate_config(config: &CombchatsConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();

    if config.combine.channels.is_empty() && config.forward.is_none() {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "channel",
            "combine.channels",
            "no channels configured; pass them on the command line",
        ));
    }
    for (i, channel) in config.combine.channels.iter().enumerate() {
        if let Err(e) = channel.parse::<combchats_channels::ChannelRef>() {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "channel",
                format!("combine.channels[{i}]"),
                e.to_string(),
            ));
        }
    }

    if let Some(forward) = &config.forward {
        let (first_posts, second_posts) = match forward.mode {
            ForwardMode::ToFirst => (true, false),
            ForwardMode::ToSecond => (false, true),
            ForwardMode::Both => (true, true),
        };
        check_endpoint(&forward.first, "forward.first", first_posts, &mut diagnostics);
        check_endpoint(&forward.second, "forward.second", second_posts, &mut diagnostics);
        if forward.first.channel == forward.second.channel {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "channel",
                "forward",
                "both endpoints name the same channel",
            ));
        }
    }

    if config.relay.dedup_capacity == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "relay",
            "relay.dedup_capacity",
            "0 disables eviction; the de-duplication set grows without bound",
        ));
    }
    if config.relay.output_buffer == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "relay",
            "relay.output_buffer",
            "0 is raised to 1",
        ));
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_endpoint(
    endpoint: &EndpointConfig,
    path: &str,
    receives_posts: bool,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Err(e) = endpoint.channel.parse::<combchats_channels::ChannelRef>() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "channel",
            format!("{path}.channel"),
            e.to_string(),
        ));
    }
    if receives_posts && endpoint.identity().is_none() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "identity",
            format!("{path}.token"),
            "messages are posted here, so a token is required",
        ));
    }
}
