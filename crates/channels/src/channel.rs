use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr},
};

use crate::error::Error;

/// Streaming platforms a channel can live on.
///
/// Adding a platform means adding a variant here and one constructor arm in
/// the relay factory; nothing else matches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitch,
    #[serde(rename = "vkplay", alias = "vk", alias = "vkplaylive")]
    VkPlayLive,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Twitch, Platform::VkPlayLive];

    /// Stable identifier used in logs, metrics and `platform:name` refs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitch => "twitch",
            Self::VkPlayLive => "vkplay",
        }
    }

    /// Human-readable name shown by front-ends.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Twitch => "Twitch",
            Self::VkPlayLive => "Vk",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitch" => Ok(Self::Twitch),
            "vk" | "vkplay" | "vkplaylive" => Ok(Self::VkPlayLive),
            other => Err(Error::configuration(format!(
                "unknown platform '{other}'"
            ))),
        }
    }
}

/// A chat room on a specific platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelRef {
    pub platform: Platform,
    pub name: String,
}

impl ChannelRef {
    pub fn new(platform: Platform, name: impl Into<String>) -> Self {
        Self {
            platform,
            name: name.into(),
        }
    }

    pub fn twitch(name: impl Into<String>) -> Self {
        Self::new(Platform::Twitch, name)
    }

    pub fn vkplay(name: impl Into<String>) -> Self {
        Self::new(Platform::VkPlayLive, name)
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.name)
    }
}

impl FromStr for ChannelRef {
    type Err = Error;

    /// Parse `platform:name`, e.g. `twitch:pajlada` or `vk:some_blog`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (platform, name) = s
            .split_once(':')
            .ok_or_else(|| Error::configuration(format!("expected platform:name, got '{s}'")))?;
        let platform: Platform = platform.parse()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::configuration(format!(
                "empty channel name in '{s}'"
            )));
        }
        Ok(Self::new(platform, name))
    }
}

impl TryFrom<String> for ChannelRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChannelRef> for String {
    fn from(value: ChannelRef) -> Self {
        value.to_string()
    }
}

/// Credentials a sink posts with.
#[derive(Clone)]
pub struct SenderIdentity {
    pub display_name: String,
    pub token: Secret<String>,
}

impl SenderIdentity {
    pub fn new(display_name: impl Into<String>, token: Secret<String>) -> Self {
        Self {
            display_name: display_name.into(),
            token,
        }
    }

    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().is_empty()
    }
}

impl fmt::Debug for SenderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderIdentity")
            .field("display_name", &self.display_name)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
