//! Config schema types.
//!
//! Deserialize-only: tokens in here must never be written back to disk.

use {
    combchats_channels::{ChannelRef, SenderIdentity},
    combchats_relay::{Endpoint, ForwardMode, RelaySettings},
    combchats_vkplay::VkPlayEndpoints,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

/// Root configuration (`combchats.toml`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CombchatsConfig {
    pub telegram: TelegramConfig,
    /// VK Play Live endpoint overrides; defaults point at production.
    pub vkplay: VkPlayEndpoints,
    pub relay: RelaySettings,
    pub combine: CombineConfig,
    pub forward: Option<ForwardConfig>,
    pub metrics: MetricsConfig,
}

/// Telegram front-end.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot API token.
    pub token: Option<Secret<String>>,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout_secs: u32,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            poll_timeout_secs: 30,
        }
    }
}

/// Channels for `combchats combine` when none are given on the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CombineConfig {
    /// `platform:name` entries, e.g. `twitch:pajlada`, `vk:streamer`.
    pub channels: Vec<String>,
}

impl CombineConfig {
    pub fn channel_refs(&self) -> combchats_channels::Result<Vec<ChannelRef>> {
        self.channels.iter().map(|c| c.parse()).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForwardConfig {
    #[serde(default = "default_forward_mode")]
    pub mode: ForwardMode,
    pub first: EndpointConfig,
    pub second: EndpointConfig,
}

fn default_forward_mode() -> ForwardMode {
    ForwardMode::Both
}

/// One side of `[forward]`.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// `platform:name`.
    pub channel: String,
    /// Account name the sink posts as; Twitch uses it as the login.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub token: Option<Secret<String>>,
}

impl EndpointConfig {
    /// Identity, when a non-empty token is configured.
    pub fn identity(&self) -> Option<SenderIdentity> {
        let token = self.token.as_ref()?;
        if token.expose_secret().trim().is_empty() {
            return None;
        }
        let channel_name = self.channel.split_once(':').map(|(_, n)| n).unwrap_or_default();
        let display_name = self
            .display_name
            .clone()
            .unwrap_or_else(|| channel_name.to_string());
        Some(SenderIdentity::new(display_name, token.clone()))
    }

    pub fn to_endpoint(&self) -> combchats_channels::Result<Endpoint> {
        let endpoint = Endpoint::new(self.channel.parse()?);
        Ok(match self.identity() {
            Some(identity) => endpoint.with_identity(identity),
            None => endpoint,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}
