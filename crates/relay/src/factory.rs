use std::sync::Arc;

use {
    combchats_channels::{ChannelRef, ChatSink, ChatSource, Platform, SenderIdentity},
    combchats_twitch::{TwitchSink, TwitchSource},
    combchats_vkplay::{VkPlayEndpoints, VkPlaySink, VkPlaySource},
};

/// Builds platform adapters for a session.
///
/// Construction never connects; connecting happens in `start`/`send`.
pub trait ChatFactory: Send + Sync {
    fn source(&self, channel: &ChannelRef) -> combchats_channels::Result<Arc<dyn ChatSource>>;

    fn sink(
        &self,
        channel: &ChannelRef,
        identity: &SenderIdentity,
    ) -> combchats_channels::Result<Arc<dyn ChatSink>>;
}

/// Settings the real adapters need at construction time.
#[derive(Debug, Clone, Default)]
pub struct PlatformSettings {
    pub vkplay: VkPlayEndpoints,
}

/// Factory for the supported platforms.
///
/// Sinks must be built inside a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct PlatformFactory {
    settings: PlatformSettings,
}

impl PlatformFactory {
    pub fn new(settings: PlatformSettings) -> Self {
        Self { settings }
    }
}

impl ChatFactory for PlatformFactory {
    fn source(&self, channel: &ChannelRef) -> combchats_channels::Result<Arc<dyn ChatSource>> {
        Ok(match channel.platform {
            Platform::Twitch => Arc::new(TwitchSource::new(channel.clone())),
            Platform::VkPlayLive => Arc::new(VkPlaySource::new(
                channel.clone(),
                self.settings.vkplay.clone(),
            )?),
        })
    }

    fn sink(
        &self,
        channel: &ChannelRef,
        identity: &SenderIdentity,
    ) -> combchats_channels::Result<Arc<dyn ChatSink>> {
        Ok(match channel.platform {
            Platform::Twitch => Arc::new(TwitchSink::new(channel.clone(), identity)?),
            Platform::VkPlayLive => Arc::new(VkPlaySink::new(
                channel.clone(),
                identity,
                self.settings.vkplay.clone(),
            )?),
        })
    }
}
