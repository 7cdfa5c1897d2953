//! Chat sessions: merging rooms into one stream and relaying between rooms.
//!
//! A session is started with a validated configuration, runs on background
//! tasks and is torn down through its [`StopHandle`]. Platform adapters are
//! created through a [`ChatFactory`], so sessions never name a platform.

pub mod combine;
pub mod error;
pub mod factory;
pub mod forward;
pub mod session;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use {
    combchats_channels::{ChannelRef, DedupSet, MessageReceiver, dedup},
    serde::{Deserialize, Serialize},
};

pub use {
    combine::start_combine,
    error::{Error, Result},
    factory::{ChatFactory, PlatformFactory, PlatformSettings},
    forward::{Endpoint, ForwardMode, start_forward},
    session::{SessionRegistry, StopHandle},
};

/// Tunables shared by every session a [`Relay`] starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Remembered rendered messages per forwarding session; `0` keeps all.
    pub dedup_capacity: usize,
    /// Capacity of the channel between sources and the session loop.
    pub output_buffer: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            dedup_capacity: dedup::DEFAULT_CAPACITY,
            output_buffer: 256,
        }
    }
}

/// Entry point for front-ends.
#[derive(Clone)]
pub struct Relay {
    factory: Arc<dyn ChatFactory>,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(factory: Arc<dyn ChatFactory>, settings: RelaySettings) -> Self {
        Self { factory, settings }
    }

    /// Relay backed by the real platform adapters.
    pub fn with_platforms(platforms: PlatformSettings, settings: RelaySettings) -> Self {
        Self::new(Arc::new(PlatformFactory::new(platforms)), settings)
    }

    pub fn settings(&self) -> RelaySettings {
        self.settings
    }

    pub fn start_combine(&self, channels: &[ChannelRef]) -> Result<(MessageReceiver, StopHandle)> {
        start_combine(self.factory.as_ref(), channels, self.settings.output_buffer)
    }

    pub fn start_forward(
        &self,
        first: &Endpoint,
        second: &Endpoint,
        mode: ForwardMode,
        shared_dedup: Option<DedupSet>,
    ) -> Result<StopHandle> {
        start_forward(
            self.factory.as_ref(),
            first,
            second,
            mode,
            shared_dedup,
            self.settings.dedup_capacity,
            self.settings.output_buffer,
        )
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, test_support::FakeFactory};

    #[tokio::test]
    async fn relay_uses_its_factory_and_settings() {
        let factory = Arc::new(FakeFactory::default());
        let relay = Relay::new(factory.clone(), RelaySettings {
            dedup_capacity: 2,
            output_buffer: 4,
        });

        let (_rx, handle) = relay
            .start_combine(&[ChannelRef::twitch("a"), ChannelRef::vkplay("b")])
            .unwrap();
        assert_eq!(factory.total_starts(), 2);
        handle.stop();
        handle.stopped().await;
    }

    #[test]
    fn settings_default_from_empty_table() {
        let settings: RelaySettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, RelaySettings::default());
        assert_eq!(settings.dedup_capacity, 4096);
    }
}
