use std::sync::Arc;

use {
    combchats_channels::{ChannelRef, ChatSource, Lifecycle, MessageSender},
    tokio::sync::watch,
    tracing::{info, warn},
};

use crate::{
    client::{ConnectionState, PubSubClient},
    config::VkPlayEndpoints,
    error::Result,
};

/// Reads a VK Play Live chat through [`PubSubClient`].
#[derive(Debug)]
pub struct VkPlaySource {
    channel: ChannelRef,
    client: Arc<PubSubClient>,
    lifecycle: Lifecycle,
}

impl VkPlaySource {
    pub fn new(channel: ChannelRef, endpoints: VkPlayEndpoints) -> Result<Self> {
        let client = PubSubClient::new(channel.name.clone(), endpoints)?;
        Ok(Self {
            channel,
            client: Arc::new(client),
            lifecycle: Lifecycle::new(),
        })
    }

    /// Connection progress of the underlying client.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.client.state()
    }
}

impl ChatSource for VkPlaySource {
    fn channel(&self) -> &ChannelRef {
        &self.channel
    }

    fn start(&self, emit: MessageSender) -> combchats_channels::Result<()> {
        let cancel = self.lifecycle.begin(&self.channel)?;
        let client = Arc::clone(&self.client);
        let channel = self.channel.clone();

        tokio::spawn(async move {
            info!(channel = %channel, "vkplay source starting");
            match client.run(cancel, emit).await {
                Ok(()) => info!(channel = %channel, "vkplay source stopped"),
                Err(e) => {
                    #[cfg(feature = "metrics")]
                    combchats_metrics::counter!(
                        combchats_metrics::source::CONNECTION_FAILURES,
                        combchats_metrics::labels::PLATFORM => "vkplay"
                    )
                    .increment(1);
                    warn!(channel = %channel, error = %e, "vkplay source terminated");
                },
            }
        });
        Ok(())
    }

    fn stop(&self) {
        if self.lifecycle.stop() {
            info!(channel = %self.channel, "stopping vkplay source");
        }
    }
}
