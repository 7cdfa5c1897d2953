use std::sync::Mutex;

use {
    async_trait::async_trait,
    combchats_channels::{ChannelRef, ChatSink, Lifecycle, SenderIdentity},
    secrecy::ExposeSecret,
    tracing::{debug, warn},
    twitch_irc::{
        ClientConfig, SecureTCPTransport, TwitchIRCClient, login::StaticLoginCredentials,
        message::ServerMessage,
    },
};

use crate::{error::Error, login_name};

type LoggedInClient = TwitchIRCClient<SecureTCPTransport, StaticLoginCredentials>;

/// Posts into a Twitch channel as the sender identity.
///
/// Must be constructed inside a tokio runtime: the IRC client spawns its
/// connection worker immediately and connects on first use.
pub struct TwitchSink {
    channel: ChannelRef,
    login: String,
    client: Mutex<Option<LoggedInClient>>,
    lifecycle: Lifecycle,
}

impl TwitchSink {
    pub fn new(
        channel: ChannelRef,
        identity: &SenderIdentity,
    ) -> combchats_channels::Result<Self> {
        if !identity.has_token() {
            return Err(combchats_channels::Error::configuration(format!(
                "twitch sink for {channel} needs an OAuth token"
            )));
        }
        let token = identity
            .token
            .expose_secret()
            .trim_start_matches("oauth:")
            .to_string();
        let credentials =
            StaticLoginCredentials::new(login_name(&identity.display_name), Some(token));
        let (mut incoming, client) = LoggedInClient::new(ClientConfig::new_simple(credentials));

        // Server traffic must be drained or the client stalls; it ends once
        // the last client handle is dropped.
        let drain_channel = channel.clone();
        tokio::spawn(async move {
            while let Some(msg) = incoming.recv().await {
                if let ServerMessage::Notice(notice) = msg {
                    warn!(channel = %drain_channel, notice = %notice.message_text, "twitch notice");
                }
            }
            debug!(channel = %drain_channel, "twitch sink connection closed");
        });

        Ok(Self {
            login: login_name(&channel.name),
            channel,
            client: Mutex::new(Some(client)),
            lifecycle: Lifecycle::new(),
        })
    }

    fn client(&self) -> Option<LoggedInClient> {
        self.client
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl std::fmt::Debug for TwitchSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitchSink")
            .field("channel", &self.channel)
            .field("stopped", &self.lifecycle.is_stopped())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatSink for TwitchSink {
    fn channel(&self) -> &ChannelRef {
        &self.channel
    }

    async fn send(&self, text: &str) -> combchats_channels::Result<()> {
        let Some(client) = self.client().filter(|_| !self.lifecycle.is_stopped()) else {
            return Err(combchats_channels::Error::unavailable(format!(
                "{} sink is stopped",
                self.channel
            )));
        };
        if text.is_empty() {
            return Err(combchats_channels::Error::invalid_input(
                "cannot send an empty message",
            ));
        }
        client
            .say(self.login.clone(), text.to_string())
            .await
            .map_err(|e| Error::Send(e.to_string()))?;
        #[cfg(feature = "metrics")]
        combchats_metrics::counter!(
            combchats_metrics::sink::MESSAGES_SENT,
            combchats_metrics::labels::PLATFORM => "twitch"
        )
        .increment(1);
        debug!(channel = %self.channel, "twitch message sent");
        Ok(())
    }

    fn stop(&self) {
        if self.lifecycle.stop() {
            self.client
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take();
            debug!(channel = %self.channel, "twitch sink stopped");
        }
    }
}
