use {
    combchats_channels::{ChannelRef, ChatMessage, ChatSource, Lifecycle, MessageSender, lifecycle},
    tracing::{debug, info, warn},
    twitch_irc::{
        ClientConfig, SecureTCPTransport, TwitchIRCClient,
        login::StaticLoginCredentials,
        message::{PrivmsgMessage, ServerMessage},
    },
};

use crate::{error::Error, login_name};

type AnonymousClient = TwitchIRCClient<SecureTCPTransport, StaticLoginCredentials>;

/// Map a chat line to the platform-neutral message.
///
/// Uses the display name, falling back to the login when Twitch sends none.
pub fn privmsg_to_message(msg: &PrivmsgMessage) -> ChatMessage {
    let author = if msg.sender.name.is_empty() {
        msg.sender.login.clone()
    } else {
        msg.sender.name.clone()
    };
    ChatMessage::new(author, msg.message_text.clone(), msg.server_timestamp)
}

/// Reads a Twitch channel anonymously.
#[derive(Debug)]
pub struct TwitchSource {
    channel: ChannelRef,
    lifecycle: Lifecycle,
}

impl TwitchSource {
    pub fn new(channel: ChannelRef) -> Self {
        Self {
            channel,
            lifecycle: Lifecycle::new(),
        }
    }
}

impl ChatSource for TwitchSource {
    fn channel(&self) -> &ChannelRef {
        &self.channel
    }

    fn start(&self, emit: MessageSender) -> combchats_channels::Result<()> {
        let cancel = self.lifecycle.begin(&self.channel)?;
        let login = login_name(&self.channel.name);

        let (mut incoming, client) = AnonymousClient::new(ClientConfig::default());
        client
            .join(login.clone())
            .map_err(|e| Error::invalid_login(&login, e))?;

        let channel = self.channel.clone();
        tokio::spawn(async move {
            info!(channel = %channel, "twitch source joined");
            loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    next = incoming.recv() => next,
                };
                match next {
                    Some(ServerMessage::Privmsg(msg)) => {
                        #[cfg(feature = "metrics")]
                        combchats_metrics::counter!(
                            combchats_metrics::source::MESSAGES_RECEIVED,
                            combchats_metrics::labels::PLATFORM => "twitch"
                        )
                        .increment(1);
                        if !lifecycle::emit(&cancel, &emit, privmsg_to_message(&msg)).await {
                            break;
                        }
                    },
                    Some(ServerMessage::Notice(notice)) => {
                        warn!(channel = %channel, notice = %notice.message_text, "twitch notice");
                    },
                    Some(other) => {
                        debug!(channel = %channel, command = %other.source().command, "twitch message ignored");
                    },
                    None => {
                        warn!(channel = %channel, "twitch connection ended");
                        break;
                    },
                }
            }
            // Dropping the client closes the connection.
            drop(client);
            info!(channel = %channel, "twitch source stopped");
        });
        Ok(())
    }

    fn stop(&self) {
        if self.lifecycle.stop() {
            info!(channel = %self.channel, "stopping twitch source");
        }
    }
}
