use std::sync::Arc;

use {
    combchats_channels::ChannelRef,
    combchats_relay::{Relay, SessionRegistry},
    teloxide::types::ChatId,
    tracing::{info, warn},
};

use crate::{
    dialogue::{self, Action, Stage},
    error::Result,
    outbound::{self, ChatReply},
    state::ChatStates,
};

/// Runs the dialogue for every chat and owns their sessions.
pub struct Frontend {
    relay: Relay,
    replier: Arc<dyn ChatReply>,
    stages: ChatStates,
    sessions: SessionRegistry<ChatId>,
}

impl Frontend {
    pub fn new(relay: Relay, replier: Arc<dyn ChatReply>) -> Self {
        Self {
            relay,
            replier,
            stages: ChatStates::default(),
            sessions: SessionRegistry::new(),
        }
    }

    pub fn stage(&self, chat: ChatId) -> Stage {
        self.stages.get(chat)
    }

    pub fn is_streaming(&self, chat: ChatId) -> bool {
        self.sessions.is_active(&chat)
    }

    /// Feed one incoming text message through the dialogue.
    pub async fn handle_text(&self, chat: ChatId, text: &str) {
        let step = dialogue::step(self.stages.get(chat), text);
        self.stages.set(chat, step.next);

        for action in step.actions {
            match action {
                Action::Reply(text) => self.say(chat, &text).await,
                Action::Start(channel) => self.start(chat, channel).await,
                Action::Stop => {
                    if self.sessions.stop(&chat) {
                        info!(chat_id = chat.0, "chat session stopped");
                    }
                },
            }
        }
    }

    /// Stop every running session.
    pub fn shutdown(&self) {
        self.sessions.stop_all();
    }

    async fn start(&self, chat: ChatId, channel: ChannelRef) {
        match self.start_session(chat, &channel) {
            Ok(()) => {
                info!(chat_id = chat.0, channel = %channel, "chat session started");
                self.say(chat, dialogue::READY).await;
            },
            Err(e) => {
                warn!(chat_id = chat.0, channel = %channel, error = %e, "failed to start chat session");
                self.stages.set(chat, Stage::Idle);
                self.say(chat, &format!("Could not start {channel}: {e}"))
                    .await;
                self.say(chat, dialogue::WORK_HINT).await;
            },
        }
    }

    fn start_session(&self, chat: ChatId, channel: &ChannelRef) -> Result<()> {
        let (rx, handle) = self.relay.start_combine(std::slice::from_ref(channel))?;
        self.sessions.insert(chat, handle);
        tokio::spawn(outbound::pump(Arc::clone(&self.replier), chat, rx));
        Ok(())
    }

    async fn say(&self, chat: ChatId, text: &str) {
        if let Err(e) = self.replier.reply(chat, text).await {
            warn!(chat_id = chat.0, error = %e, "failed to send telegram reply");
        }
    }
}

impl std::fmt::Debug for Frontend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frontend")
            .field("relay", &self.relay)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}
