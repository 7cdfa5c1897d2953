use std::{collections::HashMap, sync::Mutex};

use teloxide::types::ChatId;

use crate::dialogue::Stage;

/// Dialogue stage per Telegram chat. Chats without an entry are idle.
#[derive(Debug, Default)]
pub struct ChatStates {
    stages: Mutex<HashMap<ChatId, Stage>>,
}

impl ChatStates {
    pub fn get(&self, chat: ChatId) -> Stage {
        self.stages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&chat)
            .copied()
            .unwrap_or_default()
    }

    pub fn set(&self, chat: ChatId, stage: Stage) {
        let mut stages = self.stages.lock().unwrap_or_else(|e| e.into_inner());
        if stage == Stage::Idle {
            stages.remove(&chat);
        } else {
            stages.insert(chat, stage);
        }
    }

    pub fn len(&self) -> usize {
        self.stages.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_chats_are_not_stored() {
        let states = ChatStates::default();
        let chat = ChatId(7);
        assert_eq!(states.get(chat), Stage::Idle);

        states.set(chat, Stage::Working);
        assert_eq!(states.get(chat), Stage::Working);
        assert_eq!(states.len(), 1);

        states.set(chat, Stage::Idle);
        assert!(states.is_empty());
    }
}
