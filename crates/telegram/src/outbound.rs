use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    combchats_channels::MessageReceiver,
    teloxide::{RequestError, prelude::*, types::ChatId},
    tracing::{debug, warn},
};

use crate::error::Result;

/// Telegram rejects longer texts.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Sends plain text into a Telegram chat.
#[async_trait]
pub trait ChatReply: Send + Sync {
    async fn reply(&self, chat: ChatId, text: &str) -> Result<()>;
}

#[async_trait]
impl ChatReply for Bot {
    async fn reply(&self, chat: ChatId, text: &str) -> Result<()> {
        let text = truncate(text, TELEGRAM_MAX_MESSAGE_LEN);
        let mut retries = 0usize;
        loop {
            match self.send_message(chat, text).await {
                Ok(_) => return Ok(()),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err.into());
                    };
                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id = chat.0,
                            retries,
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err.into());
                    }
                    retries += 1;
                    warn!(
                        chat_id = chat.0,
                        retries,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

/// Longest prefix of `text` with at most `max_chars` characters.
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Deliver every rendered chat line from `rx` into `chat` until the session
/// closes the stream. Failed sends are logged and skipped.
pub async fn pump(replier: Arc<dyn ChatReply>, chat: ChatId, mut rx: MessageReceiver) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = replier.reply(chat, &msg.render()).await {
            warn!(chat_id = chat.0, error = %e, "failed to deliver chat line");
        }
    }
    debug!(chat_id = chat.0, "chat stream ended");
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 5), "hello");
        assert_eq!(truncate("hello", 2), "he");
        assert_eq!(truncate("привет", 3), "при");
        assert_eq!(truncate("", 0), "");
    }

    #[test]
    fn only_rate_limits_are_retried() {
        let err = RequestError::RetryAfter(teloxide::types::Seconds::from_seconds(3));
        assert_eq!(retry_after_duration(&err), Some(Duration::from_secs(3)));
        let err = RequestError::Api(teloxide::ApiError::BotBlocked);
        assert_eq!(retry_after_duration(&err), None);
    }
}
