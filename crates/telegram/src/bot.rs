use std::{sync::Arc, time::Duration};

use {
    combchats_relay::Relay,
    secrecy::{ExposeSecret, Secret},
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{handlers::Frontend, outbound::ChatReply};

/// Long-poll Telegram and drive the dialogue until `cancel` fires.
///
/// Every chat session is stopped before this returns.
pub async fn run_polling(
    token: &Secret<String>,
    poll_timeout_secs: u32,
    relay: Relay,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    // The HTTP timeout must outlast the long poll.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(poll_timeout_secs) + 15))
        .build()?;
    let bot = Bot::with_client(token.expose_secret(), client);

    let me = bot.get_me().await?;
    bot.delete_webhook().send().await?;

    let commands = vec![
        BotCommand::new("work", "Watch a stream chat"),
        BotCommand::new("stop", "Stop watching"),
    ];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {e}");
    }
    info!(username = ?me.username, "telegram bot connected");

    let frontend = Frontend::new(relay, Arc::new(bot.clone()) as Arc<dyn ChatReply>);
    let result = poll(&bot, &frontend, poll_timeout_secs, &cancel).await;
    frontend.shutdown();
    info!("telegram polling stopped");
    result
}

async fn poll(
    bot: &Bot,
    frontend: &Frontend,
    poll_timeout_secs: u32,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let mut offset: i32 = 0;
    loop {
        let request = bot
            .get_updates()
            .offset(offset)
            .timeout(poll_timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message]);
        let Some(result) = cancel.run_until_cancelled(request.send()).await else {
            return Ok(());
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    match update.kind {
                        UpdateKind::Message(msg) => {
                            let Some(text) = msg.text() else {
                                debug!(chat_id = msg.chat.id.0, "ignoring non-text message");
                                continue;
                            };
                            debug!(chat_id = msg.chat.id.0, "received telegram message");
                            frontend.handle_text(msg.chat.id, text).await;
                        },
                        other => debug!("ignoring non-message update: {other:?}"),
                    }
                }
            },
            Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                anyhow::bail!("another bot instance is already running with this token");
            },
            Err(e) => {
                warn!(error = %e, "telegram getUpdates failed");
                if cancel
                    .run_until_cancelled(tokio::time::sleep(Duration::from_secs(5)))
                    .await
                    .is_none()
                {
                    return Ok(());
                }
            },
        }
    }
}
