use {
    anyhow::{Context, Result},
    combchats_channels::{ChannelRef, ChatMessage},
    combchats_config::{CombchatsConfig, EndpointConfig, ForwardConfig},
    combchats_relay::{ForwardMode, PlatformSettings, Relay},
    secrecy::Secret,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use crate::ForwardArgs;

fn relay(config: &CombchatsConfig) -> Relay {
    Relay::with_platforms(
        PlatformSettings {
            vkplay: config.vkplay.clone(),
        },
        config.relay,
    )
}

/// Cancelled on the first Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received, shutting down"),
            Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
        }
        trigger.cancel();
    });
    cancel
}

/// How `combine` prints each message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    Plain,
    Timestamped,
    Json,
}

impl LineFormat {
    fn line(self, msg: &ChatMessage) -> Result<String> {
        Ok(match self {
            Self::Plain => msg.render(),
            Self::Timestamped => {
                format!("[{}] {}", msg.timestamp.format("%H:%M:%S"), msg.render())
            },
            Self::Json => serde_json::to_string(msg)?,
        })
    }
}

pub async fn combine(
    config: &CombchatsConfig,
    channels: Vec<ChannelRef>,
    format: LineFormat,
) -> Result<()> {
    let channels = if channels.is_empty() {
        config.combine.channel_refs()?
    } else {
        channels
    };

    let (mut rx, handle) = relay(config).start_combine(&channels)?;
    let cancel = ctrl_c_token();
    loop {
        let Some(next) = cancel.run_until_cancelled(rx.recv()).await else {
            break;
        };
        let Some(msg) = next else {
            break;
        };
        println!("{}", format.line(&msg)?);
    }

    handle.stop();
    handle.stopped().await;
    Ok(())
}

pub async fn forward(config: &CombchatsConfig, args: ForwardArgs) -> Result<()> {
    let forward = forward_config(config, args)?;
    let first = forward.first.to_endpoint()?;
    let second = forward.second.to_endpoint()?;

    let handle = relay(config).start_forward(&first, &second, forward.mode, None)?;
    info!(
        first = %first.channel,
        second = %second.channel,
        mode = %forward.mode,
        "forwarding, press Ctrl-C to stop"
    );

    // The session outlives its sources; only Ctrl-C ends it.
    ctrl_c_token().cancelled().await;
    handle.stop();
    handle.stopped().await;
    Ok(())
}

/// Command-line endpoints win over `[forward]`; the mode defaults to the
/// config's, then to `both`.
fn forward_config(config: &CombchatsConfig, args: ForwardArgs) -> Result<ForwardConfig> {
    let from_file = config.forward.clone();
    let mode = args
        .mode
        .or(from_file.as_ref().map(|f| f.mode))
        .unwrap_or(ForwardMode::Both);

    match (args.first, args.second) {
        (Some(first), Some(second)) => Ok(ForwardConfig {
            mode,
            first: EndpointConfig {
                channel: first,
                display_name: args.first_name,
                token: args.first_token,
            },
            second: EndpointConfig {
                channel: second,
                display_name: args.second_name,
                token: args.second_token,
            },
        }),
        _ => {
            let forward = from_file
                .context("no endpoints: pass --first/--second or add [forward] to the config")?;
            Ok(ForwardConfig { mode, ..forward })
        },
    }
}

pub async fn bot(config: &CombchatsConfig, token: Option<Secret<String>>) -> Result<()> {
    let token = token
        .or_else(|| config.telegram.token.clone())
        .context("no bot token: pass --token, set BOT_TOKEN or [telegram] token")?;
    let cancel = ctrl_c_token();
    combchats_telegram::run_polling(
        &token,
        config.telegram.poll_timeout_secs,
        relay(config),
        cancel,
    )
    .await
}
