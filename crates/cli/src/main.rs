mod config_commands;
mod run_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    combchats_channels::ChannelRef,
    combchats_relay::ForwardMode,
    secrecy::Secret,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "combchats", about = "combchats: combine and relay stream chats")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (default: discovered in ./ then ~/.config/combchats/).
    #[arg(long, global = true, env = "COMBCHATS_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the merged chat of several channels until Ctrl-C.
    Combine {
        /// Channels as platform:name, e.g. twitch:pajlada vk:streamer.
        /// Falls back to `[combine] channels` from the config.
        channels: Vec<ChannelRef>,
        /// Prefix every line with its timestamp.
        #[arg(long, conflicts_with = "json")]
        timestamps: bool,
        /// Print one JSON object per message.
        #[arg(long)]
        json: bool,
    },
    /// Relay messages between two channels until Ctrl-C.
    Forward(ForwardArgs),
    /// Run the Telegram front-end.
    Bot {
        /// Bot API token (default: `[telegram] token` from the config).
        #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
        token: Option<Secret<String>>,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

/// Endpoints given on the command line replace `[forward]` from the config.
#[derive(clap::Args)]
struct ForwardArgs {
    /// Direction: to-first, to-second or both.
    #[arg(long)]
    mode: Option<ForwardMode>,
    /// First channel as platform:name.
    #[arg(long, requires = "second")]
    first: Option<String>,
    /// Account name posting into the first channel.
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long, env = "COMBCHATS_FIRST_TOKEN", hide_env_values = true)]
    first_token: Option<Secret<String>>,
    /// Second channel as platform:name.
    #[arg(long, requires = "first")]
    second: Option<String>,
    /// Account name posting into the second channel.
    #[arg(long)]
    second_name: Option<String>,
    #[arg(long, env = "COMBCHATS_SECOND_TOKEN", hide_env_values = true)]
    second_token: Option<Secret<String>>,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Chat lines go to stdout, logs to stderr.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "combchats starting");

    if let Commands::Config { action } = cli.command {
        return config_commands::handle_config(action, cli.config.as_deref());
    }

    let config = combchats_config::discover_and_load(cli.config.as_deref())?;
    let metrics = combchats_metrics::init_metrics(combchats_metrics::MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        global_labels: Vec::new(),
    })?;

    let result = match cli.command {
        Commands::Combine {
            channels,
            timestamps,
            json,
        } => {
            let format = if json {
                run_commands::LineFormat::Json
            } else if timestamps {
                run_commands::LineFormat::Timestamped
            } else {
                run_commands::LineFormat::Plain
            };
            run_commands::combine(&config, channels, format).await
        },
        Commands::Forward(args) => run_commands::forward(&config, args).await,
        Commands::Bot { token } => run_commands::bot(&config, token).await,
        Commands::Config { .. } => Ok(()),
    };

    let snapshot = metrics.render();
    if !snapshot.is_empty() {
        eprintln!("{snapshot}");
    }
    result
}
