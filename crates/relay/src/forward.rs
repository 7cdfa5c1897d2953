use std::{fmt, str::FromStr, sync::Arc};

use {
    combchats_channels::{
        ChannelRef, ChatSink, ChatSource, DedupSet, MessageReceiver, SenderIdentity,
    },
    serde::{Deserialize, Serialize},
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    factory::ChatFactory,
    session::StopHandle,
};

/// One side of a forwarding session.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub channel: ChannelRef,
    /// Needed only when messages are posted into this side.
    pub identity: Option<SenderIdentity>,
}

impl Endpoint {
    pub fn new(channel: ChannelRef) -> Self {
        Self {
            channel,
            identity: None,
        }
    }

    #[must_use]
    pub fn with_identity(mut self, identity: SenderIdentity) -> Self {
        self.identity = Some(identity);
        self
    }
}

/// Which way messages flow between the two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForwardMode {
    /// second → first
    ToFirst,
    /// first → second
    ToSecond,
    Both,
}

impl ForwardMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToFirst => "to-first",
            Self::ToSecond => "to-second",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for ForwardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForwardMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "to-first" | "first" => Ok(Self::ToFirst),
            "to-second" | "second" => Ok(Self::ToSecond),
            "both" => Ok(Self::Both),
            other => Err(Error::configuration(format!(
                "unknown forward mode '{other}' (expected to-first, to-second or both)"
            ))),
        }
    }
}

/// A built, not yet started, single-direction relay.
struct Direction {
    source: Arc<dyn ChatSource>,
    sink: Arc<dyn ChatSink>,
}

fn build_direction(factory: &dyn ChatFactory, from: &Endpoint, to: &Endpoint) -> Result<Direction> {
    let identity = to.identity.as_ref().ok_or_else(|| {
        Error::configuration(format!("posting into {} needs a sender identity", to.channel))
    })?;
    Ok(Direction {
        source: factory.source(&from.channel)?,
        sink: factory.sink(&to.channel, identity)?,
    })
}

/// Relay messages between two chats.
///
/// In [`ForwardMode::Both`] the two directions share one [`DedupSet`]
/// (`shared_dedup`, or a fresh set of `dedup_capacity`), which is what keeps
/// a forwarded line from bouncing back. Single-direction sessions
/// de-duplicate only when `shared_dedup` is given.
pub fn start_forward(
    factory: &dyn ChatFactory,
    first: &Endpoint,
    second: &Endpoint,
    mode: ForwardMode,
    shared_dedup: Option<DedupSet>,
    dedup_capacity: usize,
    buffer: usize,
) -> Result<StopHandle> {
    let directions = match mode {
        ForwardMode::ToFirst => vec![build_direction(factory, second, first)?],
        ForwardMode::ToSecond => vec![build_direction(factory, first, second)?],
        ForwardMode::Both => vec![
            build_direction(factory, first, second)?,
            build_direction(factory, second, first)?,
        ],
    };
    let dedup = match mode {
        ForwardMode::Both => Some(shared_dedup.unwrap_or_else(|| DedupSet::new(dedup_capacity))),
        ForwardMode::ToFirst | ForwardMode::ToSecond => shared_dedup,
    };

    let buffer = buffer.max(1);
    let mut receivers = Vec::with_capacity(directions.len());
    for (started, dir) in directions.iter().enumerate() {
        let (tx, rx) = mpsc::channel(buffer);
        if let Err(e) = dir.source.start(tx) {
            warn!(channel = %dir.source.channel(), error = %e, "source failed to start");
            for d in &directions[..started] {
                d.source.stop();
            }
            for d in &directions {
                d.sink.stop();
            }
            return Err(e.into());
        }
        receivers.push(rx);
    }

    let (handle, finished) = StopHandle::new();
    info!(first = %first.channel, second = %second.channel, mode = %mode, "forward session started");

    #[cfg(feature = "metrics")]
    combchats_metrics::counter!(combchats_metrics::session::STARTED_TOTAL, combchats_metrics::labels::KIND => "forward")
        .increment(1);

    let loops: Vec<_> = directions
        .into_iter()
        .zip(receivers)
        .map(|(dir, rx)| tokio::spawn(forward_loop(dir, rx, dedup.clone(), handle.token())))
        .collect();

    tokio::spawn(async move {
        let _finished = finished;
        for task in loops {
            if let Err(e) = task.await {
                warn!(error = %e, "forward loop panicked");
            }
        }
        info!("forward session stopped");
    });

    Ok(handle)
}

async fn forward_loop(
    dir: Direction,
    mut rx: MessageReceiver,
    dedup: Option<DedupSet>,
    cancel: CancellationToken,
) {
    let from = dir.source.channel().clone();
    let to = dir.sink.channel().clone();
    debug!(from = %from, to = %to, "forward loop running");

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = rx.recv() => next,
        };
        let Some(msg) = next else {
            debug!(from = %from, "forward source ended");
            cancel.cancelled().await;
            break;
        };

        let text = match &dedup {
            Some(set) => match set.admit(&msg) {
                Some(text) => text,
                None => {
                    debug!(from = %from, to = %to, "dropping already relayed message");
                    #[cfg(feature = "metrics")]
                    combchats_metrics::counter!(combchats_metrics::relay::DUPLICATES_DROPPED_TOTAL)
                        .increment(1);
                    continue;
                },
            },
            None => msg.render(),
        };

        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            sent = dir.sink.send(&text) => sent,
        };
        match sent {
            Ok(()) => {
                #[cfg(feature = "metrics")]
                combchats_metrics::counter!(
                    combchats_metrics::relay::MESSAGES_FORWARDED_TOTAL,
                    combchats_metrics::labels::PLATFORM => to.platform.as_str()
                )
                .increment(1);
            },
            Err(e) => {
                #[cfg(feature = "metrics")]
                combchats_metrics::counter!(
                    combchats_metrics::sink::SEND_FAILURES,
                    combchats_metrics::labels::PLATFORM => to.platform.as_str()
                )
                .increment(1);
                warn!(from = %from, to = %to, error = %e, "failed to forward message");
            },
        }
    }

    dir.source.stop();
    dir.sink.stop();
    debug!(from = %from, to = %to, "forward loop exited");
}
