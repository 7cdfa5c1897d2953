use std::sync::Arc;

use {
    combchats_channels::{ChannelRef, ChatSource, MessageReceiver},
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    factory::ChatFactory,
    session::StopHandle,
};

/// Merge several chats into one stream.
///
/// Every source is built before any is started, so a bad channel rejects
/// the whole session without connecting anywhere. The returned receiver
/// yields messages first-come-first-served across sources and FIFO within
/// each source. It ends only after the session is stopped.
pub fn start_combine(
    factory: &dyn ChatFactory,
    channels: &[ChannelRef],
    buffer: usize,
) -> Result<(MessageReceiver, StopHandle)> {
    if channels.is_empty() {
        return Err(Error::configuration("no channels to combine"));
    }

    let sources = channels
        .iter()
        .map(|channel| factory.source(channel))
        .collect::<combchats_channels::Result<Vec<_>>>()?;

    let buffer = buffer.max(1);
    let (inner_tx, mut inner_rx) = mpsc::channel(buffer);
    for (started, source) in sources.iter().enumerate() {
        if let Err(e) = source.start(inner_tx.clone()) {
            warn!(channel = %source.channel(), error = %e, "source failed to start");
            for s in &sources[..started] {
                s.stop();
            }
            return Err(e.into());
        }
    }
    drop(inner_tx);

    let (out_tx, out_rx) = mpsc::channel(buffer);
    let (handle, finished) = StopHandle::new();
    let cancel = handle.token();
    info!(channels = sources.len(), "combine session started");

    #[cfg(feature = "metrics")]
    combchats_metrics::counter!(combchats_metrics::session::STARTED_TOTAL, combchats_metrics::labels::KIND => "combine")
        .increment(1);

    tokio::spawn(async move {
        let _finished = finished;
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                next = inner_rx.recv() => next,
            };
            let Some(msg) = next else {
                // Every source is gone; stay open until told to stop.
                debug!("all combine sources ended");
                cancel.cancelled().await;
                break;
            };
            #[cfg(feature = "metrics")]
            combchats_metrics::counter!(combchats_metrics::relay::MESSAGES_COMBINED_TOTAL)
                .increment(1);
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                sent = out_tx.send(msg) => {
                    if sent.is_err() {
                        debug!("combine consumer dropped the stream");
                        cancel.cancelled().await;
                        break;
                    }
                },
            }
        }
        stop_all(&sources);
        info!("combine session stopped");
    });

    Ok((out_rx, handle))
}

fn stop_all(sources: &[Arc<dyn ChatSource>]) {
    for source in sources {
        source.stop();
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::{FakeFactory, msg},
        combchats_channels::Platform,
        rstest::rstest,
        std::time::Duration,
    };

    fn channels(n: usize) -> Vec<ChannelRef> {
        (0..n)
            .map(|i| {
                let platform = Platform::ALL[i % Platform::ALL.len()];
                ChannelRef::new(platform, format!("room{i}"))
            })
            .collect()
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(5)]
    #[tokio::test]
    async fn starts_and_stops_every_source_exactly_once(#[case] n: usize) {
        let factory = FakeFactory::default();
        let chans = channels(n);
        let (_rx, handle) = start_combine(&factory, &chans, 16).unwrap();

        assert_eq!(factory.sources_built(), n);
        for ch in &chans {
            assert_eq!(factory.source_for(ch).starts(), 1);
        }

        assert!(handle.stop());
        assert!(!handle.stop());
        handle.stopped().await;
        for ch in &chans {
            assert_eq!(factory.source_for(ch).stops(), 1);
        }
    }

    #[tokio::test]
    async fn merges_sources_preserving_per_source_order() {
        let factory = FakeFactory::default();
        let chans = channels(2);
        let (mut rx, handle) = start_combine(&factory, &chans, 64).unwrap();

        let a = factory.source_for(&chans[0]);
        let b = factory.source_for(&chans[1]);
        let push_a = async {
            for i in 0..20 {
                a.push(msg("a", &i.to_string())).await;
            }
        };
        let push_b = async {
            for i in 0..20 {
                b.push(msg("b", &i.to_string())).await;
            }
        };
        tokio::join!(push_a, push_b);

        let mut seen_a = Vec::new();
        let mut seen_b = Vec::new();
        for _ in 0..40 {
            let m = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            let n: u32 = m.text.parse().unwrap();
            if m.author == "a" {
                seen_a.push(n);
            } else {
                seen_b.push(n);
            }
        }
        assert_eq!(seen_a, (0..20).collect::<Vec<_>>());
        assert_eq!(seen_b, (0..20).collect::<Vec<_>>());

        handle.stop();
        handle.stopped().await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropped_source_does_not_end_the_session() {
        let factory = FakeFactory::default();
        let chans = channels(2);
        let (mut rx, handle) = start_combine(&factory, &chans, 8).unwrap();

        factory.source_for(&chans[0]).disconnect();
        factory.source_for(&chans[1]).push(msg("still", "here")).await;
        let m = rx.recv().await.unwrap();
        assert_eq!(m.render(), "still: here");
        assert!(!handle.is_stopped());

        handle.stop();
        handle.stopped().await;
    }

    #[test]
    fn rejected_channel_starts_nothing() {
        let factory = FakeFactory::default();
        let chans = vec![ChannelRef::twitch("good"), ChannelRef::vkplay("bad-one")];
        let err = start_combine(&factory, &chans, 8).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(factory.total_starts(), 0);
    }

    #[test]
    fn unknown_platform_never_reaches_the_factory() {
        let err = "unknown:x".parse::<ChannelRef>().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn empty_channel_list_is_rejected() {
        let factory = FakeFactory::default();
        let err = start_combine(&factory, &[], 8).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(factory.sources_built(), 0);
    }
}
