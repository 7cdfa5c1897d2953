use std::sync::atomic::{AtomicBool, Ordering};

use {tokio_util::sync::CancellationToken, tracing::debug};

use crate::{ChannelRef, ChatMessage, Error, MessageSender, Result};

/// Start/stop bookkeeping shared by every source and sink adapter.
///
/// Wraps one [`CancellationToken`]: `stop` cancels it, background tasks
/// select on it, and a cancelled lifecycle can never be restarted.
#[derive(Debug, Default)]
pub struct Lifecycle {
    cancel: CancellationToken,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the lifecycle as started and hand out the token the background
    /// task should watch.
    pub fn begin(&self, channel: &ChannelRef) -> Result<CancellationToken> {
        if self.cancel.is_cancelled() {
            return Err(Error::unavailable(format!("{channel} was already stopped")));
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::invalid_input(format!("{channel} is already started")));
        }
        Ok(self.cancel.clone())
    }

    /// Cancel the token. Returns `true` only for the call that actually
    /// transitioned the lifecycle to stopped.
    pub fn stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.cancel.cancel();
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Push `msg` into `emit` unless `cancel` fires first.
///
/// Returns `false` when the source should wind down, either because it was
/// stopped or because the receiving side hung up.
pub async fn emit(cancel: &CancellationToken, emit: &MessageSender, msg: ChatMessage) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        res = emit.send(msg) => {
            if res.is_err() {
                debug!("message receiver dropped");
            }
            res.is_ok()
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, chrono::Utc, tokio::sync::mpsc};

    #[test]
    fn begin_twice_is_rejected() {
        let lc = Lifecycle::new();
        let ch = ChannelRef::twitch("a");
        assert!(lc.begin(&ch).is_ok());
        assert!(matches!(lc.begin(&ch), Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn begin_after_stop_is_unavailable() {
        let lc = Lifecycle::new();
        assert!(lc.stop());
        let err = lc.begin(&ChannelRef::twitch("a")).unwrap_err();
        assert!(matches!(err, Error::Unavailable { .. }));
    }

    #[test]
    fn stop_reports_first_call_only() {
        let lc = Lifecycle::new();
        assert!(lc.stop());
        assert!(!lc.stop());
        assert!(lc.is_stopped());
    }

    #[test]
    fn concurrent_stop_has_exactly_one_winner() {
        for _ in 0..200 {
            let lc = Lifecycle::new();
            let barrier = std::sync::Barrier::new(4);
            let winners = std::thread::scope(|s| {
                let joins: Vec<_> = (0..4)
                    .map(|_| {
                        let (lc, barrier) = (&lc, &barrier);
                        s.spawn(move || {
                            barrier.wait();
                            lc.stop()
                        })
                    })
                    .collect();
                joins
                    .into_iter()
                    .map(|j| j.join().unwrap())
                    .filter(|won| *won)
                    .count()
            });
            assert_eq!(winners, 1);
            assert!(lc.is_stopped());
        }
    }

    #[tokio::test]
    async fn emit_is_suppressed_after_cancel() {
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let msg = ChatMessage::new("a", "b", Utc::now());

        assert!(emit(&cancel, &tx, msg.clone()).await);
        cancel.cancel();
        assert!(!emit(&cancel, &tx, msg.clone()).await);

        drop(tx);
        assert_eq!(rx.recv().await, Some(msg));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn emit_unblocks_on_full_channel_when_cancelled() {
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let msg = ChatMessage::new("a", "b", Utc::now());
        assert!(emit(&cancel, &tx, msg.clone()).await);

        let canceller = cancel.clone();
        tokio::spawn(async move { canceller.cancel() });
        assert!(!emit(&cancel, &tx, msg).await);
    }
}
