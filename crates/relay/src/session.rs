use std::{
    collections::HashMap,
    hash::Hash,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use {
    tokio::sync::watch,
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

/// Stop control returned by `start_combine` / `start_forward`.
///
/// Cheap to clone; every clone controls the same session.
#[derive(Debug, Clone)]
pub struct StopHandle {
    cancel: CancellationToken,
    stop_requested: Arc<AtomicBool>,
    finished: watch::Receiver<bool>,
}

/// Held by the session's supervisor task; marks the session finished on drop.
#[derive(Debug)]
pub(crate) struct Finished(watch::Sender<bool>);

impl Drop for Finished {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}

impl StopHandle {
    pub(crate) fn new() -> (Self, Finished) {
        let (tx, rx) = watch::channel(false);
        let handle = Self {
            cancel: CancellationToken::new(),
            stop_requested: Arc::new(AtomicBool::new(false)),
            finished: rx,
        };
        (handle, Finished(tx))
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request teardown. Returns `true` for the call that actually stopped
    /// the session; later calls are logged and ignored.
    pub fn stop(&self) -> bool {
        if self.stop_requested.swap(true, Ordering::SeqCst) {
            warn!("session stop requested more than once");
            return false;
        }
        self.cancel.cancel();
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until every coordination loop of the session has exited and all
    /// sources and sinks were stopped.
    pub async fn stopped(&self) {
        let mut finished = self.finished.clone();
        // A dropped sender means the supervisor is gone, which is also done.
        let _ = finished.wait_for(|done| *done).await;
    }
}

/// Running sessions keyed by consumer (chat id, CLI invocation, ...).
///
/// Inserting for a key that already has a session stops the old one.
#[derive(Debug)]
pub struct SessionRegistry<K> {
    sessions: Mutex<HashMap<K, StopHandle>>,
}

impl<K> Default for SessionRegistry<K> {
    fn default() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> SessionRegistry<K>
where
    K: Eq + Hash + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` for `key`, stopping any session it replaces.
    /// Returns `true` when a previous session was replaced.
    pub fn insert(&self, key: K, handle: StopHandle) -> bool {
        let previous = self
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, handle);
        match previous {
            Some(old) => {
                if !old.is_stopped() {
                    old.stop();
                }
                true
            },
            None => {
                #[cfg(feature = "metrics")]
                combchats_metrics::gauge!(combchats_metrics::session::ACTIVE).increment(1.0);
                false
            },
        }
    }

    /// Stop and forget the session for `key`. Returns whether one existed.
    pub fn stop(&self, key: &K) -> bool {
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        match removed {
            Some(handle) => {
                debug!(key = ?key, "stopping session");
                if !handle.is_stopped() {
                    handle.stop();
                }
                #[cfg(feature = "metrics")]
                combchats_metrics::gauge!(combchats_metrics::session::ACTIVE).decrement(1.0);
                true
            },
            None => false,
        }
    }

    /// Whether `key` has a session that has not been stopped.
    pub fn is_active(&self, key: &K) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .is_some_and(|h| !h.is_stopped())
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop every session, e.g. on process shutdown.
    pub fn stop_all(&self) {
        let drained: Vec<_> = self
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .collect();
        for (key, handle) in drained {
            debug!(key = ?key, "stopping session");
            if !handle.is_stopped() {
                handle.stop();
            }
            #[cfg(feature = "metrics")]
            combchats_metrics::gauge!(combchats_metrics::session::ACTIVE).decrement(1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::time::Duration};

    #[test]
    fn stop_reports_first_call_only() {
        let (handle, _finished) = StopHandle::new();
        let clone = handle.clone();
        assert!(handle.stop());
        assert!(!clone.stop());
        assert!(clone.is_stopped());
    }

    #[test]
    fn concurrent_stop_across_clones_has_one_winner() {
        for _ in 0..200 {
            let (handle, _finished) = StopHandle::new();
            let barrier = std::sync::Barrier::new(4);
            let winners = std::thread::scope(|s| {
                let joins: Vec<_> = (0..4)
                    .map(|_| {
                        let clone = handle.clone();
                        let barrier = &barrier;
                        s.spawn(move || {
                            barrier.wait();
                            clone.stop()
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
            assert!(handle.is_stopped());
        }
    }

    #[tokio::test]
    async fn stopped_resolves_when_supervisor_finishes() {
        let (handle, finished) = StopHandle::new();
        let token = handle.token();
        tokio::spawn(async move {
            token.cancelled().await;
            drop(finished);
        });
        handle.stop();
        tokio::time::timeout(Duration::from_secs(1), handle.stopped())
            .await
            .unwrap_or_else(|_| panic!("session did not finish"));
    }

    #[test]
    fn registry_replaces_and_stops_previous_session() {
        let registry = SessionRegistry::new();
        let (first, _f1) = StopHandle::new();
        let (second, _f2) = StopHandle::new();

        assert!(!registry.insert(42_i64, first.clone()));
        assert!(registry.is_active(&42));
        assert!(registry.insert(42, second.clone()));
        assert!(first.is_stopped());
        assert!(!second.is_stopped());
        assert_eq!(registry.len(), 1);

        assert!(registry.stop(&42));
        assert!(second.is_stopped());
        assert!(!registry.stop(&42));
        assert!(registry.is_empty());
    }

    #[test]
    fn stop_all_drains_registry() {
        let registry = SessionRegistry::new();
        let (a, _fa) = StopHandle::new();
        let (b, _fb) = StopHandle::new();
        registry.insert("a", a.clone());
        registry.insert("b", b.clone());
        registry.stop_all();
        assert!(a.is_stopped() && b.is_stopped());
        assert!(registry.is_empty());
    }
}
