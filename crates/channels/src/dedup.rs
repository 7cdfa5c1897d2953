use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex},
};

use lru::LruCache;

use crate::ChatMessage;

/// Default number of rendered messages remembered by a forwarding session.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Loop-prevention set shared by both directions of a bidirectional relay.
///
/// Keys are always the rendered outbound string (`"author: text"`). An
/// incoming message counts as already seen when either its raw text or its
/// rendered form is a key: the first catches the relay's own post echoed
/// back by the other room, the second catches a verbatim re-post.
///
/// Bounded with least-recently-inserted eviction; a capacity of `0` keeps
/// every key.
#[derive(Clone)]
pub struct DedupSet {
    inner: Arc<Mutex<LruCache<String, ()>>>,
}

impl DedupSet {
    pub fn new(capacity: usize) -> Self {
        let cache = match NonZeroUsize::new(capacity) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Check `msg` and, when unseen, record its rendered form in the same
    /// critical section.
    ///
    /// Returns the rendered text to send, or `None` when the message must be
    /// dropped.
    pub fn admit(&self, msg: &ChatMessage) -> Option<String> {
        let rendered = msg.render();
        let mut cache = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if cache.contains(msg.text.as_str()) || cache.contains(rendered.as_str()) {
            return None;
        }
        cache.put(rendered.clone(), ());
        Some(rendered)
    }

    pub fn contains(&self, key: &str) -> bool {
        let cache = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        cache.contains(key)
    }

    pub fn len(&self) -> usize {
        let cache = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `other` shares storage with this set.
    pub fn same_set(&self, other: &DedupSet) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for DedupSet {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for DedupSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupSet").field("len", &self.len()).finish()
    }
}
