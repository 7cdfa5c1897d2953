//! In-memory sources and sinks for session tests.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    chrono::Utc,
    combchats_channels::{
        ChannelRef, ChatMessage, ChatSink, ChatSource, DedupSet, Error, MessageSender, Result,
        SenderIdentity,
    },
};

use crate::factory::ChatFactory;

pub fn msg(author: &str, text: &str) -> ChatMessage {
    ChatMessage::new(author, text, Utc::now())
}

#[derive(Debug)]
pub struct FakeSource {
    channel: ChannelRef,
    emit: Mutex<Option<MessageSender>>,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl FakeSource {
    fn new(channel: ChannelRef) -> Self {
        Self {
            channel,
            emit: Mutex::new(None),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    /// Deliver a message as if it arrived from the platform.
    pub async fn push(&self, msg: ChatMessage) {
        let emit = self.emit.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(emit) = emit {
            let _ = emit.send(msg).await;
        }
    }

    /// Simulate the connection dropping.
    pub fn disconnect(&self) {
        self.emit.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl ChatSource for FakeSource {
    fn channel(&self) -> &ChannelRef {
        &self.channel
    }

    fn start(&self, emit: MessageSender) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.emit.lock().unwrap_or_else(|e| e.into_inner()) = Some(emit);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.disconnect();
    }
}

#[derive(Debug)]
pub struct FakeSink {
    channel: ChannelRef,
    pub identity: String,
    sent: Mutex<Vec<String>>,
    stops: AtomicUsize,
    fail_next: AtomicUsize,
    watched: Mutex<Option<DedupSet>>,
    recorded_before_send: Mutex<Vec<bool>>,
}

impl FakeSink {
    /// From now on, note whether each text is already in `set` at the
    /// moment `send` is entered.
    pub fn watch_dedup(&self, set: DedupSet) {
        *self.watched.lock().unwrap_or_else(|e| e.into_inner()) = Some(set);
    }

    pub fn recorded_before_send(&self) -> Vec<bool> {
        self.recorded_before_send
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Make the next `n` sends fail.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatSink for FakeSink {
    fn channel(&self) -> &ChannelRef {
        &self.channel
    }

    async fn send(&self, text: &str) -> Result<()> {
        let watched = self.watched.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(set) = watched {
            self.recorded_before_send
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(set.contains(text));
        }
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::unavailable("simulated send failure"));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out fakes and remembers them by channel. Channel names starting
/// with `bad` are rejected as configuration errors.
#[derive(Debug, Default)]
pub struct FakeFactory {
    sources: Mutex<HashMap<ChannelRef, Arc<FakeSource>>>,
    sinks: Mutex<HashMap<ChannelRef, Arc<FakeSink>>>,
}

impl FakeFactory {
    pub fn source_for(&self, channel: &ChannelRef) -> Arc<FakeSource> {
        let sources = self.sources.lock().unwrap_or_else(|e| e.into_inner());
        match sources.get(channel) {
            Some(s) => Arc::clone(s),
            None => panic!("no source built for {channel}"),
        }
    }

    pub fn sink_for(&self, channel: &ChannelRef) -> Arc<FakeSink> {
        let sinks = self.sinks.lock().unwrap_or_else(|e| e.into_inner());
        match sinks.get(channel) {
            Some(s) => Arc::clone(s),
            None => panic!("no sink built for {channel}"),
        }
    }

    pub fn sources_built(&self) -> usize {
        self.sources.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn total_starts(&self) -> usize {
        self.sources
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|s| s.starts())
            .sum()
    }
}

fn reject_bad(channel: &ChannelRef) -> Result<()> {
    if channel.name.starts_with("bad") {
        return Err(Error::configuration(format!("unsupported channel {channel}")));
    }
    Ok(())
}

impl ChatFactory for FakeFactory {
    fn source(&self, channel: &ChannelRef) -> Result<Arc<dyn ChatSource>> {
        reject_bad(channel)?;
        let source = Arc::new(FakeSource::new(channel.clone()));
        self.sources
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel.clone(), Arc::clone(&source));
        Ok(source)
    }

    fn sink(&self, channel: &ChannelRef, identity: &SenderIdentity) -> Result<Arc<dyn ChatSink>> {
        reject_bad(channel)?;
        let sink = Arc::new(FakeSink {
            channel: channel.clone(),
            identity: identity.display_name.clone(),
            sent: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
            fail_next: AtomicUsize::new(0),
            watched: Mutex::new(None),
            recorded_before_send: Mutex::new(Vec::new()),
        });
        self.sinks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel.clone(), Arc::clone(&sink));
        Ok(sink)
    }
}

/// Poll `cond` until it holds, failing the test after a few seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
