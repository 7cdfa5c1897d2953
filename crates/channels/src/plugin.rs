use {async_trait::async_trait, tokio::sync::mpsc};

use crate::{ChannelRef, ChatMessage, Result};

/// Sender half handed to [`ChatSource::start`].
pub type MessageSender = mpsc::Sender<ChatMessage>;

/// Receiver half consumed by the combiner, forwarder or a front-end.
pub type MessageReceiver = mpsc::Receiver<ChatMessage>;

/// Reads a live chat room.
///
/// Implementations spawn their own background task in [`start`] and return
/// immediately. Connection failures end the task quietly: the caller sees
/// the stream starve, never an error item.
///
/// [`start`]: ChatSource::start
pub trait ChatSource: Send + Sync {
    /// Room this source reads.
    fn channel(&self) -> &ChannelRef;

    /// Begin reading, pushing every parsed chat line into `emit`.
    ///
    /// Must be called from within a tokio runtime. Starting twice is an
    /// `InvalidInput` error; starting after [`stop`](ChatSource::stop) is
    /// `Unavailable`.
    fn start(&self, emit: MessageSender) -> Result<()>;

    /// Request shutdown and close the transport.
    ///
    /// Idempotent and callable from any task. Nothing is emitted once this
    /// returns.
    fn stop(&self);
}

/// Posts text into a chat room as an authenticated identity.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Room this sink posts into.
    fn channel(&self) -> &ChannelRef;

    /// Submit one message. `Ok` means "submitted", not "delivered".
    async fn send(&self, text: &str) -> Result<()>;

    /// Release transport resources. Idempotent.
    fn stop(&self);
}
