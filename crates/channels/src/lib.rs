//! Chat channel primitives.
//!
//! Every platform adapter (Twitch, VK Play Live) implements [`ChatSource`]
//! for reading a room and [`ChatSink`] for posting into it. The relay crate
//! only ever talks to these traits.

pub mod channel;
pub mod dedup;
pub mod error;
pub mod lifecycle;
pub mod message;
pub mod plugin;

pub use {
    channel::{ChannelRef, Platform, SenderIdentity},
    dedup::DedupSet,
    error::{Error, Result},
    lifecycle::Lifecycle,
    message::ChatMessage,
    plugin::{ChatSink, ChatSource, MessageReceiver, MessageSender},
};
