//! VK Play Live chat over the platform's own pub/sub protocol.
//!
//! Reading a room takes an anonymous websocket token, resolves the blog name
//! to its pub/sub channel, then subscribes over a raw websocket. Posting is
//! a plain authenticated REST call and never touches the socket.

pub mod auth;
pub mod blog;
pub mod client;
pub mod config;
pub mod error;
pub mod outbound;
pub mod protocol;
pub mod source;

pub use {
    client::{ConnectionState, PubSubClient},
    config::VkPlayEndpoints,
    error::{Error, Result},
    outbound::VkPlaySink,
    source::VkPlaySource,
};
