//! Telegram front-end for combchats.
//!
//! Each Telegram chat walks a small dialogue (`/work`, platform, channel
//! name) and then receives the combined stream of that channel until it
//! sends `/stop`.

pub mod bot;
pub mod dialogue;
pub mod error;
pub mod handlers;
pub mod outbound;
pub mod state;

pub use {
    bot::run_polling,
    dialogue::Stage,
    error::{Error, Result},
    handlers::Frontend,
    outbound::ChatReply,
};
