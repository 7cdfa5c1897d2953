//! Context plumbing for per-crate error enums, and small time helpers.

pub mod error;
pub mod time;

pub use error::FromMessage;
