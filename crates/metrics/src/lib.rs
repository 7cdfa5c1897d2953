//! Metrics for combchats.
//!
//! Adapter and relay crates record through the `metrics` facade behind their
//! own `metrics` feature; names live here so dashboards and code agree. With
//! the `prometheus` feature the binary can install an exporter and render the
//! text format.
//!
//! ```rust,ignore
//! use combchats_metrics::{counter, labels, relay};
//!
//! counter!(relay::MESSAGES_FORWARDED_TOTAL, labels::PLATFORM => "twitch").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, gauge};
