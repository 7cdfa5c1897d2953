//! Metric name and label definitions.

/// Chat source metrics
pub mod source {
    /// Chat messages decoded and emitted, by platform
    pub const MESSAGES_RECEIVED: &str = "combchats_source_messages_received_total";
    /// Inbound frames skipped because they could not be decoded
    pub const DECODE_ERRORS: &str = "combchats_source_decode_errors_total";
    /// Source connections that ended with a transport error
    pub const CONNECTION_FAILURES: &str = "combchats_source_connection_failures_total";
}

/// Chat sink metrics
pub mod sink {
    /// Messages submitted to a platform
    pub const MESSAGES_SENT: &str = "combchats_sink_messages_sent_total";
    /// Send attempts that failed
    pub const SEND_FAILURES: &str = "combchats_sink_send_failures_total";
}

/// Combiner and forwarder metrics
pub mod relay {
    /// Messages relayed from one room into another
    pub const MESSAGES_FORWARDED_TOTAL: &str = "combchats_relay_messages_forwarded_total";
    /// Messages dropped by the de-duplication set
    pub const DUPLICATES_DROPPED_TOTAL: &str = "combchats_relay_duplicates_dropped_total";
    /// Messages merged into a combined stream
    pub const MESSAGES_COMBINED_TOTAL: &str = "combchats_relay_messages_combined_total";
}

/// Session metrics
pub mod session {
    /// Sessions started
    pub const STARTED_TOTAL: &str = "combchats_sessions_started_total";
    /// Currently running sessions
    pub const ACTIVE: &str = "combchats_sessions_active";
}

/// Common label keys
pub mod labels {
    pub const PLATFORM: &str = "platform";
    pub const KIND: &str = "kind";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_share_prefix() {
        for name in [
            source::MESSAGES_RECEIVED,
            source::DECODE_ERRORS,
            source::CONNECTION_FAILURES,
            sink::MESSAGES_SENT,
            sink::SEND_FAILURES,
            relay::MESSAGES_FORWARDED_TOTAL,
            relay::DUPLICATES_DROPPED_TOTAL,
            relay::MESSAGES_COMBINED_TOTAL,
            session::STARTED_TOTAL,
            session::ACTIVE,
        ] {
            assert!(name.starts_with("combchats_"), "{name}");
        }
    }
}
