use chrono::{DateTime, Utc};

/// Convert unix-epoch seconds into a UTC instant.
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn from_unix_secs(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}
