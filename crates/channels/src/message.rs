use {
    chrono::{DateTime, Utc},
    serde::Serialize,
};

/// A single chat line as read from a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub text: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        author: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            timestamp,
        }
    }

    /// Render as `"author: text"`.
    ///
    /// This is the exact string posted by the forwarder and the key stored
    /// in [`DedupSet`](crate::DedupSet).
    pub fn render(&self) -> String {
        format!("{}: {}", self.author, self.text)
    }
}

impl std::fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.author, self.text)
    }
}
