use combchats_common::FromMessage;

/// Errors raised by the VK Play Live client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Handshake or transport failure. Fatal to the connection.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A single inbound frame could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

/// `.context()` on transport results yields a connection error.
impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Connection(message)
    }
}

impl From<Error> for combchats_channels::Error {
    fn from(err: Error) -> Self {
        combchats_channels::Error::external("vkplay", err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

combchats_common::impl_context!();
