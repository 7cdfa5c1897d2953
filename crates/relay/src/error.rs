#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The session cannot be built from the given channels or endpoints.
    #[error("relay configuration error: {message}")]
    Configuration { message: String },

    #[error(transparent)]
    Channel(#[from] combchats_channels::Error),
}

impl Error {
    #[must_use]
    pub fn configuration(message: impl std::fmt::Display) -> Self {
        Self::Configuration {
            message: message.to_string(),
        }
    }

    /// Whether the session was rejected before any connection attempt.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Configuration { .. } => true,
            Self::Channel(e) => e.is_configuration(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
