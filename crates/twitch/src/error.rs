#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid twitch login '{login}': {message}")]
    InvalidLogin { login: String, message: String },

    #[error("twitch send failed: {0}")]
    Send(String),
}

impl Error {
    #[must_use]
    pub fn invalid_login(login: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::InvalidLogin {
            login: login.into(),
            message: message.to_string(),
        }
    }
}

impl From<Error> for combchats_channels::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidLogin { .. } => combchats_channels::Error::invalid_input(err.to_string()),
            Error::Send(_) => combchats_channels::Error::external("twitch", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
