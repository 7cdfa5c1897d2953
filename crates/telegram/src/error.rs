use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Relay(#[from] combchats_relay::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
