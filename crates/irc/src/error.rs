use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tls(#[from] rustls::Error),

    #[error("invalid server name: {server}")]
    InvalidServerName { server: String },

    #[error("timed out after {timeout:?} connecting to {server}")]
    ConnectTimeout { server: String, timeout: Duration },

    #[error("SASL authentication failed: {reason}")]
    SaslRejected { reason: String },

    #[error("connection closed: {reason}")]
    Closed { reason: String },

    #[error("irc session is not connected")]
    NotConnected,

    #[error("irc session not ready after {timeout:?}")]
    NotReady { timeout: Duration },
}

impl Error {
    #[must_use]
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::Closed {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
