/// Authorization failures. Every variant maps to `401` at the HTTP boundary
/// except [`Error::Hash`] and [`Error::Store`], which are server faults.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("malformed authorization header: {reason}")]
    MalformedHeader { reason: &'static str },

    #[error("unknown account: {username}")]
    UnknownAccount { username: String },

    #[error("invalid password for account: {username}")]
    InvalidPassword { username: String },

    #[error("failed to hash password: {message}")]
    Hash { message: String },

    #[error("account store failed: {context}: {source}")]
    Store {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn store(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether this failure is the caller's fault (bad or missing credentials)
    /// rather than ours.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Hash { .. } | Self::Store { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
