//! Error types for the activation flow.

use thiserror::Error;

/// Activation errors.
///
/// Every variant is recoverable: the flow returns to a ready state and the
/// message is shown to the user as-is.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// The entered code is blank. No request was sent.
    #[error("activation code is required")]
    Validation,

    /// Connection, TLS or timeout failure.
    #[error("{0}")]
    Transport(String),

    /// Non-success HTTP status. Carries the response body verbatim, or
    /// `HTTP <status>` when the body is blank.
    #[error("{0}")]
    Server(String),

    /// Success status but the body is not a credential link.
    #[error("invalid response from activation server")]
    Protocol,

    /// The credential link yielded no proxy descriptor.
    #[error("no proxies found")]
    EmptyResult,

    /// Status or profile persistence failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Another activation is already running.
    #[error("activation already in progress")]
    InFlight,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of an [`ActivationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Transport,
    Server,
    Protocol,
    EmptyResult,
    Storage,
    InFlight,
    Config,
}

impl ActivationError {
    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation => ErrorKind::Validation,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Server(_) => ErrorKind::Server,
            Self::Protocol => ErrorKind::Protocol,
            Self::EmptyResult => ErrorKind::EmptyResult,
            Self::Storage(_) | Self::Serialization(_) => ErrorKind::Storage,
            Self::InFlight => ErrorKind::InFlight,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<std::io::Error> for ActivationError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Result type for activation operations.
pub type ActivationResult<T> = Result<T, ActivationError>;
