//! Error types for satchel-core

use thiserror::Error;

/// Result type alias using satchel-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in satchel-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The remote endpoint could not be reached (timeout, connect, DNS)
    #[error("Network error: {0}")]
    Network(String),

    /// The remote endpoint answered with an error status
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Cache store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a server error from status and message
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// True when the remote was unreachable rather than answering with an
    /// error status.
    ///
    /// Network failures trigger the offline fallback paths; server errors
    /// are surfaced to the caller and never converted into pending work.
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// HTTP status if this is a server error.
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        // A response status means the server answered; anything else
        // (timeout, connect, request build) counts as unreachable.
        error.status().map_or_else(
            || Self::Network(error.to_string()),
            |status| Self::Server {
                status: status.as_u16(),
                message: error.to_string(),
            },
        )
    }
}
