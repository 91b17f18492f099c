//! Common error types for TuneBox

use thiserror::Error;

/// Common result type for TuneBox operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared by every TuneBox component
#[derive(Error, Debug)]
pub enum Error {
    /// Backing store unreachable or query failed (wraps sqlx::Error)
    #[error("Store unavailable: {0}")]
    Store(#[from] sqlx::Error),

    /// Media server unreachable or returned an unexpected response
    #[error("Media server unavailable: {0}")]
    MediaServer(String),

    /// Item already present (e.g. track already queued)
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The media server reports no output devices at all
    #[error("No active players found")]
    NoPlayersFound,

    /// No output device could be resolved for a playback command
    #[error("No active player found")]
    NoActivePlayer,

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for collaborator failures (store or media server unreachable)
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Store(_) | Error::MediaServer(_))
    }
}
