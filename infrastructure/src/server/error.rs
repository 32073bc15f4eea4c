//! Error types for the connection transport

use thiserror::Error;

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors that end a connection session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid frame header: {0}")]
    InvalidHeader(String),

    #[error("Frame header exceeds the {limit} byte limit")]
    HeaderTooLarge { limit: usize },

    #[error("Frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("Transport closed")]
    TransportClosed,
}
