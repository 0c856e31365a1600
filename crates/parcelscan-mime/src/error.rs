//! Error types for MIME decoding.

use thiserror::Error;

/// Errors that can occur while decoding message content.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid Base64 data.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded bytes are not valid UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Malformed encoding (bad escape sequence, unknown charset token).
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
