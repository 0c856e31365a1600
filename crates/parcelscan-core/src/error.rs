//! Error types for the scanning engine.
//!
//! The taxonomy mirrors the failure policy: configuration errors are
//! surfaced before any protocol I/O, connect/login/folder errors are
//! fatal for one scan, and everything below that is absorbed into
//! zero/empty results by the layer that observed it.

use thiserror::Error;

/// Configuration problems detected before any protocol I/O.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A forwarding-address entry is not an email address.
    #[error("invalid_email_format: {0:?}")]
    InvalidEmailFormat(String),

    /// A required field is empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Errors that can occur during a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Network/transport failure reaching the mail host. Scan-fatal.
    #[error("Network error while connecting to server: {0}")]
    Connection(String),

    /// Credentials rejected by the server. Scan-fatal.
    #[error("Error logging into IMAP Server: {0}")]
    Login(String),

    /// Folder missing or unselectable. Scan-fatal.
    #[error("Error selecting folder: {0}")]
    Folder(String),

    /// A search returned a non-OK status. Local to the affected rule.
    #[error("Error searching emails: {0}")]
    Search(String),

    /// A fetch returned a non-OK status. Local to the affected rule.
    #[error("Error fetching emails: {0}")]
    Fetch(String),

    /// A message body could not be decoded. Local to the message.
    #[error("Problem decoding email message: {0}")]
    Decode(#[from] parcelscan_mime::Error),

    /// Malformed configuration. Raised before any protocol I/O.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The image stage failed; the scan result still stands.
    #[error("Image pipeline error: {0}")]
    ImagePipeline(String),

    /// Filesystem error in the image working directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, ScanError>;
