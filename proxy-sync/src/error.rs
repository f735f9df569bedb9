//! Error types for proxy-sync

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Sync error types
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration file does not exist
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Configuration could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Login rejected or unreachable server
    #[error("Failed to log in to {address}: {reason}")]
    Authentication { address: String, reason: String },

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a status the operation does not accept
    #[error("{operation} on {url} returned HTTP {status}")]
    UnexpectedStatus {
        operation: &'static str,
        url: String,
        status: u16,
    },

    /// Response body did not have the expected shape
    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    /// Source login failed; the whole run is aborted
    #[error("Source server {address} rejected login: {source}")]
    SourceAuth {
        address: String,
        #[source]
        source: Box<SyncError>,
    },

    /// Source host list could not be fetched; the cycle is aborted
    #[error("Failed to get proxy hosts from source {address}: {source}")]
    SourceFetch {
        address: String,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// Whether this error must terminate the process rather than the current cycle
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::ConfigNotFound(_) | SyncError::Config(_) | SyncError::SourceAuth { .. }
        )
    }
}
