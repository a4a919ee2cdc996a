//! Persistence error types.
//!
//! Store reads never fail outward; writes and administrative calls return
//! these errors so callers can decide whether to surface them.

use std::path::PathBuf;
use thiserror::Error;

/// Persistence operation error.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The request never produced an HTTP response (connection refused, timeout, ...).
    #[error("Network request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status.
    #[error("Backend returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// A payload could not be encoded or decoded as JSON.
    #[error("Invalid JSON payload for {context}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Local fallback storage could not be read or written.
    #[error("Failed to {operation} local store entry: {key}")]
    LocalStorage {
        operation: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored value does not match the expected shape of its store.
    #[error("Store '{store_id}' does not match its expected shape")]
    Schema {
        store_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file could not be read or parsed.
    #[error("Invalid configuration file: {path}")]
    Config { path: PathBuf, reason: String },
}

impl PersistError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } => {
                "Could not reach the calculation server. Changes are kept locally.".to_string()
            }
            Self::HttpStatus { status, .. } => {
                format!("The server rejected the request (HTTP {status}).")
            }
            Self::Json { context, .. } => {
                format!("Received malformed data while handling {context}.")
            }
            Self::LocalStorage { key, .. } => {
                format!("Could not access the local copy of '{key}'.")
            }
            Self::Schema { store_id, .. } => {
                format!("The saved data for '{store_id}' has an unexpected format.")
            }
            Self::Config { path, reason } => {
                format!(
                    "The configuration file at {} is invalid: {}",
                    path.display(),
                    reason
                )
            }
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Network { .. } => {
                Some("Check that the backend is running and reachable.".into())
            }
            Self::HttpStatus { status, .. } if *status == 404 => {
                Some("The store does not exist on the server.".into())
            }
            Self::HttpStatus { .. } => None,
            Self::Json { .. } => None,
            Self::LocalStorage { .. } => {
                Some("Check permissions of the local data directory.".into())
            }
            Self::Schema { .. } => Some("Clear the module data and enter it again.".into()),
            Self::Config { .. } => Some("Fix or remove the configuration file.".into()),
        }
    }

    /// Whether this error means the backend could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_messages() {
        let err = PersistError::HttpStatus {
            status: 404,
            url: "http://localhost/stores/x".into(),
        };
        assert!(err.user_message().contains("404"));
        assert!(err.suggestion().is_some());
        assert!(!err.is_connectivity());

        let err = PersistError::HttpStatus {
            status: 500,
            url: "http://localhost/stores/x".into(),
        };
        assert!(err.suggestion().is_none());
    }

    #[test]
    fn test_local_storage_message_names_key() {
        let err = PersistError::LocalStorage {
            operation: "write",
            key: "store_losses".into(),
            source: std::io::Error::other("disk full"),
        };
        assert!(err.user_message().contains("store_losses"));
        assert_eq!(
            err.to_string(),
            "Failed to write local store entry: store_losses"
        );
    }
}
