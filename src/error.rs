/// Error types for workflow synchronization
///
/// Every fallible operation in the sync path returns [`SyncError`]. The variants
/// follow where the failure happened (remote transport, authentication, response
/// decoding, local persistence) so callers at the catch boundaries can log and
/// map them without string matching.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SyncError>;

/// Failures that abort a single sync attempt or remote call
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network-level failure reaching the remote API
    #[error("Transport error ({operation}): {message}")]
    Transport {
        operation: String,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Remote call did not finish before the configured deadline
    #[error("Timed out after {seconds}s during {operation}")]
    Timeout { operation: String, seconds: u64 },

    /// Authenticate call returned non-2xx, or handed back an empty token
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Response body could not be decoded
    #[error("Failed to decode {context}: {message}")]
    Deserialization { context: String, message: String },

    /// Storage read or commit failed; the transaction was rolled back
    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Remote snapshot violates the local table constraints (duplicate ids, bad field sizes)
    #[error("Invalid remote data: {0}")]
    InvalidRemoteData(String),

    /// Another reconciliation pass currently holds the sync guard
    #[error("Synchronization already in progress")]
    SyncInProgress,

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Build a transport error from a reqwest failure
    pub fn transport(operation: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Build a decoding error for the named response
    pub fn deserialization(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Deserialization {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// True for the network class of failures (including timeouts)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_counts_as_transport() {
        let err = SyncError::Timeout { operation: "list workflows".into(), seconds: 5 };
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "Timed out after 5s during list workflows");
    }

    #[test]
    fn auth_and_persistence_are_not_transport() {
        assert!(!SyncError::Authentication("401".into()).is_transport());
        assert!(!SyncError::Persistence(sqlx::Error::RowNotFound).is_transport());
        assert!(!SyncError::SyncInProgress.is_transport());
    }

    #[test]
    fn deserialization_message_names_context() {
        let err = SyncError::deserialization("workflow list", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "Failed to decode workflow list: expected value at line 1"
        );
    }
}
