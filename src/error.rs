//! Error types for the OpenEBS volume provisioner
//!
//! Provides structured error types for the provisioning, deletion and
//! snapshot engines plus the maya-apiserver client.

use thiserror::Error;

/// Unified error type for the provisioner
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    // =========================================================================
    // maya-apiserver Errors
    // =========================================================================
    #[error("maya-apiserver connection error: {0}")]
    Connection(#[from] reqwest::Error),

    /// Non-200 response from maya-apiserver. The body is carried verbatim
    /// for diagnostics; callers decide whether to retry.
    #[error("maya-apiserver returned {status}: {body}")]
    RemoteApi { status: u16, body: String },

    /// 404 on a volume read. Normal branch of the provisioning state
    /// machine, never treated as a failure there.
    #[error("volume {name} not found")]
    NotFound { name: String },

    // =========================================================================
    // Request Validation Errors
    // =========================================================================
    #[error("filesystem {fs_type} is not supported")]
    UnsupportedFilesystem { fs_type: String },

    #[error("invalid access modes: {requested:?}, supported: {supported:?}")]
    UnsupportedAccessMode {
        requested: Vec<String>,
        supported: Vec<String>,
    },

    #[error("volume type {cas_type} does not support snapshots")]
    UnsupportedCasType { cas_type: String },

    // =========================================================================
    // Deletion Errors
    // =========================================================================
    #[error("provisioner identity annotation not found on volume {name}")]
    MissingProvenance { name: String },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Action to take on error during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Don't requeue, wait for a changed request
    NoRequeue,
}

impl Error {
    /// Determine what action the external reconciliation loop should take
    /// for this error. The engine itself never retries.
    pub fn action(&self) -> ErrorAction {
        match self {
            // Transient remote/cluster errors - retry with backoff
            Error::Connection(_) | Error::Kube(_) | Error::RemoteApi { .. } => {
                ErrorAction::RequeueWithBackoff
            }

            // Validation and configuration errors - a retry with the same
            // request can never succeed
            Error::Configuration(_)
            | Error::UnsupportedFilesystem { .. }
            | Error::UnsupportedAccessMode { .. }
            | Error::UnsupportedCasType { .. }
            | Error::MissingProvenance { .. } => ErrorAction::NoRequeue,

            // All other errors - retry with backoff
            _ => ErrorAction::RequeueWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRequeue)
    }

    /// Check if this error is the not-found branch of a read
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// Result type alias for the provisioner
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_actions() {
        let err = Error::RemoteApi {
            status: 500,
            body: "server panic".into(),
        };
        assert_eq!(err.action(), ErrorAction::RequeueWithBackoff);

        let err = Error::Configuration("MAPI_ADDR not set".into());
        assert_eq!(err.action(), ErrorAction::NoRequeue);

        let err = Error::UnsupportedFilesystem {
            fs_type: "nfs".into(),
        };
        assert_eq!(err.action(), ErrorAction::NoRequeue);
    }

    #[test]
    fn test_error_retryable() {
        let remote = Error::RemoteApi {
            status: 503,
            body: "unavailable".into(),
        };
        assert!(remote.is_retryable());

        let provenance = Error::MissingProvenance {
            name: "pvc-1".into(),
        };
        assert!(!provenance.is_retryable());
    }

    #[test]
    fn test_not_found_classification() {
        let err = Error::NotFound {
            name: "default-claim-1".into(),
        };
        assert!(err.is_not_found());
        assert!(err.is_retryable());

        let err = Error::RemoteApi {
            status: 500,
            body: String::new(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_remote_api_preserves_body() {
        let err = Error::RemoteApi {
            status: 400,
            body: "invalid capacity '5Gi!'".into(),
        };
        assert!(err.to_string().contains("invalid capacity '5Gi!'"));
    }
}
