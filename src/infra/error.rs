//! Error types for the view proof service

use thiserror::Error;

use crate::domain::AssetId;

use super::retry::is_retryable_db_error;

/// Errors that can occur while recording views or issuing proofs
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Referenced asset does not exist
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    /// A required endpoint or credential is not configured
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Database error
    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// ZK prover or view-count endpoint failure
    #[error("external service error: {0}")]
    ExternalService(String),

    /// Every verification stage failed
    #[error("view count verification failed for asset {asset_id} (expected at least {expected})")]
    VerificationFailed { asset_id: AssetId, expected: u64 },

    /// Malformed caller input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Persistence(err) => is_retryable_db_error(err),
            Self::ExternalService(_) => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization: {err}"))
    }
}

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ServiceError::Persistence(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!ServiceError::Persistence(sqlx::Error::PoolClosed).is_retryable());
        assert!(!ServiceError::AssetNotFound(AssetId::new("A1")).is_retryable());
        assert!(!ServiceError::Configuration("CLIENT_APP_URL".into()).is_retryable());
    }

    #[test]
    fn test_verification_failed_message_carries_expected() {
        let err = ServiceError::VerificationFailed {
            asset_id: AssetId::new("A1"),
            expected: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("A1"));
        assert!(msg.contains('7'));
    }
}
