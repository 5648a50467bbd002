use thiserror::Error;

use medtrack_core::DomainError;

use crate::store::StoreError;

/// Error surface of the service layer.
///
/// Business-rule failures keep their `DomainError` taxonomy and must not be
/// retried; `TransientStorage` is the one retryable class, and the caller
/// retries the whole operation from scratch (no partial state exists to
/// resume from).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("transient storage failure: {0}")]
    TransientStorage(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ServiceError::Domain(DomainError::Conflict(msg)),
            StoreError::InsufficientQuantity {
                requested,
                available,
            } => ServiceError::Domain(DomainError::InsufficientStock {
                requested,
                available,
            }),
            StoreError::NotFound => ServiceError::Domain(DomainError::NotFound),
            StoreError::Integrity(msg) => ServiceError::Domain(DomainError::Validation(msg)),
            StoreError::Transient(msg) => ServiceError::TransientStorage(msg),
        }
    }
}

impl ServiceError {
    /// Whether the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::TransientStorage(_))
    }
}
