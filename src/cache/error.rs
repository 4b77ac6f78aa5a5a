use thiserror::Error;

use crate::domain::error::DomainError;

use super::store::StoreError;

/// Errors surfaced by [`super::RevocationCache`].
///
/// Remote fetch failures are absent on purpose: they end a lookup with
/// `Ok(None)` instead.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("revocation cache storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("revocation cache is already provisioned")]
    AlreadyProvisioned,
    #[error("revocation cache is not provisioned")]
    NotProvisioned,
}

impl From<StoreError> for CacheError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyProvisioned => CacheError::AlreadyProvisioned,
            StoreError::NotProvisioned => CacheError::NotProvisioned,
            StoreError::Unavailable(message) => CacheError::StorageUnavailable(message),
        }
    }
}

impl From<DomainError> for CacheError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { message } => CacheError::InvalidInput(message),
            // Invariants only break on rows read back from storage.
            DomainError::Invariant { message } => CacheError::StorageUnavailable(message),
        }
    }
}
