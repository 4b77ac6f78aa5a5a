//! Persistent store contract and the in-process backend.
//!
//! Backends:
//!
//! - [`MemoryRevocationStore`]: process-local table, for embedding and tests.
//! - [`crate::infra::db::PostgresRevocationStore`]: durable table shared by
//!   every process pointed at the same database.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::revocation::{RevocationAnswer, SubjectKey};

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("revocation cache store is already provisioned")]
    AlreadyProvisioned,
    #[error("revocation cache store is not provisioned")]
    NotProvisioned,
    #[error("revocation cache store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Durable key → answer table.
///
/// `upsert` must be atomic per key against writers in other processes; the
/// cache never does read-modify-write on top of it.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Whether the backing structure exists. Safe to call before `init`.
    async fn exists(&self) -> Result<bool, StoreError>;

    /// Create the backing structure.
    async fn init(&self) -> Result<(), StoreError>;

    /// Drop the backing structure and every entry in it.
    async fn destroy(&self) -> Result<(), StoreError>;

    /// Single-key lookup; a miss is `Ok(None)`.
    async fn find(&self, key: &SubjectKey) -> Result<Option<RevocationAnswer>, StoreError>;

    /// Insert or wholly replace the entry for `key`.
    async fn upsert(&self, key: &SubjectKey, answer: &RevocationAnswer) -> Result<(), StoreError>;
}

/// In-memory backend. `None` means the table has not been provisioned.
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    entries: RwLock<Option<HashMap<SubjectKey, RevocationAnswer>>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that is already provisioned.
    pub fn provisioned() -> Self {
        Self {
            entries: RwLock::new(Some(HashMap::new())),
        }
    }

    /// Number of stored entries; zero when not provisioned.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len")
            .as_ref()
            .map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn exists(&self) -> Result<bool, StoreError> {
        Ok(rw_read(&self.entries, SOURCE, "exists").is_some())
    }

    async fn init(&self) -> Result<(), StoreError> {
        let mut entries = rw_write(&self.entries, SOURCE, "init");
        if entries.is_some() {
            return Err(StoreError::AlreadyProvisioned);
        }
        *entries = Some(HashMap::new());
        Ok(())
    }

    async fn destroy(&self) -> Result<(), StoreError> {
        rw_write(&self.entries, SOURCE, "destroy")
            .take()
            .map(|_| ())
            .ok_or(StoreError::NotProvisioned)
    }

    async fn find(&self, key: &SubjectKey) -> Result<Option<RevocationAnswer>, StoreError> {
        let entries = rw_read(&self.entries, SOURCE, "find");
        let table = entries
            .as_ref()
            .ok_or_else(|| StoreError::unavailable("cache table is not provisioned"))?;
        Ok(table.get(key).cloned())
    }

    async fn upsert(&self, key: &SubjectKey, answer: &RevocationAnswer) -> Result<(), StoreError> {
        let mut entries = rw_write(&self.entries, SOURCE, "upsert");
        let table = entries
            .as_mut()
            .ok_or_else(|| StoreError::unavailable("cache table is not provisioned"))?;
        table.insert(key.clone(), answer.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::domain::revocation::{RevocationEvidence, RevocationKind, RevocationStatus};

    use super::*;

    fn answer(key: &str, encoded: &[u8]) -> RevocationAnswer {
        RevocationAnswer::new(
            SubjectKey::from_stored(key),
            RevocationEvidence {
                kind: RevocationKind::Crl,
                status: RevocationStatus::Unknown,
                this_update: datetime!(2024-02-01 00:00 UTC),
                next_update: None,
                produced_at: datetime!(2024-02-01 00:00 UTC),
                source_url: Some("http://crl.example.test/ca.crl".to_string()),
                encoded: encoded.to_vec(),
            },
        )
    }

    #[tokio::test]
    async fn lifecycle_is_not_idempotent() {
        let store = MemoryRevocationStore::new();
        assert!(!store.exists().await.expect("exists"));

        store.init().await.expect("first init");
        assert!(store.exists().await.expect("exists"));
        assert!(matches!(
            store.init().await,
            Err(StoreError::AlreadyProvisioned)
        ));

        store.destroy().await.expect("first destroy");
        assert!(!store.exists().await.expect("exists"));
        assert!(matches!(
            store.destroy().await,
            Err(StoreError::NotProvisioned)
        ));
    }

    #[tokio::test]
    async fn upsert_replaces_whole_record() {
        let store = MemoryRevocationStore::provisioned();
        let key = SubjectKey::from_stored("k1");

        assert!(store.find(&key).await.expect("find").is_none());

        store.upsert(&key, &answer("k1", b"v1")).await.expect("insert");
        store.upsert(&key, &answer("k1", b"v2")).await.expect("update");

        let stored = store.find(&key).await.expect("find").expect("entry");
        assert_eq!(stored.encoded(), b"v2");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unprovisioned_reads_and_writes_are_storage_failures() {
        let store = MemoryRevocationStore::new();
        let key = SubjectKey::from_stored("k1");

        assert!(matches!(
            store.find(&key).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.upsert(&key, &answer("k1", b"v1")).await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn destroy_drops_entries() {
        let store = MemoryRevocationStore::provisioned();
        let key = SubjectKey::from_stored("k1");
        store.upsert(&key, &answer("k1", b"v1")).await.expect("insert");

        store.destroy().await.expect("destroy");
        store.init().await.expect("re-init");

        assert!(store.find(&key).await.expect("find").is_none());
        assert!(store.is_empty());
    }
}
