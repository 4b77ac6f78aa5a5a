//! Cache event stream.
//!
//! Every lookup decision is published as a [`CacheEvent`]. Auditors and
//! metrics exporters subscribe; nothing in the lookup path waits on them.

use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::domain::revocation::SubjectKey;

const DEFAULT_CAPACITY: usize = 256;

/// Monotonic sequence number assigned at publish time.
pub type Epoch = u64;

#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Unique identifier (UUIDv4).
    pub id: Uuid,
    /// Publish order within this process.
    pub epoch: Epoch,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A fresh entry was served from the store.
    Hit { key: SubjectKey },
    /// No entry was stored for the key.
    Miss { key: SubjectKey },
    /// An entry was stored but past its effective expiry.
    Stale { key: SubjectKey },
    /// A waiter found the entry refreshed by another caller.
    Coalesced { key: SubjectKey },
    /// A remote answer was fetched and persisted.
    Refreshed { key: SubjectKey },
    /// The remote authority gave no answer; the lookup returns nothing.
    FetchFailed { key: SubjectKey, reason: String },
    /// Lookup needed the remote authority but no fetcher is configured.
    NoFetcher { key: SubjectKey },
    Provisioned,
    Deprovisioned,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Hit { .. } => "hit",
            EventKind::Miss { .. } => "miss",
            EventKind::Stale { .. } => "stale",
            EventKind::Coalesced { .. } => "coalesced",
            EventKind::Refreshed { .. } => "refreshed",
            EventKind::FetchFailed { .. } => "fetch_failed",
            EventKind::NoFetcher { .. } => "no_fetcher",
            EventKind::Provisioned => "provisioned",
            EventKind::Deprovisioned => "deprovisioned",
        }
    }
}

/// Broadcast stream of cache events.
///
/// Slow subscribers lag and lose the oldest events; publishers never block.
pub struct CacheEvents {
    sender: broadcast::Sender<CacheEvent>,
    epoch_counter: AtomicU64,
}

impl CacheEvents {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.sender.subscribe()
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Publish an event to current subscribers.
    pub fn publish(&self, kind: EventKind) {
        let event = CacheEvent::new(kind, self.next_epoch());

        debug!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = event.kind.name(),
            "Revocation cache event published"
        );

        // No subscribers is the common case.
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for CacheEvents {
    fn default() -> Self {
        Self::new()
    }
}
