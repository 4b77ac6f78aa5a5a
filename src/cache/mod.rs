//! Revocation evidence cache.
//!
//! Answers "is this certificate revoked?" from a persistent store of
//! previously fetched evidence, falling back to a remote authority when the
//! stored answer is missing or stale:
//!
//! - **Store**: one row per certificate/issuer pair, keyed by a SHA-256
//!   subject key ([`RevocationStore`]).
//! - **Policy**: `next_update`, a default delay and an optional ceiling
//!   decide freshness ([`FreshnessPolicy`]).
//! - **Fetch**: at most one remote fetch per key at a time, its outcome shared
//!   with concurrent callers ([`RemoteFetcher`], bounded by the fetch timeout).
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! default_next_update_delay_secs = 300
//! # max_next_update_delay_secs = 86400
//! fetch_timeout_ms = 10000
//! event_capacity = 256
//! ```

mod clock;
mod config;
mod error;
mod events;
mod fetcher;
mod inflight;
mod keys;
mod lock;
mod policy;
mod service;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use error::CacheError;
pub use events::{CacheEvent, CacheEvents, Epoch, EventKind};
pub use fetcher::{FetchError, RemoteFetcher};
pub use inflight::{FetchLead, FetchWait, Flight, InFlightFetches};
pub use keys::derive_subject_key;
pub use policy::{FreshnessPolicy, FreshnessWindow};
pub use service::RevocationCache;
pub use store::{MemoryRevocationStore, RevocationStore, StoreError};

/// Metric names recorded by the lookup path.
pub mod metric_names {
    pub use super::service::{
        METRIC_FETCH_FAILED_TOTAL, METRIC_FETCH_MS, METRIC_FETCH_TOTAL, METRIC_HIT_TOTAL,
        METRIC_MISS_TOTAL, METRIC_STALE_TOTAL,
    };
}
