//! Revocation cache orchestrator.
//!
//! Lookup path:
//!
//! 1. Derive the subject key from the certificate/issuer pair.
//! 2. Serve a stored answer while the freshness policy accepts it (CACHED).
//! 3. Otherwise lead the key's fetch: re-check the store, then ask the remote
//!    fetcher, persist its answer and serve it (EXTERNAL).
//! 4. Callers arriving while a fetch is running wait for it and receive its
//!    outcome (CACHED, or no answer) without fetching again.
//! 5. A failed or timed-out fetch ends the lookup with no answer. Stale
//!    entries are never served.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tracing::{debug, info, instrument, warn};

use crate::domain::certificate::CertificateToken;
use crate::domain::revocation::{RevocationAnswer, SubjectKey, TaggedAnswer};

use super::clock::{Clock, SystemClock};
use super::config::CacheConfig;
use super::error::CacheError;
use super::events::{CacheEvent, CacheEvents, EventKind};
use super::fetcher::{FetchError, RemoteFetcher};
use super::inflight::{Flight, InFlightFetches};
use super::keys::derive_subject_key;
use super::lock::{rw_read, rw_write};
use super::policy::FreshnessPolicy;
use super::store::RevocationStore;

const SOURCE: &str = "cache::service";

pub const METRIC_HIT_TOTAL: &str = "revocation_cache_hit_total";
pub const METRIC_MISS_TOTAL: &str = "revocation_cache_miss_total";
pub const METRIC_STALE_TOTAL: &str = "revocation_cache_stale_total";
pub const METRIC_FETCH_TOTAL: &str = "revocation_cache_fetch_total";
pub const METRIC_FETCH_FAILED_TOTAL: &str = "revocation_cache_fetch_failed_total";
pub const METRIC_FETCH_MS: &str = "revocation_cache_fetch_ms";

enum Probe {
    Fresh(RevocationAnswer),
    Stale,
    Absent,
}

/// What a fetch lead produced, handed to every follower on the same key.
#[derive(Clone)]
enum FetchOutcome {
    /// A concurrent lookup refreshed the entry before the lead fetched.
    AlreadyFresh(RevocationAnswer),
    Refreshed(RevocationAnswer),
    /// Failed or timed-out fetch, or no fetcher configured.
    Unavailable,
    Failed(CacheError),
}

/// Public entry point for revocation lookups.
///
/// Configuration setters apply to the next lookup and never rewrite stored
/// entries.
pub struct RevocationCache {
    store: Arc<dyn RevocationStore>,
    fetcher: RwLock<Option<Arc<dyn RemoteFetcher>>>,
    clock: Arc<dyn Clock>,
    policy: FreshnessPolicy,
    fetch_timeout_ms: AtomicU64,
    inflight: InFlightFetches<FetchOutcome>,
    events: CacheEvents,
}

impl RevocationCache {
    pub fn new(store: Arc<dyn RevocationStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            fetcher: RwLock::new(None),
            clock: Arc::new(SystemClock),
            policy: FreshnessPolicy::new(
                config.default_next_update_delay(),
                config.max_next_update_delay(),
            ),
            fetch_timeout_ms: AtomicU64::new(duration_millis(config.fetch_timeout())),
            inflight: InFlightFetches::new(),
            events: CacheEvents::with_capacity(config.event_capacity),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_fetcher(self, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        self.set_remote_fetcher(Some(fetcher));
        self
    }

    // ========================================================================
    // Configuration surface
    // ========================================================================

    pub fn set_default_next_update_delay(&self, delay: Option<Duration>) {
        self.policy.set_default_delay(delay);
    }

    pub fn set_max_next_update_delay(&self, delay: Option<Duration>) {
        self.policy.set_max_delay(delay);
    }

    pub fn set_remote_fetcher(&self, fetcher: Option<Arc<dyn RemoteFetcher>>) {
        *rw_write(&self.fetcher, SOURCE, "set_remote_fetcher") = fetcher;
    }

    pub fn set_fetch_timeout(&self, timeout: Duration) {
        self.fetch_timeout_ms
            .store(duration_millis(timeout), Ordering::Release);
    }

    pub fn default_next_update_delay(&self) -> Option<Duration> {
        self.policy.default_delay()
    }

    pub fn max_next_update_delay(&self) -> Option<Duration> {
        self.policy.max_delay()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms.load(Ordering::Acquire))
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Administrative operations
    // ========================================================================

    pub async fn is_provisioned(&self) -> Result<bool, CacheError> {
        Ok(self.store.exists().await?)
    }

    /// Create the backing table. Fails if it already exists.
    pub async fn provision(&self) -> Result<(), CacheError> {
        self.store.init().await?;
        info!("Revocation cache provisioned");
        self.events.publish(EventKind::Provisioned);
        Ok(())
    }

    /// Drop the backing table and every cached answer. Fails if it is absent.
    pub async fn deprovision(&self) -> Result<(), CacheError> {
        self.store.destroy().await?;
        info!("Revocation cache deprovisioned");
        self.events.publish(EventKind::Deprovisioned);
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Current revocation answer for `certificate` as issued by `issuer`.
    ///
    /// `Ok(None)` means no evidence is obtainable right now: nothing usable is
    /// cached and the remote authority gave no answer. Whether that is fatal
    /// is the caller's decision.
    #[instrument(
        skip_all,
        fields(serial = %certificate.serial_hex(), key = tracing::field::Empty)
    )]
    pub async fn get_revocation_answer(
        &self,
        certificate: &CertificateToken,
        issuer: &CertificateToken,
    ) -> Result<Option<TaggedAnswer>, CacheError> {
        certificate.validate_as_subject()?;
        issuer.validate_as_issuer()?;

        let key = derive_subject_key(certificate, issuer);
        tracing::Span::current().record("key", key.as_str());

        match self.probe(&key).await? {
            Probe::Fresh(answer) => {
                self.record_hit(&key, false);
                return Ok(served(TaggedAnswer::cached(answer)));
            }
            Probe::Stale => {
                counter!(METRIC_STALE_TOTAL).increment(1);
                debug!("Stored revocation answer is stale");
                self.events.publish(EventKind::Stale { key: key.clone() });
            }
            Probe::Absent => {
                counter!(METRIC_MISS_TOTAL).increment(1);
                debug!("No stored revocation answer");
                self.events.publish(EventKind::Miss { key: key.clone() });
            }
        }

        loop {
            match self.inflight.join(&key) {
                Flight::Lead(lead) => {
                    let outcome = self
                        .lead_refresh(&key, certificate, issuer)
                        .await
                        .unwrap_or_else(FetchOutcome::Failed);
                    lead.complete(outcome.clone());
                    return self.serve(&key, outcome, true);
                }
                Flight::Follow(wait) => match wait.outcome().await {
                    Some(outcome) => return self.serve(&key, outcome, false),
                    // The lead was cancelled mid-fetch; take over.
                    None => continue,
                },
            }
        }
    }

    async fn probe(&self, key: &SubjectKey) -> Result<Probe, CacheError> {
        let Some(answer) = self.store.find(key).await? else {
            return Ok(Probe::Absent);
        };

        if self.policy.is_stale(&answer, self.clock.now()) {
            Ok(Probe::Stale)
        } else {
            Ok(Probe::Fresh(answer))
        }
    }

    fn serve(
        &self,
        key: &SubjectKey,
        outcome: FetchOutcome,
        led: bool,
    ) -> Result<Option<TaggedAnswer>, CacheError> {
        let tagged = match outcome {
            FetchOutcome::Refreshed(answer) if led => TaggedAnswer::external(answer),
            FetchOutcome::Refreshed(answer) | FetchOutcome::AlreadyFresh(answer) => {
                self.record_hit(key, true);
                TaggedAnswer::cached(answer)
            }
            FetchOutcome::Unavailable => return Ok(None),
            FetchOutcome::Failed(err) => return Err(err),
        };
        Ok(served(tagged))
    }

    fn record_hit(&self, key: &SubjectKey, coalesced: bool) {
        counter!(METRIC_HIT_TOTAL).increment(1);
        let kind = if coalesced {
            debug!("Revocation answer refreshed by a concurrent lookup");
            EventKind::Coalesced { key: key.clone() }
        } else {
            EventKind::Hit { key: key.clone() }
        };
        self.events.publish(kind);
    }

    async fn lead_refresh(
        &self,
        key: &SubjectKey,
        certificate: &CertificateToken,
        issuer: &CertificateToken,
    ) -> Result<FetchOutcome, CacheError> {
        // Another lookup may have refreshed the entry since the first probe.
        if let Probe::Fresh(answer) = self.probe(key).await? {
            return Ok(FetchOutcome::AlreadyFresh(answer));
        }

        let configured = rw_read(&self.fetcher, SOURCE, "refresh").clone();
        let Some(fetcher) = configured else {
            debug!("No remote fetcher configured");
            self.events.publish(EventKind::NoFetcher { key: key.clone() });
            return Ok(FetchOutcome::Unavailable);
        };

        let timeout = self.fetch_timeout();
        counter!(METRIC_FETCH_TOTAL).increment(1);
        let started_at = Instant::now();

        let fetched = tokio::time::timeout(timeout, fetcher.fetch(certificate, issuer, timeout))
            .await
            .unwrap_or(Err(FetchError::TimedOut(timeout)));

        histogram!(METRIC_FETCH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        match fetched {
            Ok(evidence) => {
                let answer = RevocationAnswer::new(key.clone(), evidence);
                self.store.upsert(key, &answer).await?;

                info!(
                    status = answer.status().label(),
                    kind = answer.evidence.kind.as_str(),
                    "Revocation answer fetched and cached"
                );
                self.events.publish(EventKind::Refreshed { key: key.clone() });
                Ok(FetchOutcome::Refreshed(answer))
            }
            Err(err) => {
                counter!(METRIC_FETCH_FAILED_TOTAL).increment(1);
                warn!(error = %err, "Remote revocation fetch failed");
                self.events.publish(EventKind::FetchFailed {
                    key: key.clone(),
                    reason: err.to_string(),
                });
                Ok(FetchOutcome::Unavailable)
            }
        }
    }
}

fn served(tagged: TaggedAnswer) -> Option<TaggedAnswer> {
    debug!(
        origin = tagged.origin.as_str(),
        status = tagged.answer.status().label(),
        "Serving revocation answer"
    );
    Some(tagged)
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}
