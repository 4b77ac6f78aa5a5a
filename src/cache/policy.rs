//! Freshness policy for stored revocation answers.
//!
//! The policy is evaluated on every read against the delays in effect at that
//! moment, so tightening a delay applies to entries cached before the change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use time::OffsetDateTime;

use crate::domain::revocation::RevocationAnswer;

const UNSET: u64 = u64::MAX;

/// Process-wide freshness delays, readable without locking.
#[derive(Debug)]
pub struct FreshnessPolicy {
    default_delay_ms: AtomicU64,
    max_delay_ms: AtomicU64,
}

/// Delays captured by a single read of the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessWindow {
    /// Lifetime granted to answers without `next_update`.
    pub default_delay: Option<Duration>,
    /// Ceiling on any answer's lifetime, measured from `this_update`.
    pub max_delay: Option<Duration>,
}

impl FreshnessPolicy {
    pub fn new(default_delay: Option<Duration>, max_delay: Option<Duration>) -> Self {
        Self {
            default_delay_ms: AtomicU64::new(encode(default_delay)),
            max_delay_ms: AtomicU64::new(encode(max_delay)),
        }
    }

    pub fn default_delay(&self) -> Option<Duration> {
        decode(self.default_delay_ms.load(Ordering::Acquire))
    }

    pub fn max_delay(&self) -> Option<Duration> {
        decode(self.max_delay_ms.load(Ordering::Acquire))
    }

    pub fn set_default_delay(&self, delay: Option<Duration>) {
        self.default_delay_ms.store(encode(delay), Ordering::Release);
    }

    pub fn set_max_delay(&self, delay: Option<Duration>) {
        self.max_delay_ms.store(encode(delay), Ordering::Release);
    }

    pub fn window(&self) -> FreshnessWindow {
        FreshnessWindow {
            default_delay: self.default_delay(),
            max_delay: self.max_delay(),
        }
    }

    pub fn is_stale(&self, answer: &RevocationAnswer, now: OffsetDateTime) -> bool {
        self.window().is_stale(answer, now)
    }
}

impl FreshnessWindow {
    /// Instant after which the answer must be refreshed.
    ///
    /// `None` when the answer has no `next_update` and no default delay is
    /// configured: nothing bounds its lifetime, so it is never trusted.
    pub fn effective_expiry(&self, answer: &RevocationAnswer) -> Option<OffsetDateTime> {
        let this_update = answer.this_update();
        let expiry = answer
            .next_update()
            .or_else(|| self.default_delay.map(|delay| offset(this_update, delay)))?;

        Some(match self.max_delay {
            Some(max_delay) => expiry.min(offset(this_update, max_delay)),
            None => expiry,
        })
    }

    pub fn is_stale(&self, answer: &RevocationAnswer, now: OffsetDateTime) -> bool {
        match self.effective_expiry(answer) {
            Some(expiry) => now > expiry,
            None => true,
        }
    }
}

fn offset(from: OffsetDateTime, by: Duration) -> OffsetDateTime {
    let by = time::Duration::try_from(by).unwrap_or(time::Duration::MAX);
    from.saturating_add(by)
}

fn encode(delay: Option<Duration>) -> u64 {
    match delay {
        Some(delay) => u64::try_from(delay.as_millis())
            .unwrap_or(UNSET - 1)
            .min(UNSET - 1),
        None => UNSET,
    }
}

fn decode(value: u64) -> Option<Duration> {
    (value != UNSET).then(|| Duration::from_millis(value))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::domain::revocation::{
        RevocationEvidence, RevocationKind, RevocationStatus, SubjectKey,
    };

    use super::*;

    const THIS_UPDATE: OffsetDateTime = datetime!(2024-05-01 10:00 UTC);

    fn answer(next_update: Option<OffsetDateTime>) -> RevocationAnswer {
        RevocationAnswer::new(
            SubjectKey::from_stored("k"),
            RevocationEvidence {
                kind: RevocationKind::Ocsp,
                status: RevocationStatus::Good,
                this_update: THIS_UPDATE,
                next_update,
                produced_at: THIS_UPDATE,
                source_url: None,
                encoded: vec![0x30],
            },
        )
    }

    fn secs(value: u64) -> Option<Duration> {
        Some(Duration::from_secs(value))
    }

    #[test]
    fn next_update_bounds_freshness() {
        let policy = FreshnessPolicy::new(secs(60), None);
        let answer = answer(Some(datetime!(2024-05-01 11:00 UTC)));

        assert!(!policy.is_stale(&answer, datetime!(2024-05-01 10:59 UTC)));
        assert!(policy.is_stale(&answer, datetime!(2024-05-01 11:00:01 UTC)));
    }

    #[test]
    fn expiry_instant_itself_is_still_fresh() {
        let policy = FreshnessPolicy::new(None, None);
        let answer = answer(Some(datetime!(2024-05-01 11:00 UTC)));
        assert!(!policy.is_stale(&answer, datetime!(2024-05-01 11:00 UTC)));
    }

    #[test]
    fn default_delay_applies_without_next_update() {
        let policy = FreshnessPolicy::new(secs(180), None);
        let answer = answer(None);

        assert_eq!(
            policy.window().effective_expiry(&answer),
            Some(datetime!(2024-05-01 10:03 UTC))
        );
        assert!(!policy.is_stale(&answer, datetime!(2024-05-01 10:02 UTC)));
        assert!(policy.is_stale(&answer, datetime!(2024-05-01 10:04 UTC)));
    }

    #[test]
    fn max_delay_caps_long_next_update() {
        let policy = FreshnessPolicy::new(secs(180), secs(1));
        let answer = answer(Some(datetime!(2024-05-08 10:00 UTC)));

        assert_eq!(
            policy.window().effective_expiry(&answer),
            Some(datetime!(2024-05-01 10:00:01 UTC))
        );
        assert!(policy.is_stale(&answer, datetime!(2024-05-01 10:00:02 UTC)));
    }

    #[test]
    fn max_delay_above_next_update_changes_nothing() {
        let policy = FreshnessPolicy::new(None, secs(86_400));
        let answer = answer(Some(datetime!(2024-05-01 12:00 UTC)));
        assert_eq!(
            policy.window().effective_expiry(&answer),
            Some(datetime!(2024-05-01 12:00 UTC))
        );
    }

    #[test]
    fn no_hint_and_no_default_is_always_stale() {
        let policy = FreshnessPolicy::new(None, secs(3600));
        let answer = answer(None);

        assert_eq!(policy.window().effective_expiry(&answer), None);
        assert!(policy.is_stale(&answer, THIS_UPDATE));
    }

    #[test]
    fn tightened_ceiling_applies_to_existing_answers() {
        let policy = FreshnessPolicy::new(secs(180), None);
        let answer = answer(Some(datetime!(2024-05-02 10:00 UTC)));
        let now = datetime!(2024-05-01 10:00:05 UTC);

        assert!(!policy.is_stale(&answer, now));
        policy.set_max_delay(secs(1));
        assert!(policy.is_stale(&answer, now));
        policy.set_max_delay(None);
        assert!(!policy.is_stale(&answer, now));
    }

    #[test]
    fn setters_roundtrip_and_saturate() {
        let policy = FreshnessPolicy::new(None, None);
        assert_eq!(policy.default_delay(), None);

        policy.set_default_delay(Some(Duration::from_millis(250)));
        assert_eq!(policy.default_delay(), Some(Duration::from_millis(250)));

        policy.set_max_delay(Some(Duration::MAX));
        assert!(policy.max_delay().is_some());

        let far = answer(Some(datetime!(9999-12-31 23:59 UTC)));
        assert!(!policy.is_stale(&far, THIS_UPDATE));
    }
}
