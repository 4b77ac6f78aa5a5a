//! Cache engine configuration.
//!
//! Defaults:
//!
//! | setting                            | default        |
//! |------------------------------------|----------------|
//! | `default_next_update_delay_secs`   | 300 (5 min)    |
//! | `max_next_update_delay_secs`       | unset          |
//! | `fetch_timeout_ms`                 | 10000          |
//! | `event_capacity`                   | 256            |

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_NEXT_UPDATE_DELAY_SECS: u64 = 300;
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of answers that carry no `next_update`. Unset: such answers
    /// are refreshed on every lookup.
    pub default_next_update_delay_secs: Option<u64>,
    /// Ceiling on any answer's lifetime from `this_update`. Unset: no ceiling.
    pub max_next_update_delay_secs: Option<u64>,
    /// Budget for a single remote fetch.
    pub fetch_timeout_ms: u64,
    /// Buffered events per subscriber before it starts lagging.
    pub event_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_next_update_delay_secs: Some(DEFAULT_NEXT_UPDATE_DELAY_SECS),
            max_next_update_delay_secs: None,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn default_next_update_delay(&self) -> Option<Duration> {
        self.default_next_update_delay_secs.map(Duration::from_secs)
    }

    pub fn max_next_update_delay(&self) -> Option<Duration> {
        self.max_next_update_delay_secs.map(Duration::from_secs)
    }

    /// Fetch budget, clamped to at least one millisecond.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms.max(1))
    }
}
