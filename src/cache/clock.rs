//! Time source used by the freshness policy.

use std::sync::Mutex;
use std::time::Duration;

use time::OffsetDateTime;

use super::lock::mutex_lock;

const SOURCE: &str = "cache::clock";

/// Supplies "now" to the cache.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock in UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to.
///
/// Lets tests step past freshness windows without sleeping.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = mutex_lock(&self.now, SOURCE, "advance");
        *now += by;
    }

    pub fn set(&self, to: OffsetDateTime) {
        *mutex_lock(&self.now, SOURCE, "set") = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *mutex_lock(&self.now, SOURCE, "now")
    }
}
