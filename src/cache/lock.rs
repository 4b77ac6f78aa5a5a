//! Poison-tolerant guards for the std locks shared across lookups.
//!
//! A panic in one caller must not wedge every later lookup, so a poisoned lock
//! is logged and its inner state reused.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn recover<G>(
    poisoned: PoisonError<G>,
    source: &'static str,
    op: &'static str,
    lock_kind: &'static str,
) -> G {
    warn!(
        op,
        source_module = source,
        lock_kind,
        result = "poisoned_recovered",
        "Recovered from poisoned revocation cache lock"
    );
    poisoned.into_inner()
}

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read()
        .unwrap_or_else(|poisoned| recover(poisoned, source, op, "rwlock.read"))
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write()
        .unwrap_or_else(|poisoned| recover(poisoned, source, op, "rwlock.write"))
}

pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    source: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    lock.lock()
        .unwrap_or_else(|poisoned| recover(poisoned, source, op, "mutex.lock"))
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn poisoned_rwlock_is_recovered() {
        let lock = RwLock::new(1_u32);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = lock.write().expect("lock should be acquired");
            panic!("poison rwlock");
        }));

        *rw_write(&lock, "test", "write") += 1;
        assert_eq!(*rw_read(&lock, "test", "read"), 2);
    }

    #[test]
    fn poisoned_mutex_is_recovered() {
        let lock = Mutex::new(Vec::<u8>::new());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = lock.lock().expect("lock should be acquired");
            panic!("poison mutex");
        }));

        mutex_lock(&lock, "test", "push").push(7);
        assert_eq!(mutex_lock(&lock, "test", "len").len(), 1);
    }
}
