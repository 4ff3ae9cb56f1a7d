//! Poison-tolerant guard acquisition.
//!
//! A panicked writer leaves the cache and dataset tables at worst one
//! update behind, never structurally broken, so the poison flag is logged
//! and the guard taken anyway.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn note_poisoned(what: &'static str, kind: &'static str) {
    warn!(
        target: "ecodash::sync",
        what,
        kind,
        "lock poisoned by a panicked thread; continuing with current data"
    );
}

pub(crate) fn read_guard<'a, T>(lock: &'a RwLock<T>, what: &'static str) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        note_poisoned(what, "rwlock.read");
        poisoned.into_inner()
    })
}

pub(crate) fn write_guard<'a, T>(
    lock: &'a RwLock<T>,
    what: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        note_poisoned(what, "rwlock.write");
        poisoned.into_inner()
    })
}

pub(crate) fn lock_guard<'a, T>(lock: &'a Mutex<T>, what: &'static str) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        note_poisoned(what, "mutex");
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, RwLock};

    use super::*;

    #[test]
    fn poisoned_rwlock_still_hands_out_guards() {
        let lock = RwLock::new(3u32);
        let result = std::panic::catch_unwind(|| {
            let _guard = lock.write().unwrap();
            panic!("poison it");
        });
        assert!(result.is_err());

        assert_eq!(*read_guard(&lock, "test"), 3);
        *write_guard(&lock, "test") = 4;
        assert_eq!(*read_guard(&lock, "test"), 4);
    }

    #[test]
    fn poisoned_mutex_still_hands_out_guards() {
        let lock = Mutex::new(1u32);
        let result = std::panic::catch_unwind(|| {
            let _guard = lock.lock().unwrap();
            panic!("poison it");
        });
        assert!(result.is_err());

        *lock_guard(&lock, "test") = 2;
        assert_eq!(*lock_guard(&lock, "test"), 2);
    }
}
