//! Usage: Poison-tolerant locking for the broker's in-memory state.
//!
//! A request task that panics while holding a cache or RNG lock must not
//! take every later request down with it. The data under these locks is
//! disposable (cache entries, an RNG), so the lock is reclaimed and the
//! incident logged instead of propagating the poison.

use std::sync::{Mutex, MutexGuard};

#[track_caller]
pub(crate) fn recover_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    let caller = std::panic::Location::caller();
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!(
            caller = %caller,
            lock = std::any::type_name::<T>(),
            "reclaiming a poisoned lock; a task panicked while holding it"
        );
        poisoned.into_inner()
    })
}
