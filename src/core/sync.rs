//! Synchronization utilities for robust lock handling
//!
//! Queue and subscriber state is only ever mutated through short,
//! non-panicking critical sections, so the data behind a poisoned lock is
//! still consistent. These helpers recover the guard instead of propagating
//! the poison, which keeps delivery paths infallible.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Lock a mutex, recovering the guard if a previous holder panicked
pub fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("Recovered poisoned mutex; a panic occurred while it was held");
        PoisonError::into_inner(poisoned)
    })
}

/// Acquire an RwLock for reading, recovering from poisoning
pub fn read_or_recover<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        log::warn!("Recovered poisoned RwLock (read)");
        PoisonError::into_inner(poisoned)
    })
}

/// Acquire an RwLock for writing, recovering from poisoning
pub fn write_or_recover<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        log::warn!("Recovered poisoned RwLock (write)");
        PoisonError::into_inner(poisoned)
    })
}
