use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// User code never runs while one of the scheduler's locks is poisoned in a
/// way that leaves its data half-written, so the inner value is still valid.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Non-blocking [`lock`]. `None` only when another thread holds the mutex.
pub(crate) fn try_lock<T>(mutex: &Mutex<T>) -> Option<MutexGuard<'_, T>> {
    match mutex.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}
