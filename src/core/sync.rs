//! Synchronization utilities for robust mutex handling
//!
//! This module provides utilities for handling mutex poisoning and other
//! synchronization concerns in a consistent manner across the codebase.

use std::sync::{LockResult, RwLockReadGuard, RwLockWriteGuard};

/// Handle poisoned mutex cases with consistent error handling
///
/// Converts mutex poison errors into application-specific errors using a
/// provided error constructor. A poisoned lock means a panic occurred while
/// the lock was held; callers get a regular error instead of a panic.
///
/// # Arguments
/// * `result` - The result from a mutex lock operation
/// * `error_constructor` - Function to create the appropriate error type
///
/// # Returns
/// The mutex guard on success, or an application error on poison/failure
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (mutex poisoned). This indicates a panic occurred while holding a lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Handle poisoned RwLock read operations with consistent error handling
///
/// Similar to [`handle_mutex_poison`] but specifically for RwLock read
/// operations. RwLocks become poisoned when a writer panics while holding
/// the lock.
pub fn handle_rwlock_read<T, E>(
    result: LockResult<RwLockReadGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock read poisoned). This indicates a panic occurred while holding a write lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Handle poisoned RwLock write operations with consistent error handling
pub fn handle_rwlock_write<T, E>(
    result: LockResult<RwLockWriteGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock write poisoned). This indicates a panic occurred while holding the lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, RwLock};

    #[test]
    fn test_handle_mutex_poison_ok() {
        let mutex = Mutex::new(42);
        let guard = handle_mutex_poison(mutex.lock(), |msg| msg).unwrap();
        assert_eq!(*guard, 42);
    }

    #[test]
    fn test_handle_mutex_poison_converts_error() {
        let mutex = std::sync::Arc::new(Mutex::new(0));
        let clone = mutex.clone();
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        let result = handle_mutex_poison(mutex.lock(), |msg| msg);
        let err = result.err().expect("lock should be poisoned");
        assert!(err.contains("mutex poisoned"));
    }

    #[test]
    fn test_handle_rwlock_read_ok() {
        let lock = RwLock::new("value");
        let guard = handle_rwlock_read(lock.read(), |msg| msg).unwrap();
        assert_eq!(*guard, "value");
    }

    #[test]
    fn test_handle_rwlock_write_ok() {
        let lock = RwLock::new(1);
        let mut guard = handle_rwlock_write(lock.write(), |msg| msg).unwrap();
        *guard += 1;
        drop(guard);
        assert_eq!(*lock.read().unwrap(), 2);
    }
}
