//! Thread-shared store handle.
//!
//! [`SharedStore`] wraps a [`Store`] in `Arc<Mutex<_>>`. Guards unlock on
//! drop. A lock poisoned by a panicking holder is recovered and logged.

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use tracing::warn;

use crate::store::Store;

/// Cloneable, lockable handle to a [`Store`].
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<Store>>,
}

impl SharedStore {
    /// Share `store`.
    pub fn new(store: Store) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Block until the store is available.
    pub fn lock(&self) -> MutexGuard<'_, Store> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("recovered poisoned store lock");
            poisoned.into_inner()
        })
    }

    /// Lock the store if no one else holds it.
    ///
    /// Returns `None` on contention. Useful for detecting reentrant access
    /// from code that already holds the guard.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, Store>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => {
                warn!("recovered poisoned store lock");
                Some(poisoned.into_inner())
            }
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Number of handles sharing the store.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new(Store::new())
    }
}

impl From<Store> for SharedStore {
    fn from(store: Store) -> Self {
        Self::new(store)
    }
}
