//! Shared-ownership handles.
//!
//! [`Ref`] pairs a [`Handle`] with a heap-allocated atomic counter so that
//! several holders can track whether a record is still in use. Cloning a
//! `Ref` shares the counter; dropping the last clone frees it. The counter
//! lives in an `Arc`, whose release-decrement / acquire-fence drop gives the
//! final holder a view of every write made through earlier clones.
//!
//! Only the counter is thread-safe. The pool the handle points into is not.
//!
//! # One lineage per `Ref`
//!
//! Two `Ref`s built independently with [`Ref::new`] from the same raw handle
//! get unrelated counters, and each believes it is the last holder. This is
//! unsupported: build a `Ref` once, through
//! [`SlabPool::create_ref`](crate::SlabPool::create_ref), and clone it.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use loam_core::Handle;

/// Reference-counted record handle.
#[must_use]
pub struct Ref<T> {
    handle: Handle<T>,
    counter: Option<Arc<()>>,
}

impl<T> Ref<T> {
    /// Start a new ownership lineage for `handle` with a count of 1.
    ///
    /// A null handle yields a null `Ref` with no counter.
    pub fn new(handle: Handle<T>) -> Self {
        let counter = if handle.is_null() {
            None
        } else {
            Some(Arc::new(()))
        };
        Self { handle, counter }
    }

    /// A `Ref` to no record.
    pub fn null() -> Self {
        Self {
            handle: Handle::NULL,
            counter: None,
        }
    }

    /// The wrapped handle.
    pub fn handle(&self) -> Handle<T> {
        self.handle
    }

    /// Whether this `Ref` wraps the null handle.
    pub fn is_null(&self) -> bool {
        self.handle.is_null()
    }

    /// Number of live clones in this lineage; 0 for a null `Ref`.
    pub fn ref_count(&self) -> usize {
        self.counter.as_ref().map_or(0, Arc::strong_count)
    }

    /// Whether this is the only live clone.
    pub fn is_last_ref(&self) -> bool {
        self.ref_count() == 1
    }

    /// Consume this clone, returning the handle if it was the last one.
    ///
    /// The check and the release are a single atomic step, so when clones
    /// are dropped concurrently exactly one caller receives the handle.
    pub fn into_last_handle(self) -> Option<Handle<T>> {
        let counter = self.counter?;
        Arc::into_inner(counter).map(|()| self.handle)
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle,
            counter: self.counter.clone(),
        }
    }
}

impl<T> Default for Ref<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> From<&Ref<T>> for Handle<T> {
    fn from(r: &Ref<T>) -> Self {
        r.handle
    }
}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<T> Eq for Ref<T> {}

impl<T> PartialOrd for Ref<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Ref<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.handle.cmp(&other.handle)
    }
}

impl<T> Hash for Ref<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("handle", &self.handle)
            .field("count", &self.ref_count())
            .finish()
    }
}
