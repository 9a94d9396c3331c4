//! Version-stamped transient views.
//!
//! A [`View`] is what [`SlabPool::get`](crate::SlabPool::get) hands out. It
//! names a slot and, in debug builds, remembers the epoch and version of the
//! pool that issued it. Dereferencing goes back through the pool
//! ([`SlabPool::read`](crate::SlabPool::read) /
//! [`SlabPool::write`](crate::SlabPool::write)), which rejects the view with
//! [`PoolError::StaleView`](crate::PoolError::StaleView) if any structural
//! mutation happened in between, or with
//! [`PoolError::ForeignView`](crate::PoolError::ForeignView) if it comes
//! from another pool or from before a clear. Release builds skip both checks.

use std::fmt;

use loam_core::{Handle, PoolEpoch};

/// Short-lived accessor for one pool slot.
///
/// Use views in place. Holding one across `create` (when it grows the
/// block), `destroy`, or `clear` makes it stale. A view only reads through
/// the pool that issued it.
#[must_use]
pub struct View<T> {
    handle: Handle<T>,
    #[cfg(debug_assertions)]
    epoch: PoolEpoch,
    #[cfg(debug_assertions)]
    version: u64,
}

impl<T> View<T> {
    pub(crate) fn new(
        handle: Handle<T>,
        #[cfg_attr(not(debug_assertions), allow(unused_variables))] epoch: PoolEpoch,
        #[cfg_attr(not(debug_assertions), allow(unused_variables))] version: u64,
    ) -> Self {
        Self {
            handle,
            #[cfg(debug_assertions)]
            epoch,
            #[cfg(debug_assertions)]
            version,
        }
    }

    /// The slot this view refers to.
    pub fn handle(&self) -> Handle<T> {
        self.handle
    }

    /// Epoch of the issuing pool.
    #[cfg(debug_assertions)]
    pub fn epoch(&self) -> PoolEpoch {
        self.epoch
    }

    /// Pool version captured at issue time.
    #[cfg(debug_assertions)]
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl<T> Clone for View<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for View<T> {}

impl<T> fmt::Debug for View<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("View");
        s.field("handle", &self.handle);
        #[cfg(debug_assertions)]
        {
            s.field("epoch", &self.epoch);
            s.field("version", &self.version);
        }
        s.finish()
    }
}
