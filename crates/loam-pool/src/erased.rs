//! Type-erased pool interface.
//!
//! The store keeps one pool per record type in a single collection and
//! drives them uniformly during reclaim and dispose. [`ErasedPool`] is the
//! object-safe subset of [`SlabPool`] it needs, addressed with
//! [`RawHandle`]s. Typed access goes back through `downcast_ref` and
//! `downcast_mut` on `dyn ErasedPool`.

use std::any::{Any, TypeId};

use loam_core::{RawHandle, Record};

use crate::error::PoolError;
use crate::pool::SlabPool;
use crate::stats::{DisposeReport, PoolStats};

/// Object-safe view of a [`SlabPool`] with its record type erased.
pub trait ErasedPool: Any + Send {
    /// Name of the stored record type.
    fn record_name(&self) -> &'static str;

    /// `TypeId` of the stored record type.
    fn record_type(&self) -> TypeId;

    /// Mark the record at `handle` for destruction.
    fn destroy_raw(&mut self, handle: RawHandle) -> Result<(), PoolError>;

    /// Whether `handle` names a live record.
    fn contains_raw(&self, handle: RawHandle) -> bool;

    /// Claim the live record at `handle` for a single holder.
    fn claim_raw(&mut self, handle: RawHandle) -> Result<(), PoolError>;

    /// Drop the claim on the record at `handle`.
    fn unclaim_raw(&mut self, handle: RawHandle) -> Result<bool, PoolError>;

    /// Whether the record at `handle` is claimed.
    fn is_claimed_raw(&self, handle: RawHandle) -> bool;

    /// Store a copy of the record at `handle`.
    ///
    /// Returns `Ok(None)` when the record type does not support duplication.
    fn duplicate_raw(&mut self, handle: RawHandle) -> Result<Option<RawHandle>, PoolError>;

    /// Overwrite the record at `destination` with the one at `source`.
    ///
    /// Returns `Ok(false)` when the record type does not support copying.
    fn copy_raw(&mut self, source: RawHandle, destination: RawHandle) -> Result<bool, PoolError>;

    /// Run one dispose pass.
    fn dispose(&mut self) -> DisposeReport;

    /// Drop every record, finalizing them if the type has a finalizer.
    fn reset(&mut self);

    /// Bookkeeping snapshot.
    fn stats(&self) -> PoolStats;
}

impl<T: Record> ErasedPool for SlabPool<T> {
    fn record_name(&self) -> &'static str {
        T::type_name()
    }

    fn record_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn destroy_raw(&mut self, handle: RawHandle) -> Result<(), PoolError> {
        self.destroy(handle.cast())
    }

    fn contains_raw(&self, handle: RawHandle) -> bool {
        self.is_live(handle.cast())
    }

    fn claim_raw(&mut self, handle: RawHandle) -> Result<(), PoolError> {
        self.claim(handle.cast())
    }

    fn unclaim_raw(&mut self, handle: RawHandle) -> Result<bool, PoolError> {
        self.unclaim(handle.cast())
    }

    fn is_claimed_raw(&self, handle: RawHandle) -> bool {
        self.is_claimed(handle.cast())
    }

    fn duplicate_raw(&mut self, handle: RawHandle) -> Result<Option<RawHandle>, PoolError> {
        let Some(copy) = self.item(handle.cast())?.duplicate() else {
            return Ok(None);
        };
        Ok(Some(self.create(copy).erase()))
    }

    fn copy_raw(&mut self, source: RawHandle, destination: RawHandle) -> Result<bool, PoolError> {
        self.copy_record(source.cast(), destination.cast())
    }

    fn dispose(&mut self) -> DisposeReport {
        SlabPool::dispose(self)
    }

    fn reset(&mut self) {
        self.reset_storage(T::FINALIZES);
    }

    fn stats(&self) -> PoolStats {
        SlabPool::stats(self)
    }
}

impl dyn ErasedPool {
    /// Recover the concrete pool, if it stores `T`.
    pub fn downcast_ref<T: Record>(&self) -> Option<&SlabPool<T>> {
        (self as &dyn Any).downcast_ref::<SlabPool<T>>()
    }

    /// Recover the concrete pool mutably, if it stores `T`.
    pub fn downcast_mut<T: Record>(&mut self) -> Option<&mut SlabPool<T>> {
        (self as &mut dyn Any).downcast_mut::<SlabPool<T>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_core::Handle;
    use loam_test_utils::{Counted, Pinned, Plain};

    fn boxed<T: Record>() -> Box<dyn ErasedPool> {
        Box::new(SlabPool::<T>::new())
    }

    #[test]
    fn downcast_recovers_concrete_pool() {
        let mut pool = boxed::<Plain>();
        let h = pool
            .downcast_mut::<Plain>()
            .unwrap()
            .create(Plain::new(3));
        assert!(pool.downcast_ref::<Counted>().is_none());
        assert_eq!(pool.downcast_ref::<Plain>().unwrap().item(h).unwrap().value, 3);
        assert_eq!(pool.record_name(), "Plain");
        assert_eq!(pool.record_type(), TypeId::of::<Plain>());
    }

    #[test]
    fn raw_destroy_and_dispose() {
        let mut pool = boxed::<Counted>();
        let h = pool
            .downcast_mut::<Counted>()
            .unwrap()
            .create(Counted::new(1))
            .erase();
        assert!(pool.contains_raw(h));
        pool.destroy_raw(h).unwrap();
        assert!(!pool.contains_raw(h));
        assert_eq!(pool.dispose().finalized, 1);
        assert!(pool.destroy_raw(h).is_err());
        assert!(pool.destroy_raw(Handle::NULL).is_ok());
    }

    #[test]
    fn raw_claim_blocks_destroy() {
        let mut pool = boxed::<Plain>();
        let h = pool
            .downcast_mut::<Plain>()
            .unwrap()
            .create(Plain::new(2))
            .erase();
        pool.claim_raw(h).unwrap();
        assert!(pool.is_claimed_raw(h));
        assert_eq!(pool.destroy_raw(h), Err(PoolError::Claimed { handle: 1 }));
        assert_eq!(pool.unclaim_raw(h), Ok(true));
        pool.destroy_raw(h).unwrap();
        assert!(!pool.is_claimed_raw(h));
    }

    #[test]
    fn duplicate_copies_when_supported() {
        let mut pool = boxed::<Plain>();
        let h = pool
            .downcast_mut::<Plain>()
            .unwrap()
            .create(Plain::new(8))
            .erase();
        let copy = pool.duplicate_raw(h).unwrap().unwrap();
        assert_ne!(copy, h);
        let typed = pool.downcast_ref::<Plain>().unwrap();
        assert_eq!(typed.item(copy.cast()).unwrap().value, 8);
    }

    #[test]
    fn duplicate_skips_unsupported_kinds() {
        let mut pool = boxed::<Pinned>();
        let h = pool
            .downcast_mut::<Pinned>()
            .unwrap()
            .create(Pinned { tag: 1 })
            .erase();
        assert_eq!(pool.duplicate_raw(h).unwrap(), None);
        assert_eq!(pool.stats().count, 1);
    }

    #[test]
    fn reset_empties_both_kinds() {
        for mut pool in [boxed::<Plain>(), boxed::<Counted>()] {
            if let Some(p) = pool.downcast_mut::<Plain>() {
                p.create(Plain::new(1));
            }
            if let Some(p) = pool.downcast_mut::<Counted>() {
                p.create(Counted::new(1));
            }
            pool.reset();
            assert_eq!(pool.stats().count, 0);
            assert_eq!(pool.stats().occupancy, 0);
        }
    }
}
