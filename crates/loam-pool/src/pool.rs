//! Contiguous per-type storage with free-slot reuse and two-phase destroy.
//!
//! [`SlabPool`] keeps every record of one type in a single `Vec`. Slots are
//! addressed by 1-based [`Handle`]s, so handles survive reallocation of the
//! block. Destruction is split in two:
//!
//! 1. [`destroy`](SlabPool::destroy) marks the slot as garbage and bumps the
//!    pool version. The record stays readable through its handle.
//! 2. [`dispose`](SlabPool::dispose) runs finalizers, resets the slots, and
//!    pushes their handles onto the free list for LIFO reuse.
//!
//! # Versioning
//!
//! The pool version increases when `create` grows the block and on every
//! `destroy`. [`View`]s capture it and are rejected once it moves. Reusing a
//! free slot neither grows the block nor bumps the version. `clear` resets
//! the version and moves the pool to a fresh [`PoolEpoch`], which views also
//! capture.
//!
//! # Claims
//!
//! A live record can be [`claim`](SlabPool::claim)ed by a single holder,
//! such as a store owner. Claimed records refuse `destroy` and `release`
//! until the claim is dropped, so nothing but the holder can end them.
//!
//! # Reentrancy
//!
//! `create`, `dispose`, and `clear` take `&mut self`, and finalizers only see
//! `&mut T`, so structural mutation from inside another structural mutation
//! does not type-check.

use loam_core::{Finalize, Handle, PoolEpoch, Record};
use tracing::{debug, trace, warn};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::shared::Ref;
use crate::stats::{DisposeReport, PoolStats};
use crate::view::View;

/// Lifecycle state of one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Never used since the last clear, or disposed and on the free list.
    Free,
    /// Holds a live record.
    Live,
    /// Marked for destruction; readable until the next dispose.
    Garbage,
}

/// Growable slab of `T` with stable handles.
pub struct SlabPool<T: Record> {
    /// Record storage; `items.len() == occupancy`.
    items: Vec<T>,
    /// Per-slot lifecycle state, parallel to `items`.
    states: Vec<SlotState>,
    /// Per-slot reuse counter, parallel to `items`.
    #[cfg(feature = "generation-tracking")]
    generations: Vec<u32>,
    /// Per-slot claim flag, parallel to `items`.
    claimed: Vec<bool>,
    occupancy: u32,
    capacity: u32,
    min_capacity: u32,
    /// Reclaimed handles, reused LIFO.
    free: Vec<Handle<T>>,
    /// Destroyed handles awaiting dispose.
    garbage: Vec<Handle<T>>,
    version: u64,
    epoch: PoolEpoch,
}

impl<T: Record> SlabPool<T> {
    /// Create an empty pool with the default configuration.
    pub fn new() -> Self {
        Self::build(PoolConfig::DEFAULT_INITIAL_CAPACITY)
    }

    /// Create an empty pool from a validated configuration.
    pub fn with_config(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(Self::build(config.initial_capacity))
    }

    fn build(capacity: u32) -> Self {
        Self {
            items: Vec::with_capacity(capacity as usize),
            states: Vec::with_capacity(capacity as usize),
            #[cfg(feature = "generation-tracking")]
            generations: Vec::with_capacity(capacity as usize),
            claimed: Vec::with_capacity(capacity as usize),
            occupancy: 0,
            capacity,
            min_capacity: capacity,
            free: Vec::new(),
            garbage: Vec::new(),
            version: 0,
            epoch: PoolEpoch::next(),
        }
    }

    /// Store `record` and return its handle.
    ///
    /// Reuses the most recently freed slot if there is one. Otherwise appends,
    /// doubling the block first when it is full; growth moves every record
    /// and invalidates all outstanding views.
    pub fn create(&mut self, record: T) -> Handle<T> {
        if let Some(handle) = self.free.pop() {
            let index = slot_index(handle);
            self.items[index] = record;
            self.states[index] = SlotState::Live;
            #[cfg(feature = "generation-tracking")]
            {
                self.generations[index] = self.generations[index].wrapping_add(1).max(1);
            }
            trace!(record = T::type_name(), handle = handle.raw(), "reused free slot");
            return self.issue(index);
        }

        if self.occupancy == self.capacity {
            self.grow();
        }

        let index = self.occupancy as usize;
        self.items.push(record);
        self.states.push(SlotState::Live);
        self.claimed.push(false);
        #[cfg(feature = "generation-tracking")]
        {
            self.generations.push(1);
        }
        self.occupancy += 1;
        trace!(record = T::type_name(), handle = self.occupancy, "appended slot");
        self.issue(index)
    }

    fn grow(&mut self) {
        assert!(
            self.capacity <= u32::MAX / 2,
            "slab pool of {} exhausted the 32-bit handle space",
            T::type_name()
        );
        let new_capacity = self.capacity * 2;
        let additional = (new_capacity - self.occupancy) as usize;
        self.items.reserve_exact(additional);
        self.states.reserve_exact(additional);
        self.claimed.reserve_exact(additional);
        #[cfg(feature = "generation-tracking")]
        {
            self.generations.reserve_exact(additional);
        }
        self.capacity = new_capacity;
        self.version += 1;
        debug!(
            record = T::type_name(),
            capacity = new_capacity,
            version = self.version,
            "slab pool grew"
        );
    }

    /// Mark a record for destruction.
    ///
    /// The null handle is a no-op. The record stays readable until the next
    /// [`dispose`](Self::dispose); its finalizer has not run yet. Bumps the
    /// pool version. Claimed records are refused with [`PoolError::Claimed`].
    pub fn destroy(&mut self, handle: Handle<T>) -> Result<(), PoolError> {
        if handle.is_null() {
            return Ok(());
        }
        let index = self.locate_live(handle)?;
        if self.claimed[index] {
            return Err(PoolError::Claimed {
                handle: handle.raw(),
            });
        }
        self.states[index] = SlotState::Garbage;
        self.version += 1;
        let issued = self.issue(index);
        self.garbage.push(issued);
        trace!(record = T::type_name(), handle = handle.raw(), "marked for destruction");
        Ok(())
    }

    /// Finalize garbage and recycle its slots.
    ///
    /// Finalizing kinds get one finalizer call per garbage record; records
    /// that defer stay in the garbage list for the next pass without
    /// affecting the others. Plain kinds are reset and freed in one pass.
    pub fn dispose(&mut self) -> DisposeReport {
        let mut report = DisposeReport::default();
        if self.garbage.is_empty() {
            return report;
        }

        if T::FINALIZES {
            let garbage = std::mem::take(&mut self.garbage);
            let mut deferred = Vec::new();
            for &handle in garbage.iter().rev() {
                let index = slot_index(handle);
                if self.items[index].finalize() == Finalize::Defer {
                    deferred.push(handle);
                    continue;
                }
                self.recycle(index, handle);
                report.finalized += 1;
            }
            deferred.reverse();
            report.deferred = deferred.len() as u32;
            self.garbage = deferred;
        } else {
            let mut garbage = std::mem::take(&mut self.garbage);
            report.finalized = garbage.len() as u32;
            for handle in garbage.drain(..) {
                self.recycle(slot_index(handle), handle);
            }
            self.garbage = garbage;
        }

        debug!(
            record = T::type_name(),
            finalized = report.finalized,
            deferred = report.deferred,
            free = self.free.len(),
            "disposed pool garbage"
        );
        report
    }

    fn recycle(&mut self, index: usize, handle: Handle<T>) {
        self.items[index] = T::default();
        self.states[index] = SlotState::Free;
        self.claimed[index] = false;
        self.free.push(handle);
    }

    /// Issue a view of a live or garbage record.
    pub fn get(&self, handle: Handle<T>) -> Result<View<T>, PoolError> {
        self.locate_allocated(handle)?;
        Ok(View::new(handle, self.epoch, self.version))
    }

    /// Like [`get`](Self::get), returning `None` instead of an error.
    pub fn try_get(&self, handle: Handle<T>) -> Option<View<T>> {
        self.get(handle).ok()
    }

    /// Dereference a view.
    ///
    /// Fails with [`PoolError::StaleView`] in debug builds if the pool has
    /// structurally changed since the view was issued, and with
    /// [`PoolError::ForeignView`] if another pool issued it or this one was
    /// cleared since.
    pub fn read(&self, view: &View<T>) -> Result<&T, PoolError> {
        self.check_version(view)?;
        let index = self.locate_allocated(view.handle())?;
        Ok(&self.items[index])
    }

    /// Mutably dereference a view. Same staleness rules as [`read`](Self::read).
    pub fn write(&mut self, view: &View<T>) -> Result<&mut T, PoolError> {
        self.check_version(view)?;
        let index = self.locate_allocated(view.handle())?;
        Ok(&mut self.items[index])
    }

    fn check_version(
        &self,
        #[cfg_attr(not(debug_assertions), allow(unused_variables))] view: &View<T>,
    ) -> Result<(), PoolError> {
        #[cfg(debug_assertions)]
        {
            if view.epoch() != self.epoch {
                return Err(PoolError::ForeignView {
                    issued: view.epoch().get(),
                    current: self.epoch.get(),
                });
            }
            if view.version() != self.version {
                return Err(PoolError::StaleView {
                    captured: view.version(),
                    current: self.version,
                });
            }
        }
        Ok(())
    }

    /// Borrow a live or garbage record directly.
    pub fn item(&self, handle: Handle<T>) -> Result<&T, PoolError> {
        let index = self.locate_allocated(handle)?;
        Ok(&self.items[index])
    }

    /// Mutably borrow a live or garbage record directly.
    pub fn item_mut(&mut self, handle: Handle<T>) -> Result<&mut T, PoolError> {
        let index = self.locate_allocated(handle)?;
        Ok(&mut self.items[index])
    }

    /// Overwrite the record at `destination` with the data of `source`
    /// through [`Record::copy_from`].
    ///
    /// Returns `Ok(false)` if the record type cannot be copied. Copying a
    /// record onto itself is a no-op.
    pub fn copy_record(
        &mut self,
        source: Handle<T>,
        destination: Handle<T>,
    ) -> Result<bool, PoolError> {
        let from = self.locate_allocated(source)?;
        let to = self.locate_allocated(destination)?;
        if from == to {
            return Ok(true);
        }
        let copied = if from < to {
            let (head, tail) = self.items.split_at_mut(to);
            tail[0].copy_from(&head[from])
        } else {
            let (head, tail) = self.items.split_at_mut(from);
            head[to].copy_from(&tail[0])
        };
        Ok(copied)
    }

    /// State of the slot `handle` names, or `None` if it is null, out of
    /// bounds, or stale.
    pub fn slot_state(&self, handle: Handle<T>) -> Option<SlotState> {
        self.locate(handle).ok().map(|index| self.states[index])
    }

    /// Whether `handle` names a live (not destroyed) record.
    pub fn is_live(&self, handle: Handle<T>) -> bool {
        self.slot_state(handle) == Some(SlotState::Live)
    }

    /// Claim a live record for a single holder.
    ///
    /// Fails with [`PoolError::Claimed`] if someone already holds it.
    pub fn claim(&mut self, handle: Handle<T>) -> Result<(), PoolError> {
        let index = self.locate_live(handle)?;
        if self.claimed[index] {
            return Err(PoolError::Claimed {
                handle: handle.raw(),
            });
        }
        self.claimed[index] = true;
        Ok(())
    }

    /// Drop the claim on a record. Returns whether it was claimed.
    pub fn unclaim(&mut self, handle: Handle<T>) -> Result<bool, PoolError> {
        let index = self.locate_allocated(handle)?;
        Ok(std::mem::replace(&mut self.claimed[index], false))
    }

    /// Whether `handle` names a claimed record.
    pub fn is_claimed(&self, handle: Handle<T>) -> bool {
        self.locate(handle).is_ok_and(|index| self.claimed[index])
    }

    /// Handle for a position in [`data`](Self::data), if within occupancy.
    pub fn handle_of(&self, index: usize) -> Option<Handle<T>> {
        (index < self.occupancy as usize).then(|| self.issue(index))
    }

    /// The raw storage block, `occupancy` records long.
    ///
    /// Includes free slots (holding `T::default()`) and garbage records.
    pub fn data(&self) -> &[T] {
        &self.items
    }

    /// Mutable raw storage block. See [`data`](Self::data).
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.items
    }

    /// Iterate live records with their handles. Garbage and free slots are
    /// skipped.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.items
            .iter()
            .zip(&self.states)
            .enumerate()
            .filter(|(_, (_, state))| **state == SlotState::Live)
            .map(move |(index, (item, _))| (self.issue(index), item))
    }

    /// Iterate live records mutably with their handles.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> + '_ {
        #[cfg(feature = "generation-tracking")]
        let generations = &self.generations;
        self.items
            .iter_mut()
            .zip(&self.states)
            .enumerate()
            .filter(|(_, (_, state))| **state == SlotState::Live)
            .map(move |(index, (item, _))| {
                #[cfg(feature = "generation-tracking")]
                let handle = Handle::with_generation(index as u32 + 1, generations[index]);
                #[cfg(not(feature = "generation-tracking"))]
                let handle = Handle::from_raw(index as u32 + 1);
                (handle, item)
            })
    }

    /// Destroy every record immediately and shrink back to the initial
    /// capacity.
    ///
    /// With `destroy_items`, finalizers run once on every live or garbage
    /// record; deferral is not honoured here. Resets occupancy, the free
    /// list, the garbage list, claims, and the version, and moves the pool
    /// to a new epoch. Invalidates all views and handles.
    pub fn clear(&mut self, destroy_items: bool) -> Result<(), PoolError> {
        if destroy_items && !T::FINALIZES {
            return Err(PoolError::NotFinalizable {
                record: T::type_name(),
            });
        }
        self.reset_storage(destroy_items);
        Ok(())
    }

    /// [`clear`](Self::clear) without the finalizer check.
    pub(crate) fn reset_storage(&mut self, destroy_items: bool) {
        if destroy_items {
            self.finalize_occupied();
        }

        let capacity = self.min_capacity as usize;
        self.items = Vec::with_capacity(capacity);
        self.states = Vec::with_capacity(capacity);
        #[cfg(feature = "generation-tracking")]
        {
            self.generations = Vec::with_capacity(capacity);
        }
        self.claimed = Vec::with_capacity(capacity);
        self.occupancy = 0;
        self.capacity = self.min_capacity;
        self.free = Vec::new();
        self.garbage = Vec::new();
        self.version = 0;
        self.epoch = PoolEpoch::next();
        debug!(
            record = T::type_name(),
            destroy_items,
            epoch = self.epoch.get(),
            "slab pool cleared"
        );
    }

    fn finalize_occupied(&mut self) {
        let mut deferred = 0u32;
        for (item, state) in self.items.iter_mut().zip(&self.states) {
            if *state != SlotState::Free && item.finalize() == Finalize::Defer {
                deferred += 1;
            }
        }
        if deferred > 0 {
            warn!(
                record = T::type_name(),
                deferred, "finalizers deferred during teardown; forcing destruction"
            );
        }
    }

    /// Store `record` and start a reference-counted lineage for it.
    pub fn create_ref(&mut self, record: T) -> Ref<T> {
        Ref::new(self.create(record))
    }

    /// Drop one clone of a `Ref`, destroying the record if it was the last.
    ///
    /// Returns whether the record was marked for destruction. The last
    /// release of a claimed record fails with [`PoolError::Claimed`] and
    /// leaves the record to its holder.
    pub fn release(&mut self, shared: Ref<T>) -> Result<bool, PoolError> {
        match shared.into_last_handle() {
            Some(handle) => {
                self.destroy(handle)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Number of live records (garbage included until disposed).
    pub fn count(&self) -> u32 {
        self.occupancy - self.free.len() as u32
    }

    /// Whether the pool holds no records.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Highest number of slots in use since the last clear.
    pub fn occupancy(&self) -> u32 {
        self.occupancy
    }

    /// Slots available before the next growth.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Structural mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Current epoch; changes on every clear.
    pub fn epoch(&self) -> PoolEpoch {
        self.epoch
    }

    /// Handles marked for destruction and not yet disposed, in mark order.
    pub fn garbage(&self) -> &[Handle<T>] {
        &self.garbage
    }

    /// Number of slots on the free list.
    pub fn free_count(&self) -> u32 {
        self.free.len() as u32
    }

    /// Bookkeeping snapshot.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            record: T::type_name(),
            count: self.count(),
            occupancy: self.occupancy,
            capacity: self.capacity,
            free: self.free_count(),
            garbage: self.garbage.len() as u32,
            version: self.version,
        }
    }

    fn issue(&self, index: usize) -> Handle<T> {
        let raw = index as u32 + 1;
        #[cfg(feature = "generation-tracking")]
        {
            Handle::with_generation(raw, self.generations[index])
        }
        #[cfg(not(feature = "generation-tracking"))]
        {
            Handle::from_raw(raw)
        }
    }

    fn locate(&self, handle: Handle<T>) -> Result<usize, PoolError> {
        let index = handle.slot().ok_or(PoolError::NullHandle)?;
        if index >= self.occupancy as usize {
            return Err(PoolError::OutOfBounds {
                handle: handle.raw(),
                occupancy: self.occupancy,
            });
        }
        #[cfg(feature = "generation-tracking")]
        {
            let slot_generation = self.generations[index];
            if handle.generation() != 0 && handle.generation() != slot_generation {
                return Err(PoolError::StaleHandle {
                    handle: handle.raw(),
                    handle_generation: handle.generation(),
                    slot_generation,
                });
            }
        }
        Ok(index)
    }

    fn locate_live(&self, handle: Handle<T>) -> Result<usize, PoolError> {
        let index = self.locate(handle)?;
        match self.states[index] {
            SlotState::Live => Ok(index),
            SlotState::Free => Err(PoolError::NotAllocated {
                handle: handle.raw(),
            }),
            SlotState::Garbage => Err(PoolError::AlreadyDestroyed {
                handle: handle.raw(),
            }),
        }
    }

    fn locate_allocated(&self, handle: Handle<T>) -> Result<usize, PoolError> {
        let index = self.locate(handle)?;
        if self.states[index] == SlotState::Free {
            return Err(PoolError::NotAllocated {
                handle: handle.raw(),
            });
        }
        Ok(index)
    }
}

impl<T: Record> Default for SlabPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Drop for SlabPool<T> {
    fn drop(&mut self) {
        if T::FINALIZES && self.count() > 0 {
            self.finalize_occupied();
        }
    }
}

/// Slot index of a handle the pool issued itself.
fn slot_index<T>(handle: Handle<T>) -> usize {
    debug_assert!(!handle.is_null(), "pool bookkeeping holds a null handle");
    handle.raw() as usize - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_test_utils::{counter, read, Counted, Deferred, Pinned, Plain};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn create_then_get_returns_written_record() {
        let mut pool = SlabPool::new();
        let h = pool.create(Counted::new(7));
        let view = pool.get(h).unwrap();
        assert_eq!(pool.read(&view).unwrap().id, 7);
        assert_eq!(h.raw(), 1);
    }

    #[test]
    fn growth_scenario_matches_doubling_policy() {
        let mut pool: SlabPool<Counted> = SlabPool::new();
        assert_eq!(pool.capacity(), 1);

        let h1 = pool.create(Counted::new(1));
        let h2 = pool.create(Counted::new(2));
        let h3 = pool.create(Counted::new(3));
        assert_eq!((h1.raw(), h2.raw(), h3.raw()), (1, 2, 3));
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.occupancy(), 3);
        assert_eq!(pool.version(), 2, "one bump per growth");

        pool.destroy(h2).unwrap();
        assert_eq!(pool.version(), 3);
        assert_eq!(pool.garbage(), &[h2]);

        let report = pool.dispose();
        assert_eq!(report.finalized, 1);
        assert!(pool.garbage().is_empty());
        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.data()[1].id, 0, "slot reset to default");

        let reused = pool.create(Counted::new(9));
        assert_eq!(reused, h2);
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.version(), 3, "reuse does not bump the version");
        assert_eq!(pool.item(reused).unwrap().id, 9);
    }

    #[test]
    fn reused_slot_holds_new_record_not_stale_data() {
        let mut pool = SlabPool::new();
        let a = pool.create(Counted::new(1));
        pool.destroy(a).unwrap();
        pool.dispose();
        let b = pool.create(Counted::new(2));
        assert_eq!(a, b);
        let view = pool.get(b).unwrap();
        assert_eq!(pool.read(&view).unwrap().id, 2);
    }

    #[test]
    fn free_list_is_lifo() {
        let mut pool = SlabPool::new();
        let handles: Vec<_> = (0..4).map(|i| pool.create(Plain::new(i))).collect();
        pool.destroy(handles[0]).unwrap();
        pool.destroy(handles[2]).unwrap();
        pool.dispose();
        let first = pool.create(Plain::new(10));
        let second = pool.create(Plain::new(11));
        assert_eq!(first, handles[2]);
        assert_eq!(second, handles[0]);
    }

    #[test]
    fn count_tracks_occupancy_minus_free() {
        let mut pool = SlabPool::new();
        let a = pool.create(Plain::new(1));
        let _b = pool.create(Plain::new(2));
        pool.destroy(a).unwrap();
        assert_eq!(pool.count(), 2, "garbage still counts until disposed");
        pool.dispose();
        assert_eq!(pool.count(), 1);
        assert_eq!(pool.occupancy(), 2);
    }

    #[test]
    fn destroy_null_is_noop() {
        let mut pool: SlabPool<Plain> = SlabPool::new();
        pool.destroy(Handle::NULL).unwrap();
        assert_eq!(pool.version(), 0);
        assert!(pool.garbage().is_empty());
    }

    #[test]
    fn get_null_is_error() {
        let pool: SlabPool<Plain> = SlabPool::new();
        assert_eq!(pool.get(Handle::NULL).unwrap_err(), PoolError::NullHandle);
        assert!(pool.try_get(Handle::NULL).is_none());
    }

    #[test]
    fn out_of_range_handle_rejected() {
        let mut pool = SlabPool::new();
        pool.create(Plain::new(1));
        let bogus = Handle::from_raw(5);
        assert_eq!(
            pool.get(bogus).unwrap_err(),
            PoolError::OutOfBounds {
                handle: 5,
                occupancy: 1
            }
        );
        assert!(pool.destroy(bogus).is_err());
    }

    #[test]
    fn double_destroy_rejected() {
        let mut pool = SlabPool::new();
        let h = pool.create(Plain::new(1));
        pool.destroy(h).unwrap();
        assert_eq!(
            pool.destroy(h).unwrap_err(),
            PoolError::AlreadyDestroyed { handle: 1 }
        );
        pool.dispose();
        assert_eq!(
            pool.destroy(h).unwrap_err(),
            PoolError::NotAllocated { handle: 1 }
        );
    }

    #[test]
    fn garbage_stays_readable_until_dispose() {
        let mut pool = SlabPool::new();
        let h = pool.create(Counted::new(5));
        pool.destroy(h).unwrap();
        assert_eq!(pool.item(h).unwrap().id, 5);
        assert_eq!(pool.slot_state(h), Some(SlotState::Garbage));
        assert!(!pool.is_live(h));
        pool.dispose();
        assert!(pool.item(h).is_err());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn view_goes_stale_after_destroy() {
        let mut pool = SlabPool::new();
        let a = pool.create(Counted::new(1));
        let b = pool.create(Counted::new(2));
        let view = pool.get(a).unwrap();
        pool.destroy(b).unwrap();
        assert!(matches!(
            pool.read(&view),
            Err(PoolError::StaleView { .. })
        ));
        let fresh = pool.get(a).unwrap();
        assert_eq!(pool.read(&fresh).unwrap().id, 1);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn view_goes_stale_after_growth_but_not_after_in_place_create() {
        let mut pool = SlabPool::with_config(PoolConfig::with_capacity(2)).unwrap();
        let a = pool.create(Plain::new(1));
        let view = pool.get(a).unwrap();
        pool.create(Plain::new(2));
        assert!(pool.read(&view).is_ok(), "no growth, view still valid");
        pool.create(Plain::new(3));
        assert!(pool.write(&view).is_err(), "growth invalidated the view");
    }

    #[cfg(debug_assertions)]
    #[test]
    fn view_from_before_clear_rejected() {
        let mut pool = SlabPool::new();
        let h = pool.create(Plain::new(1));
        let view = pool.get(h).unwrap();
        let before = pool.epoch();
        pool.clear(false).unwrap();
        assert_ne!(pool.epoch(), before);
        let again = pool.create(Plain::new(2));
        assert_eq!(again, h, "slot 1 is handed out again");
        assert_eq!(pool.version(), 0);
        assert!(matches!(
            pool.read(&view),
            Err(PoolError::ForeignView { .. })
        ));
        let fresh = pool.get(again).unwrap();
        assert_eq!(pool.read(&fresh).unwrap().value, 2);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn view_from_another_pool_rejected() {
        let mut first = SlabPool::new();
        let mut second = SlabPool::new();
        let a = first.create(Plain::new(1));
        second.create(Plain::new(2));
        let view = first.get(a).unwrap();
        assert_eq!(
            second.read(&view),
            Err(PoolError::ForeignView {
                issued: first.epoch().get(),
                current: second.epoch().get(),
            })
        );
        assert!(second.write(&view).is_err());
        assert_eq!(first.read(&view).unwrap().value, 1);
    }

    #[test]
    fn claimed_record_refuses_destroy_and_release() {
        let mut pool = SlabPool::new();
        let shared = pool.create_ref(Plain::new(4));
        let h = shared.handle();
        pool.claim(h).unwrap();
        assert!(pool.is_claimed(h));
        assert_eq!(pool.claim(h), Err(PoolError::Claimed { handle: 1 }));
        assert_eq!(pool.destroy(h), Err(PoolError::Claimed { handle: 1 }));
        assert_eq!(pool.release(shared), Err(PoolError::Claimed { handle: 1 }));
        assert!(pool.is_live(h));
        assert!(pool.garbage().is_empty());

        assert_eq!(pool.unclaim(h), Ok(true));
        assert_eq!(pool.unclaim(h), Ok(false));
        pool.destroy(h).unwrap();
        assert_eq!(
            pool.claim(h),
            Err(PoolError::AlreadyDestroyed { handle: 1 })
        );
    }

    #[test]
    fn claims_do_not_survive_slot_reuse_or_clear() {
        let mut pool = SlabPool::new();
        let h = pool.create(Plain::new(1));
        pool.claim(h).unwrap();
        pool.unclaim(h).unwrap();
        pool.destroy(h).unwrap();
        pool.dispose();
        let reused = pool.create(Plain::new(2));
        assert_eq!(reused, h);
        assert!(!pool.is_claimed(reused));

        pool.claim(reused).unwrap();
        pool.clear(false).unwrap();
        let fresh = pool.create(Plain::new(3));
        assert!(!pool.is_claimed(fresh));
        pool.destroy(fresh).unwrap();
    }

    #[test]
    fn dispose_walks_garbage_backwards_and_keeps_deferred_order() {
        let attempts = Arc::new(AtomicU32::new(0));
        let mut pool = SlabPool::new();
        let a = pool.create(Deferred::new(1, &attempts));
        let b = pool.create(Deferred::new(0, &attempts));
        let c = pool.create(Deferred::new(1, &attempts));
        for h in [a, b, c] {
            pool.destroy(h).unwrap();
        }

        let report = pool.dispose();
        assert_eq!((report.finalized, report.deferred), (1, 2));
        assert_eq!(pool.garbage(), &[a, c]);
        assert_eq!(pool.free_count(), 1);

        let report = pool.dispose();
        assert_eq!((report.finalized, report.deferred), (2, 0));
        assert!(pool.garbage().is_empty());
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
        // c was recycled before a, so a comes back first.
        assert_eq!(pool.create(Deferred::default()), a);
        assert_eq!(pool.create(Deferred::default()), c);
        assert_eq!(pool.create(Deferred::default()), b);
    }

    #[test]
    fn write_through_view_updates_slot() {
        let mut pool = SlabPool::new();
        let h = pool.create(Counted::new(1));
        let view = pool.get(h).unwrap();
        pool.write(&view).unwrap().some_data = 13.37;
        assert_eq!(pool.item(h).unwrap().some_data, 13.37);
    }

    #[test]
    fn finalizer_runs_on_dispose_not_destroy() {
        let live = counter(1);
        let mut pool = SlabPool::new();
        let h = pool.create(Counted::with_counter(1, &live));
        pool.destroy(h).unwrap();
        assert_eq!(read(&live), 1);
        pool.dispose();
        assert_eq!(read(&live), 0);
    }

    #[test]
    fn deferred_finalizer_is_retried_next_pass() {
        let attempts = Arc::new(AtomicU32::new(0));
        let mut pool = SlabPool::new();
        let slow = pool.create(Deferred::new(2, &attempts));
        let quick = pool.create(Deferred::new(0, &attempts));
        pool.destroy(slow).unwrap();
        pool.destroy(quick).unwrap();

        let first = pool.dispose();
        assert_eq!(first.finalized, 1);
        assert_eq!(first.deferred, 1);
        assert_eq!(pool.garbage(), &[slow]);
        assert_eq!(pool.free_count(), 1);

        let second = pool.dispose();
        assert_eq!(second.deferred, 1);
        let third = pool.dispose();
        assert_eq!(third.finalized, 1);
        assert!(pool.garbage().is_empty());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn plain_records_recycled_in_one_pass() {
        let mut pool = SlabPool::new();
        let handles: Vec<_> = (0..3).map(|i| pool.create(Plain::new(i + 1))).collect();
        for &h in &handles {
            pool.destroy(h).unwrap();
        }
        let report = pool.dispose();
        assert_eq!(report.finalized, 3);
        assert_eq!(pool.count(), 0);
        assert!(pool.data().iter().all(|p| p.value == 0));
    }

    #[test]
    fn clear_resets_bookkeeping() {
        let live = counter(3);
        let mut pool = SlabPool::new();
        for i in 0..3 {
            pool.create(Counted::with_counter(i, &live));
        }
        pool.clear(true).unwrap();
        assert_eq!(read(&live), 0);
        assert_eq!(pool.occupancy(), 0);
        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.version(), 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn clear_without_finalizer_rejected_for_plain_kinds() {
        let mut pool: SlabPool<Plain> = SlabPool::new();
        pool.create(Plain::new(1));
        assert!(matches!(
            pool.clear(true),
            Err(PoolError::NotFinalizable { record: "Plain" })
        ));
        assert_eq!(pool.count(), 1, "failed clear leaves the pool untouched");
        pool.clear(false).unwrap();
        assert!(pool.is_empty());
    }

    #[test]
    fn drop_finalizes_remaining_records() {
        let live = counter(2);
        {
            let mut pool = SlabPool::new();
            pool.create(Counted::with_counter(1, &live));
            let h = pool.create(Counted::with_counter(2, &live));
            pool.destroy(h).unwrap();
        }
        assert_eq!(read(&live), 0);
    }

    #[test]
    fn iter_skips_garbage_and_free() {
        let mut pool = SlabPool::new();
        let a = pool.create(Plain::new(1));
        let b = pool.create(Plain::new(2));
        let c = pool.create(Plain::new(3));
        pool.destroy(b).unwrap();
        let seen: Vec<_> = pool.iter().map(|(h, p)| (h, p.value)).collect();
        assert_eq!(seen, vec![(a, 1), (c, 3)]);

        for (_, p) in pool.iter_mut() {
            p.value *= 10;
        }
        assert_eq!(pool.item(c).unwrap().value, 30);
        assert_eq!(pool.item(b).unwrap().value, 2);
    }

    #[test]
    fn copy_record_keeps_destination_counter() {
        let live = counter(2);
        let mut pool = SlabPool::new();
        let mut source = Counted::new(5);
        source.some_data = 2.5;
        let a = pool.create(source);
        let b = pool.create(Counted::with_counter(6, &live));
        assert!(pool.copy_record(a, b).unwrap());
        let copied = pool.item(b).unwrap();
        assert_eq!((copied.id, copied.some_data), (5, 2.5));
        assert!(copied.counter.is_some());
        assert!(pool.copy_record(b, b).unwrap());
    }

    #[test]
    fn copy_record_refused_for_pinned_kinds() {
        let mut pool = SlabPool::new();
        let a = pool.create(Pinned { tag: 1 });
        let b = pool.create(Pinned { tag: 2 });
        assert!(!pool.copy_record(b, a).unwrap());
        assert_eq!(pool.item(a).unwrap().tag, 1);
    }

    #[test]
    fn handle_of_reverses_data_index() {
        let mut pool = SlabPool::new();
        pool.create(Plain::new(1));
        let h = pool.create(Plain::new(2));
        assert_eq!(pool.handle_of(1), Some(h));
        assert_eq!(pool.handle_of(2), None);
    }

    #[test]
    fn release_destroys_only_on_last_ref() {
        let mut pool = SlabPool::new();
        let shared = pool.create_ref(Plain::new(4));
        let other = shared.clone();
        assert!(!pool.release(other).unwrap());
        assert_eq!(pool.garbage().len(), 0);
        let h = shared.handle();
        assert!(pool.release(shared).unwrap());
        assert_eq!(pool.garbage(), &[h]);
    }

    #[test]
    fn stats_reflect_state() {
        let mut pool = SlabPool::new();
        let a = pool.create(Plain::new(1));
        pool.create(Plain::new(2));
        pool.destroy(a).unwrap();
        let stats = pool.stats();
        assert_eq!(stats.record, "Plain");
        assert_eq!(stats.count, 2);
        assert_eq!(stats.garbage, 1);
        assert_eq!(stats.capacity, 2);
        assert_eq!(stats.version, 2);
    }

    #[test]
    fn invalid_config_rejected() {
        assert!(SlabPool::<Plain>::with_config(PoolConfig::with_capacity(0)).is_err());
    }

    #[cfg(feature = "generation-tracking")]
    #[test]
    fn reissued_slot_rejects_old_handle() {
        let mut pool = SlabPool::new();
        let old = pool.create(Plain::new(1));
        pool.destroy(old).unwrap();
        pool.dispose();
        let new = pool.create(Plain::new(2));
        assert_eq!(new.raw(), old.raw());
        assert!(matches!(
            pool.item(old),
            Err(PoolError::StaleHandle { .. })
        ));
        assert_eq!(pool.item(new).unwrap().value, 2);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashMap;

        #[derive(Clone, Debug)]
        enum Op {
            Create(u64),
            Destroy(usize),
            Dispose,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                3 => any::<u64>().prop_map(Op::Create),
                2 => (0usize..32).prop_map(Op::Destroy),
                1 => Just(Op::Dispose),
            ]
        }

        proptest! {
            #[test]
            fn live_handles_always_resolve_to_their_record(
                ops in proptest::collection::vec(op(), 1..64),
            ) {
                let mut pool: SlabPool<Plain> = SlabPool::new();
                let mut model: HashMap<u32, u64> = HashMap::new();
                let mut live: Vec<Handle<Plain>> = Vec::new();

                for op in ops {
                    match op {
                        Op::Create(value) => {
                            let h = pool.create(Plain::new(value));
                            prop_assert!(!model.contains_key(&h.raw()), "handle reused while live");
                            model.insert(h.raw(), value);
                            live.push(h);
                        }
                        Op::Destroy(i) if !live.is_empty() => {
                            let h = live.swap_remove(i % live.len());
                            pool.destroy(h).unwrap();
                            model.remove(&h.raw());
                        }
                        Op::Destroy(_) => {}
                        Op::Dispose => {
                            pool.dispose();
                        }
                    }
                    for &h in &live {
                        prop_assert_eq!(pool.item(h).unwrap().value, model[&h.raw()]);
                    }
                    prop_assert!(pool.occupancy() <= pool.capacity());
                    prop_assert!(pool.capacity().is_power_of_two());
                }
            }

            #[test]
            fn version_never_decreases(
                ops in proptest::collection::vec(op(), 1..64),
            ) {
                let mut pool: SlabPool<Plain> = SlabPool::new();
                let mut live: Vec<Handle<Plain>> = Vec::new();
                let mut last = pool.version();
                for op in ops {
                    match op {
                        Op::Create(value) => live.push(pool.create(Plain::new(value))),
                        Op::Destroy(i) if !live.is_empty() => {
                            let h = live.swap_remove(i % live.len());
                            pool.destroy(h).unwrap();
                            prop_assert!(pool.version() > last);
                        }
                        Op::Destroy(_) => {}
                        Op::Dispose => {
                            pool.dispose();
                        }
                    }
                    prop_assert!(pool.version() >= last);
                    last = pool.version();
                }
            }
        }
    }
}
