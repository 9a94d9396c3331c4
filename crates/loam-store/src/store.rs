//! The store: typed pools, owners, and the deferred-destruction cycle.
//!
//! A [`Store`] owns one [`SlabPool`] per registered record type plus a pool
//! of [`Owner`]s. Records are attached to owners through each owner's
//! directory. Removal is deferred:
//!
//! ```text
//! detach(owner, key)    pair enters the garbage set; record reads as absent
//!        │
//! reclaim()             pool.destroy(handle), directory entry removed
//!        │
//! dispose_all()         destroyed owners torn down, finalizers run,
//!                       slots recycled into each pool's free list
//! ```
//!
//! Attaching claims the record in its pool, so while an owner holds it the
//! record cannot be attached elsewhere or destroyed around the owner.
//!
//! [`tick`](Store::tick) runs `reclaim` then `dispose_all` and is meant to be
//! called once per update cycle, at a point where no views are held.

use std::any::TypeId;
use std::time::Instant;

use indexmap::IndexMap;
use loam_core::{Handle, PoolId, RawHandle, Record, TypeKey};
use loam_pool::{
    DisposeReport, ErasedPool, PoolConfig, PoolError, PoolStats, SlabPool, View,
};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::config::StoreConfig;
use crate::directory::DirectoryEntry;
use crate::error::StoreError;
use crate::garbage::GarbageSet;
use crate::metrics::TickMetrics;
use crate::owner::{Owner, OwnerId};

fn pool_err<T: Record>(source: PoolError) -> StoreError {
    StoreError::Pool {
        record: T::type_name(),
        source,
    }
}

/// Coordinator for typed record pools and their owners.
///
/// `Store` performs no locking. Wrap it in a
/// [`SharedStore`](crate::SharedStore) to share it across threads.
pub struct Store {
    config: StoreConfig,
    owners: SlabPool<Owner>,
    /// One pool per registered type; `pools[k]` stores the type with `TypeKey(k)`.
    pools: Vec<Box<dyn ErasedPool>>,
    keys: IndexMap<TypeId, TypeKey>,
    garbage: GarbageSet,
}

impl Store {
    /// Create an empty store with the default configuration.
    pub fn new() -> Self {
        Self::from_parts(StoreConfig::default(), SlabPool::new())
    }

    /// Create an empty store from a validated configuration.
    pub fn with_config(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let owners = SlabPool::with_config(config.owner_pool()).map_err(pool_err::<Owner>)?;
        Ok(Self::from_parts(config, owners))
    }

    fn from_parts(config: StoreConfig, owners: SlabPool<Owner>) -> Self {
        Self {
            config,
            owners,
            pools: Vec::new(),
            keys: IndexMap::new(),
            garbage: GarbageSet::default(),
        }
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ── Registration ───────────────────────────────────────────────

    /// Register a record type with the default pool configuration.
    ///
    /// Keys are assigned in registration order starting at 0.
    pub fn register<T: Record>(&mut self) -> Result<TypeKey, StoreError> {
        self.register_with::<T>(self.config.default_pool.clone())
    }

    /// Register a record type with its own pool configuration.
    pub fn register_with<T: Record>(&mut self, config: PoolConfig) -> Result<TypeKey, StoreError> {
        if self.keys.contains_key(&TypeId::of::<T>()) {
            return Err(StoreError::AlreadyRegistered {
                record: T::type_name(),
            });
        }
        let pool = SlabPool::<T>::with_config(config).map_err(pool_err::<T>)?;
        let key = TypeKey(self.pools.len() as u32);
        self.keys.insert(TypeId::of::<T>(), key);
        self.pools.push(Box::new(pool));
        debug!(record = T::type_name(), key = key.0, "registered record type");
        Ok(key)
    }

    /// Key of a registered record type.
    pub fn key_of<T: Record>(&self) -> Result<TypeKey, StoreError> {
        self.try_key_of::<T>()
            .ok_or(StoreError::UnregisteredRecord {
                record: T::type_name(),
            })
    }

    /// Key of a record type, or `None` if it is not registered.
    pub fn try_key_of<T: Record>(&self) -> Option<TypeKey> {
        self.keys.get(&TypeId::of::<T>()).copied()
    }

    /// Whether `T` is registered.
    pub fn is_registered<T: Record>(&self) -> bool {
        self.keys.contains_key(&TypeId::of::<T>())
    }

    /// Pool holding records registered under `key`.
    pub fn pool_of(&self, key: TypeKey) -> Result<PoolId, StoreError> {
        self.record_name(key)
            .map(|_| PoolId(key.0))
            .ok_or(StoreError::UnknownKey { key })
    }

    /// Name of the record type registered under `key`.
    pub fn record_name(&self, key: TypeKey) -> Option<&'static str> {
        self.pools.get(key.0 as usize).map(|p| p.record_name())
    }

    /// Registered record types in key order.
    pub fn registered(&self) -> impl Iterator<Item = (TypeKey, &'static str)> + '_ {
        self.keys
            .values()
            .map(move |&key| (key, self.pools[key.0 as usize].record_name()))
    }

    // ── Owners ─────────────────────────────────────────────────────

    /// Create an owner with an empty directory.
    pub fn create_owner(&mut self) -> OwnerId {
        let id = self.owners.create(Owner::default());
        trace!(owner = id.raw(), "created owner");
        id
    }

    /// Mark an owner for destruction.
    ///
    /// The owner and its records stay readable until the next
    /// [`dispose_all`](Self::dispose_all), which destroys every attached
    /// record and then the owner itself.
    pub fn destroy_owner(&mut self, owner: OwnerId) -> Result<(), StoreError> {
        self.owners.destroy(owner).map_err(pool_err::<Owner>)?;
        trace!(owner = owner.raw(), "marked owner for destruction");
        Ok(())
    }

    /// Borrow an owner. Destroyed owners stay readable until disposed.
    pub fn owner(&self, owner: OwnerId) -> Result<&Owner, StoreError> {
        self.owners
            .item(owner)
            .map_err(|_| StoreError::UnknownOwner { owner })
    }

    /// Whether `owner` exists and has not been destroyed.
    pub fn is_owner(&self, owner: OwnerId) -> bool {
        self.owners.is_live(owner)
    }

    /// Number of owners not marked for destruction.
    pub fn owner_count(&self) -> u32 {
        self.owners.count() - self.owners.garbage().len() as u32
    }

    /// Owners not marked for destruction, in slot order.
    pub fn owners(&self) -> impl Iterator<Item = OwnerId> + '_ {
        self.owners.iter().map(|(id, _)| id)
    }

    fn live_owner(&self, owner: OwnerId) -> Result<&Owner, StoreError> {
        if !self.owners.is_live(owner) {
            return Err(StoreError::UnknownOwner { owner });
        }
        self.owner(owner)
    }

    fn live_owner_mut(&mut self, owner: OwnerId) -> Result<&mut Owner, StoreError> {
        if !self.owners.is_live(owner) {
            return Err(StoreError::UnknownOwner { owner });
        }
        self.owners
            .item_mut(owner)
            .map_err(|_| StoreError::UnknownOwner { owner })
    }

    // ── Typed records ──────────────────────────────────────────────

    /// The pool storing `T`.
    pub fn pool<T: Record>(&self) -> Result<&SlabPool<T>, StoreError> {
        let key = self.key_of::<T>()?;
        self.pools[key.0 as usize]
            .downcast_ref::<T>()
            .ok_or(StoreError::UnregisteredRecord {
                record: T::type_name(),
            })
    }

    /// The pool storing `T`, mutably.
    pub fn pool_mut<T: Record>(&mut self) -> Result<&mut SlabPool<T>, StoreError> {
        let key = self.key_of::<T>()?;
        self.pools[key.0 as usize]
            .downcast_mut::<T>()
            .ok_or(StoreError::UnregisteredRecord {
                record: T::type_name(),
            })
    }

    /// A pool by id, type-erased.
    pub fn erased_pool(&self, pool: PoolId) -> Result<&dyn ErasedPool, StoreError> {
        self.pools
            .get(pool.index())
            .map(|p| &**p)
            .ok_or(StoreError::UnknownPool { pool })
    }

    /// Store a record that belongs to no owner.
    pub fn allocate<T: Record>(&mut self, record: T) -> Result<Handle<T>, StoreError> {
        Ok(self.pool_mut::<T>()?.create(record))
    }

    /// Mark an unowned record for destruction in its pool.
    ///
    /// Records attached to an owner are refused with
    /// [`StoreError::AlreadyOwned`]; they end through
    /// [`detach`](Self::detach) or their owner's destruction.
    pub fn destroy_now<T: Record>(&mut self, handle: Handle<T>) -> Result<(), StoreError> {
        let pool = self.pool_mut::<T>()?;
        if pool.is_claimed(handle) {
            return Err(StoreError::AlreadyOwned {
                record: T::type_name(),
                handle: handle.raw(),
            });
        }
        pool.destroy(handle).map_err(pool_err::<T>)
    }

    /// Issue a view of a record.
    pub fn get<T: Record>(&self, handle: Handle<T>) -> Result<View<T>, StoreError> {
        self.pool::<T>()?.get(handle).map_err(pool_err::<T>)
    }

    /// Dereference a view.
    pub fn read<T: Record>(&self, view: &View<T>) -> Result<&T, StoreError> {
        self.pool::<T>()?.read(view).map_err(pool_err::<T>)
    }

    /// Mutably dereference a view.
    pub fn write<T: Record>(&mut self, view: &View<T>) -> Result<&mut T, StoreError> {
        self.pool_mut::<T>()?.write(view).map_err(pool_err::<T>)
    }

    /// Borrow a record by handle.
    pub fn item<T: Record>(&self, handle: Handle<T>) -> Result<&T, StoreError> {
        self.pool::<T>()?.item(handle).map_err(pool_err::<T>)
    }

    /// Mutably borrow a record by handle.
    pub fn item_mut<T: Record>(&mut self, handle: Handle<T>) -> Result<&mut T, StoreError> {
        self.pool_mut::<T>()?.item_mut(handle).map_err(pool_err::<T>)
    }

    // ── Attach / detach ────────────────────────────────────────────

    /// Allocate `record` and attach it to `owner`.
    pub fn attach<T: Record>(&mut self, owner: OwnerId, record: T) -> Result<Handle<T>, StoreError> {
        let key = self.key_of::<T>()?;
        if self.live_owner(owner)?.directory().contains(key) {
            return Err(StoreError::AlreadyAttached {
                record: T::type_name(),
                owner,
            });
        }
        let handle = self.pool_mut::<T>()?.create(record);
        self.insert_entry(owner, key, PoolId(key.0), handle.erase())?;
        Ok(handle)
    }

    /// Attach an already-allocated record to `owner`.
    ///
    /// `pool` must store the record type registered under `key` and
    /// `handle` must name a live record in it that no owner holds yet.
    pub fn attach_raw(
        &mut self,
        owner: OwnerId,
        key: TypeKey,
        pool: PoolId,
        handle: RawHandle,
    ) -> Result<(), StoreError> {
        let record = self.record_name(key).ok_or(StoreError::UnknownKey { key })?;
        let target = self
            .pools
            .get(pool.index())
            .ok_or(StoreError::UnknownPool { pool })?;
        if target.record_type() != self.pools[key.0 as usize].record_type() {
            return Err(StoreError::PoolMismatch { key, pool });
        }
        if !target.contains_raw(handle) {
            let source = if handle.is_null() {
                PoolError::NullHandle
            } else {
                PoolError::NotAllocated {
                    handle: handle.raw(),
                }
            };
            return Err(StoreError::Pool { record, source });
        }
        if self.live_owner(owner)?.directory().contains(key) {
            return Err(StoreError::AlreadyAttached { record, owner });
        }
        self.insert_entry(owner, key, pool, handle)
    }

    fn insert_entry(
        &mut self,
        owner: OwnerId,
        key: TypeKey,
        pool: PoolId,
        handle: RawHandle,
    ) -> Result<(), StoreError> {
        let record = self.record_name(key).ok_or(StoreError::UnknownKey { key })?;
        if self.pools[pool.index()].is_claimed_raw(handle) {
            return Err(StoreError::AlreadyOwned {
                record,
                handle: handle.raw(),
            });
        }
        self.live_owner_mut(owner)?
            .directory_mut()
            .add(key, pool, handle)
            .map_err(|_| StoreError::AlreadyAttached { record, owner })?;
        self.pools[pool.index()]
            .claim_raw(handle)
            .map_err(|source| StoreError::Pool { record, source })?;
        trace!(record, owner = owner.raw(), handle = handle.raw(), "attached record");
        Ok(())
    }

    /// Schedule the `T` record of `owner` for removal at the next reclaim.
    pub fn detach<T: Record>(&mut self, owner: OwnerId) -> Result<(), StoreError> {
        let key = self.key_of::<T>()?;
        self.detach_key(owner, key)
    }

    /// Schedule the record under `key` for removal at the next reclaim.
    ///
    /// From now until reclaim the record reads as absent through
    /// [`has`](Self::has) and the `component` accessors, although its
    /// storage and directory entry remain.
    pub fn detach_key(&mut self, owner: OwnerId, key: TypeKey) -> Result<(), StoreError> {
        let record = self.record_name(key).ok_or(StoreError::UnknownKey { key })?;
        if !self.live_owner(owner)?.directory().contains(key) {
            return Err(StoreError::NotAttached { record, owner });
        }
        if !self.garbage.insert(key, owner) {
            return Err(StoreError::AlreadyDetached { record, owner });
        }
        trace!(record, owner = owner.raw(), "detached record");
        Ok(())
    }

    /// Raw directory lookup: the pool and handle stored under `key`.
    ///
    /// Unlike [`has_key`](Self::has_key), this still finds detached records
    /// until they are reclaimed.
    pub fn find(&self, owner: OwnerId, key: TypeKey) -> Option<(PoolId, RawHandle)> {
        let entry = self.owner(owner).ok()?.directory().find(key)?;
        Some((entry.pool, entry.handle))
    }

    /// Whether `owner` has a `T` record that is not pending detachment.
    pub fn has<T: Record>(&self, owner: OwnerId) -> bool {
        self.try_key_of::<T>()
            .is_some_and(|key| self.has_key(owner, key))
    }

    /// Whether `owner` has a record under `key` that is not pending
    /// detachment.
    pub fn has_key(&self, owner: OwnerId, key: TypeKey) -> bool {
        self.visible_entry(owner, key).is_some()
    }

    fn visible_entry(&self, owner: OwnerId, key: TypeKey) -> Option<DirectoryEntry> {
        if self.garbage.contains(key, owner) {
            return None;
        }
        self.owner(owner).ok()?.directory().find(key).copied()
    }

    fn attached_entry(&self, owner: OwnerId, key: TypeKey) -> Result<DirectoryEntry, StoreError> {
        let record = self.record_name(key).ok_or(StoreError::UnknownKey { key })?;
        self.owner(owner)?;
        self.visible_entry(owner, key)
            .ok_or(StoreError::NotAttached { record, owner })
    }

    /// Handle of the `T` record attached to `owner`.
    pub fn handle_of<T: Record>(&self, owner: OwnerId) -> Result<Handle<T>, StoreError> {
        let key = self.key_of::<T>()?;
        Ok(self.attached_entry(owner, key)?.handle.cast())
    }

    /// Like [`handle_of`](Self::handle_of), returning `None` on any failure.
    pub fn try_handle_of<T: Record>(&self, owner: OwnerId) -> Option<Handle<T>> {
        let key = self.try_key_of::<T>()?;
        Some(self.visible_entry(owner, key)?.handle.cast())
    }

    /// Borrow the `T` record attached to `owner`.
    pub fn component<T: Record>(&self, owner: OwnerId) -> Result<&T, StoreError> {
        let handle = self.handle_of::<T>(owner)?;
        self.item(handle)
    }

    /// Like [`component`](Self::component), returning `None` on any failure.
    pub fn try_component<T: Record>(&self, owner: OwnerId) -> Option<&T> {
        let handle = self.try_handle_of::<T>(owner)?;
        self.item(handle).ok()
    }

    /// Mutably borrow the `T` record attached to `owner`.
    pub fn component_mut<T: Record>(&mut self, owner: OwnerId) -> Result<&mut T, StoreError> {
        let handle = self.handle_of::<T>(owner)?;
        self.item_mut(handle)
    }

    /// Number of directory entries of `owner`, pending detachments
    /// included. 0 for unknown owners.
    pub fn component_count(&self, owner: OwnerId) -> usize {
        self.owner(owner).map_or(0, |o| o.directory().len())
    }

    /// Overwrite the `T` record of `destination` with that of `source`.
    pub fn copy<T: Record>(&mut self, source: OwnerId, destination: OwnerId) -> Result<(), StoreError> {
        let key = self.key_of::<T>()?;
        self.copy_key(source, destination, key)
    }

    /// Overwrite the record under `key` of `destination` with that of
    /// `source`, through [`Record::copy_from`].
    pub fn copy_key(
        &mut self,
        source: OwnerId,
        destination: OwnerId,
        key: TypeKey,
    ) -> Result<(), StoreError> {
        self.live_owner(destination)?;
        let from = self.attached_entry(source, key)?;
        let to = self.attached_entry(destination, key)?;
        if from.pool != to.pool {
            return Err(StoreError::PoolMismatch { key, pool: to.pool });
        }
        let pool = &mut self.pools[from.pool.index()];
        let record = pool.record_name();
        let copied = pool
            .copy_raw(from.handle, to.handle)
            .map_err(|source| StoreError::Pool { record, source })?;
        if !copied {
            return Err(StoreError::NotDuplicable { record });
        }
        Ok(())
    }

    /// Create a new owner holding copies of every duplicable record of
    /// `owner`.
    ///
    /// Record types whose [`Record::duplicate`] returns `None` are skipped,
    /// as are records pending detachment.
    pub fn duplicate(&mut self, owner: OwnerId) -> Result<OwnerId, StoreError> {
        let entries = self.owner(owner)?.directory().snapshot();
        let copy = self.create_owner();
        for entry in entries {
            if self.garbage.contains(entry.key, owner) {
                continue;
            }
            let pool = &mut self.pools[entry.pool.index()];
            let record = pool.record_name();
            let duplicated = pool
                .duplicate_raw(entry.handle)
                .map_err(|source| StoreError::Pool { record, source })?;
            match duplicated {
                Some(handle) => self.insert_entry(copy, entry.key, entry.pool, handle)?,
                None => trace!(record, owner = owner.raw(), "skipped non-duplicable record"),
            }
        }
        Ok(copy)
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Number of detachments awaiting reclaim.
    pub fn pending_detachments(&self) -> usize {
        self.garbage.len()
    }

    /// Destroy every detached record in its pool and remove its directory
    /// entry. Returns the number of pairs reclaimed.
    ///
    /// # Panics
    ///
    /// Panics if a detached pair no longer has a directory entry or its
    /// pool refuses the destroy. Both mean the store's bookkeeping was
    /// bypassed, e.g. by destroying an attached record directly.
    pub fn reclaim(&mut self) -> u32 {
        let pairs = self.garbage.take();
        let count = pairs.len() as u32;
        for (key, owner) in pairs {
            let record = self.record_name(key).unwrap_or("<unregistered>");
            let entry = match self.owners.item_mut(owner) {
                Ok(o) => o.directory_mut().remove(key),
                Err(_) => None,
            };
            let Some(entry) = entry else {
                panic!("detached {record} is missing from the directory of owner {owner}");
            };
            if let Err(e) = self.destroy_entry(entry) {
                panic!("reclaiming {record} of owner {owner} failed: {e}");
            }
        }
        if count > 0 {
            debug!(reclaimed = count, "reclaimed detached records");
        }
        count
    }

    /// Tear down destroyed owners, dispose the owner pool, then run a
    /// dispose pass on every record pool.
    pub fn dispose_all(&mut self) -> DisposeReport {
        self.dispose_pass().1
    }

    fn dispose_pass(&mut self) -> (u32, DisposeReport) {
        let owners_disposed = self.teardown_owners();
        self.owners.dispose();
        let mut report = DisposeReport::default();
        for pool in &mut self.pools {
            report.merge(pool.dispose());
        }
        (owners_disposed, report)
    }

    fn teardown_owners(&mut self) -> u32 {
        let doomed: SmallVec<[OwnerId; 8]> = self.owners.garbage().iter().copied().collect();
        for &owner in &doomed {
            self.garbage.forget_owner(owner);
            let entries = match self.owners.item_mut(owner) {
                Ok(o) => o.directory_mut().drain(),
                Err(_) => continue,
            };
            for entry in entries {
                let record = self.pools[entry.pool.index()].record_name();
                if let Err(e) = self.destroy_entry(entry) {
                    panic!("tearing down {record} of owner {owner} failed: {e}");
                }
            }
        }
        doomed.len() as u32
    }

    /// Release the owner's claim on `entry` and mark its record for
    /// destruction.
    fn destroy_entry(&mut self, entry: DirectoryEntry) -> Result<(), PoolError> {
        let pool = &mut self.pools[entry.pool.index()];
        pool.unclaim_raw(entry.handle)?;
        pool.destroy_raw(entry.handle)
    }

    /// Run one reclamation cycle: [`reclaim`](Self::reclaim) then
    /// [`dispose_all`](Self::dispose_all).
    pub fn tick(&mut self) -> TickMetrics {
        let start = Instant::now();
        let reclaimed = self.reclaim();
        let (owners_disposed, report) = self.dispose_pass();
        let metrics = TickMetrics {
            total_us: start.elapsed().as_micros() as u64,
            reclaimed,
            owners_disposed,
            finalized: report.finalized,
            deferred: report.deferred,
        };
        debug!(
            reclaimed,
            owners_disposed,
            finalized = report.finalized,
            deferred = report.deferred,
            total_us = metrics.total_us,
            "store tick"
        );
        metrics
    }

    /// Drop every owner and record, finalizing records that have a
    /// finalizer. Registrations are kept.
    pub fn clear(&mut self) {
        self.garbage.clear();
        ErasedPool::reset(&mut self.owners);
        for pool in &mut self.pools {
            pool.reset();
        }
        debug!(pools = self.pools.len(), "store cleared");
    }

    /// Snapshot of every record pool, in key order.
    pub fn stats(&self) -> Vec<PoolStats> {
        self.pools.iter().map(|p| p.stats()).collect()
    }

    /// Snapshot of the owner pool.
    pub fn owner_stats(&self) -> PoolStats {
        self.owners.stats()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
