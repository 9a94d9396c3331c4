//! Strongly-typed identifiers for record types and pools.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a registered record type.
///
/// Keys are assigned sequentially at registration, so `TypeKey(n)` is the
/// n-th record type registered with a store. Sequential keys give owner
/// directories and the garbage set an ordering that is identical across
/// runs, unlike `TypeId`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(pub u32);

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TypeKey {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a pool owned by a store.
///
/// Directory entries name the pool that owns a record by `PoolId` rather
/// than by reference, so directories never borrow from the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub u32);

impl PoolId {
    /// Position of this pool in the store's pool table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PoolId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Counter for unique [`PoolEpoch`] allocation.
static POOL_EPOCH_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies one lifetime of one pool.
///
/// A pool takes a fresh epoch when it is built and again every time it is
/// cleared. Views carry the epoch of the pool that issued them, so a view
/// is recognised as foreign when presented to a different pool, or to the
/// same pool after a clear reset its version counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolEpoch(u64);

impl PoolEpoch {
    /// Allocate an epoch no earlier call in this process has returned.
    pub fn next() -> Self {
        Self(POOL_EPOCH_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PoolEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
