//! Introspection snapshots for pools.

/// Point-in-time bookkeeping for one pool.
///
/// Consumed by tests and diagnostics; production logic should not branch
/// on these numbers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Name of the record type stored in the pool.
    pub record: &'static str,
    /// Live records: `occupancy - free`.
    pub count: u32,
    /// Highest number of slots ever in use since the last clear.
    pub occupancy: u32,
    /// Slots the block can hold before the next growth.
    pub capacity: u32,
    /// Slots on the free list.
    pub free: u32,
    /// Records marked for destruction but not yet disposed.
    pub garbage: u32,
    /// Structural mutation counter.
    pub version: u64,
}

/// Outcome of one dispose pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisposeReport {
    /// Records whose slots were recycled this pass.
    pub finalized: u32,
    /// Records whose finalizer deferred; they stay in the garbage list.
    pub deferred: u32,
}

impl DisposeReport {
    /// Accumulate another pass into this one.
    pub fn merge(&mut self, other: DisposeReport) {
        self.finalized += other.finalized;
        self.deferred += other.deferred;
    }
}
