//! Per-tick reclamation metrics.
//!
//! [`TickMetrics`] summarizes one [`Store::tick`](crate::Store::tick): how
//! many detachments were reclaimed, how many owners were torn down, and
//! what the dispose pass did.

/// Counters collected during a single tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickMetrics {
    /// Wall-clock time for the entire tick, in microseconds.
    pub total_us: u64,
    /// Detached `(type key, owner)` pairs destroyed by reclaim.
    pub reclaimed: u32,
    /// Destroyed owners whose directories were torn down.
    pub owners_disposed: u32,
    /// Records whose slots were recycled across all record pools.
    pub finalized: u32,
    /// Records whose finalizer deferred; they are retried next tick.
    pub deferred: u32,
}
