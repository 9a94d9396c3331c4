//! Pool-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during slab pool operations.
///
/// All variants are usage-contract violations: the pool's state is left
/// untouched when one is returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// The null handle was passed where a live record is required.
    NullHandle,
    /// The handle points past the highest slot the pool has ever used.
    OutOfBounds {
        /// Raw value of the offending handle.
        handle: u32,
        /// The pool's occupancy at the time of the call.
        occupancy: u32,
    },
    /// The handle names a free slot (its record was already disposed).
    NotAllocated {
        /// Raw value of the offending handle.
        handle: u32,
    },
    /// The record was already marked for destruction.
    AlreadyDestroyed {
        /// Raw value of the offending handle.
        handle: u32,
    },
    /// A view was dereferenced after a structural mutation of its pool.
    StaleView {
        /// Pool version captured when the view was issued.
        captured: u64,
        /// Pool version at the time of the dereference.
        current: u64,
    },
    /// A view was dereferenced through a pool other than the one that
    /// issued it, or after that pool was cleared.
    ForeignView {
        /// Epoch of the pool that issued the view.
        issued: u64,
        /// Epoch of the pool it was presented to.
        current: u64,
    },
    /// The record is claimed by an owner and only that owner may end it.
    Claimed {
        /// Raw value of the offending handle.
        handle: u32,
    },
    /// The handle's generation does not match the slot's current generation.
    StaleHandle {
        /// Raw value of the offending handle.
        handle: u32,
        /// Generation carried by the handle.
        handle_generation: u32,
        /// Generation currently stored for the slot.
        slot_generation: u32,
    },
    /// Finalization was requested for a record kind without a finalizer.
    NotFinalizable {
        /// Name of the record type.
        record: &'static str,
    },
    /// Pool configuration failed validation.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullHandle => write!(f, "null handle where a record is required"),
            Self::OutOfBounds { handle, occupancy } => {
                write!(f, "handle {handle} out of bounds (occupancy {occupancy})")
            }
            Self::NotAllocated { handle } => write!(f, "handle {handle} names a free slot"),
            Self::AlreadyDestroyed { handle } => {
                write!(f, "record {handle} is already marked for destruction")
            }
            Self::StaleView { captured, current } => {
                write!(
                    f,
                    "view invalidated by a previous call (captured version {captured}, current {current})"
                )
            }
            Self::ForeignView { issued, current } => {
                write!(
                    f,
                    "view issued by pool epoch {issued} presented to pool epoch {current}"
                )
            }
            Self::Claimed { handle } => write!(f, "record {handle} is claimed by an owner"),
            Self::StaleHandle {
                handle,
                handle_generation,
                slot_generation,
            } => {
                write!(
                    f,
                    "stale handle {handle}: generation {handle_generation}, slot generation {slot_generation}"
                )
            }
            Self::NotFinalizable { record } => {
                write!(f, "record type {record} has no finalizer")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid pool config: {reason}"),
        }
    }
}

impl Error for PoolError {}
