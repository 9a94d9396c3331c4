//! Pool configuration parameters.

use crate::error::PoolError;

/// Configuration for a [`SlabPool`](crate::SlabPool).
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Capacity of a fresh pool, in records. Also the floor `clear()`
    /// shrinks back to.
    ///
    /// Default: 1. Must be a power of two so that doubling growth keeps
    /// capacities aligned to powers of two.
    pub initial_capacity: u32,
}

impl PoolConfig {
    /// Default starting capacity.
    pub const DEFAULT_INITIAL_CAPACITY: u32 = 1;

    /// Create a config with the given starting capacity.
    pub fn with_capacity(initial_capacity: u32) -> Self {
        Self { initial_capacity }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), PoolError> {
        if !self.initial_capacity.is_power_of_two() {
            return Err(PoolError::InvalidConfig {
                reason: format!(
                    "initial_capacity must be a non-zero power of two (got {})",
                    self.initial_capacity
                ),
            });
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_INITIAL_CAPACITY)
    }
}
