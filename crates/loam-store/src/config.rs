//! Store configuration.

use loam_pool::PoolConfig;

use crate::error::StoreError;

/// Configuration for a [`Store`](crate::Store).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Starting capacity of the owner pool. Default: 1. Must be a power of
    /// two.
    pub owner_capacity: u32,
    /// Pool configuration used by [`Store::register`](crate::Store::register).
    /// Types registered with
    /// [`register_with`](crate::Store::register_with) override it.
    pub default_pool: PoolConfig,
}

impl StoreConfig {
    /// Default starting capacity of the owner pool.
    pub const DEFAULT_OWNER_CAPACITY: u32 = 1;

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), StoreError> {
        if !self.owner_capacity.is_power_of_two() {
            return Err(StoreError::InvalidConfig {
                reason: format!(
                    "owner_capacity must be a non-zero power of two (got {})",
                    self.owner_capacity
                ),
            });
        }
        self.default_pool
            .validate()
            .map_err(|e| StoreError::InvalidConfig {
                reason: format!("default_pool: {e}"),
            })
    }

    pub(crate) fn owner_pool(&self) -> PoolConfig {
        PoolConfig::with_capacity(self.owner_capacity)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            owner_capacity: Self::DEFAULT_OWNER_CAPACITY,
            default_pool: PoolConfig::default(),
        }
    }
}
