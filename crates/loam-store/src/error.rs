//! Error types for store operations.

use std::error::Error;
use std::fmt;

use loam_core::{PoolId, TypeKey};
use loam_pool::PoolError;

use crate::owner::OwnerId;

/// Errors returned by [`Store`](crate::Store) operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// A pool rejected the operation.
    Pool {
        /// Name of the record type the pool stores.
        record: &'static str,
        /// The underlying pool error.
        source: PoolError,
    },
    /// The record type was never registered.
    UnregisteredRecord {
        /// Name of the record type.
        record: &'static str,
    },
    /// No record type is registered under this key.
    UnknownKey {
        /// The unknown key.
        key: TypeKey,
    },
    /// The record type is already registered.
    AlreadyRegistered {
        /// Name of the record type.
        record: &'static str,
    },
    /// No pool exists with this id.
    UnknownPool {
        /// The unknown pool.
        pool: PoolId,
    },
    /// The pool does not store the record type registered under the key.
    PoolMismatch {
        /// Key the caller attached under.
        key: TypeKey,
        /// Pool the caller named.
        pool: PoolId,
    },
    /// The owner already has a record of this type.
    AlreadyAttached {
        /// Name of the record type.
        record: &'static str,
        /// The owner.
        owner: OwnerId,
    },
    /// The record is already attached to an owner and only that owner may
    /// detach or destroy it.
    AlreadyOwned {
        /// Name of the record type.
        record: &'static str,
        /// Raw value of the record's handle.
        handle: u32,
    },
    /// The owner has no record of this type.
    NotAttached {
        /// Name of the record type.
        record: &'static str,
        /// The owner.
        owner: OwnerId,
    },
    /// The record was already detached and awaits reclaim.
    AlreadyDetached {
        /// Name of the record type.
        record: &'static str,
        /// The owner.
        owner: OwnerId,
    },
    /// The record type does not support copying.
    NotDuplicable {
        /// Name of the record type.
        record: &'static str,
    },
    /// The owner does not exist or has been destroyed.
    UnknownOwner {
        /// The owner.
        owner: OwnerId,
    },
    /// Store configuration failed validation.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pool { record, source } => write!(f, "pool of {record}: {source}"),
            Self::UnregisteredRecord { record } => {
                write!(f, "record type {record} is not registered")
            }
            Self::UnknownKey { key } => write!(f, "no record type registered under key {key}"),
            Self::AlreadyRegistered { record } => {
                write!(f, "record type {record} is already registered")
            }
            Self::UnknownPool { pool } => write!(f, "pool {pool} does not exist"),
            Self::PoolMismatch { key, pool } => {
                write!(f, "pool {pool} does not store the record type of key {key}")
            }
            Self::AlreadyAttached { record, owner } => {
                write!(f, "{record} is already attached to owner {owner}")
            }
            Self::AlreadyOwned { record, handle } => {
                write!(f, "{record} {handle} already belongs to an owner")
            }
            Self::NotAttached { record, owner } => {
                write!(f, "{record} is not attached to owner {owner}")
            }
            Self::AlreadyDetached { record, owner } => {
                write!(f, "{record} was already detached from owner {owner}")
            }
            Self::NotDuplicable { record } => {
                write!(f, "record type {record} cannot be copied")
            }
            Self::UnknownOwner { owner } => write!(f, "owner {owner} does not exist"),
            Self::InvalidConfig { reason } => write!(f, "invalid store config: {reason}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool { source, .. } => Some(source),
            _ => None,
        }
    }
}
