//! Loam: slab-backed record storage with stable handles and deferred
//! destruction.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all loam sub-crates. For most users, adding `loam` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use loam::prelude::*;
//!
//! #[derive(Default)]
//! struct Health {
//!     points: u32,
//! }
//!
//! impl Record for Health {
//!     fn type_name() -> &'static str {
//!         "Health"
//!     }
//! }
//!
//! let mut store = Store::new();
//! store.register::<Health>().unwrap();
//!
//! let player = store.create_owner();
//! store.attach(player, Health { points: 10 }).unwrap();
//! store.component_mut::<Health>(player).unwrap().points -= 3;
//! assert_eq!(store.component::<Health>(player).unwrap().points, 7);
//!
//! // Detached records read as absent but stay allocated until the tick.
//! store.detach::<Health>(player).unwrap();
//! assert!(!store.has::<Health>(player));
//!
//! let metrics = store.tick();
//! assert_eq!(metrics.reclaimed, 1);
//! assert_eq!(metrics.finalized, 1);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `loam-core` | Handles, ids, the `Record` trait |
//! | [`pool`] | `loam-pool` | Slab pools, views, shared refs |
//! | [`store`] | `loam-store` | Owners, directories, the `Store` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Handles, identifiers, and the record trait (`loam-core`).
pub use loam_core as types;

/// Per-type slab pools (`loam-pool`).
///
/// Use [`pool::SlabPool`] directly when records need no owner.
pub use loam_pool as pool;

/// Owners and the deferred-destruction coordinator (`loam-store`).
pub use loam_store as store;

/// Common imports for typical loam usage.
///
/// ```rust
/// use loam::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use loam_core::{Finalize, Handle, PoolEpoch, PoolId, RawHandle, Record, TypeKey};

    // Pools
    pub use loam_pool::{PoolConfig, PoolError, Ref, SlabPool, View};

    // Store
    pub use loam_store::{OwnerId, SharedStore, Store, StoreConfig, StoreError, TickMetrics};
}
