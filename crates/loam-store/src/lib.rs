//! Owners, directories, and deferred destruction for loam pools.
//!
//! The [`Store`] ties typed [`SlabPool`](loam_pool::SlabPool)s together:
//! records are attached to [`Owner`]s through sorted per-owner
//! [`Directory`]s, detached into a [`GarbageSet`], and destroyed at a
//! caller-chosen point by [`Store::tick`].
//!
//! # Architecture
//!
//! ```text
//! Store
//! ├── SlabPool<Owner>              (each Owner holds a Directory)
//! ├── Vec<Box<dyn ErasedPool>>     (one pool per registered TypeKey)
//! ├── IndexMap<TypeId, TypeKey>    (registration order = key order)
//! └── GarbageSet                   ((TypeKey, OwnerId) pending reclaim)
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod directory;
pub mod error;
pub mod garbage;
pub mod metrics;
pub mod owner;
pub mod shared;
pub mod store;

pub use config::StoreConfig;
pub use directory::{Directory, DirectoryEntry, DuplicateKey};
pub use error::StoreError;
pub use garbage::GarbageSet;
pub use metrics::TickMetrics;
pub use owner::{Owner, OwnerId};
pub use shared::SharedStore;
pub use store::Store;
