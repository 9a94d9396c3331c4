//! Per-type slab pools with deferred destruction.
//!
//! Each [`SlabPool`] stores every record of one type contiguously and hands
//! out stable 1-based [`Handle`](loam_core::Handle)s. Destruction is two
//! phase: `destroy` marks, `dispose` finalizes and recycles.
//!
//! # Architecture
//!
//! ```text
//! SlabPool<T>
//! ├── items: Vec<T>          (contiguous block, doubles on growth)
//! ├── states: Vec<SlotState> (Free / Live / Garbage per slot)
//! ├── free: Vec<Handle<T>>   (LIFO reuse)
//! ├── garbage: Vec<Handle<T>>
//! └── version                (bumped on growth and destroy)
//! ```
//!
//! [`View`]s capture the version and are checked on dereference in debug
//! builds. [`Ref`] adds a shared atomic count on top of a handle.
//! [`ErasedPool`] lets a store drive pools of different types uniformly.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod erased;
pub mod error;
pub mod pool;
pub mod shared;
pub mod stats;
pub mod view;

pub use config::PoolConfig;
pub use erased::ErasedPool;
pub use error::PoolError;
pub use pool::{SlabPool, SlotState};
pub use shared::Ref;
pub use stats::{DisposeReport, PoolStats};
pub use view::View;
