//! Core types and traits for loam storage.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! identifiers shared by every other crate in the workspace: typed slot
//! handles, record type keys, pool identifiers, and the [`Record`] trait
//! that stored types implement.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod handle;
pub mod id;
pub mod record;

pub use handle::{Handle, RawHandle};
pub use id::{PoolEpoch, PoolId, TypeKey};
pub use record::{Finalize, Record};
