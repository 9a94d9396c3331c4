//! Owners: the records that other records are attached to.

use loam_core::{Handle, Record};

use crate::directory::Directory;

/// Handle of an owner in the store's owner pool.
pub type OwnerId = Handle<Owner>;

/// A record that owns other records through its [`Directory`].
///
/// Owners live in their own slab pool inside the store. The store tears
/// down an owner's directory before the owner pool disposes it, so the
/// owner itself has nothing to finalize.
#[derive(Debug, Default)]
pub struct Owner {
    directory: Directory,
}

impl Owner {
    /// The records attached to this owner.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub(crate) fn directory_mut(&mut self) -> &mut Directory {
        &mut self.directory
    }
}

impl Record for Owner {
    const FINALIZES: bool = false;

    fn type_name() -> &'static str {
        "Owner"
    }
}
