//! Pending detachments.

use std::collections::BTreeSet;

use loam_core::TypeKey;

use crate::owner::OwnerId;

/// Set of `(type key, owner)` pairs detached since the last reclaim.
///
/// Iteration is ordered by key, then owner, so reclaim visits pools in
/// registration order.
#[derive(Clone, Debug, Default)]
pub struct GarbageSet {
    pairs: BTreeSet<(TypeKey, OwnerId)>,
}

impl GarbageSet {
    /// Record a detachment. Returns `false` if the pair was already pending.
    pub fn insert(&mut self, key: TypeKey, owner: OwnerId) -> bool {
        self.pairs.insert((key, owner))
    }

    /// Whether the pair is pending.
    pub fn contains(&self, key: TypeKey, owner: OwnerId) -> bool {
        self.pairs.contains(&(key, owner))
    }

    /// Drop every pending pair for `owner`.
    pub fn forget_owner(&mut self, owner: OwnerId) -> usize {
        let before = self.pairs.len();
        self.pairs.retain(|&(_, o)| o != owner);
        before - self.pairs.len()
    }

    /// Remove and return every pending pair in order.
    pub fn take(&mut self) -> BTreeSet<(TypeKey, OwnerId)> {
        std::mem::take(&mut self.pairs)
    }

    /// Number of pending pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Discard every pending pair.
    pub fn clear(&mut self) {
        self.pairs.clear();
    }
}
