//! Per-owner record directories.
//!
//! A [`Directory`] lists the records attached to one owner as
//! `(type key, pool, handle)` triples, sorted by type key. Lookups binary
//! search; insertion and removal shift later entries. Owners carry a handful
//! of records, so a sorted array beats a map on both memory and lookup.

use std::error::Error;
use std::fmt;

use loam_core::{PoolId, RawHandle, TypeKey};
use smallvec::SmallVec;

/// One record attached to an owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Record type of the attached record.
    pub key: TypeKey,
    /// Pool the record lives in.
    pub pool: PoolId,
    /// Handle of the record in `pool`, type-erased.
    pub handle: RawHandle,
}

/// Inline buffer for copying a directory's entries out before mutating the
/// store.
pub type EntryBuffer = SmallVec<[DirectoryEntry; 8]>;

/// A key was added to a directory that already holds it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuplicateKey(pub TypeKey);

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type key {} is already present", self.0)
    }
}

impl Error for DuplicateKey {}

/// Sorted, unique-keyed list of an owner's records.
///
/// Capacity grows to 1 on first insert and doubles after that; removal
/// never shrinks it.
#[derive(Clone, Debug, Default)]
pub struct Directory {
    entries: Vec<DirectoryEntry>,
    capacity: usize,
}

impl Directory {
    /// An empty directory with no storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, keeping the directory sorted by key.
    pub fn add(&mut self, key: TypeKey, pool: PoolId, handle: RawHandle) -> Result<(), DuplicateKey> {
        let at = match self.position(key) {
            Ok(_) => return Err(DuplicateKey(key)),
            Err(at) => at,
        };
        if self.entries.len() == self.capacity {
            self.capacity = if self.capacity == 0 { 1 } else { self.capacity * 2 };
            self.entries.reserve_exact(self.capacity - self.entries.len());
        }
        self.entries.insert(at, DirectoryEntry { key, pool, handle });
        Ok(())
    }

    /// Look up the entry for `key`.
    pub fn find(&self, key: TypeKey) -> Option<&DirectoryEntry> {
        self.position(key).ok().map(|i| &self.entries[i])
    }

    /// Whether an entry for `key` exists.
    pub fn contains(&self, key: TypeKey) -> bool {
        self.position(key).is_ok()
    }

    /// Remove and return the entry for `key`, compacting later entries.
    pub fn remove(&mut self, key: TypeKey) -> Option<DirectoryEntry> {
        let i = self.position(key).ok()?;
        Some(self.entries.remove(i))
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter()
    }

    /// Copy the entries out, in key order.
    pub fn snapshot(&self) -> EntryBuffer {
        self.entries.iter().copied().collect()
    }

    /// Remove every entry, returning them in key order. Capacity is kept.
    pub fn drain(&mut self) -> EntryBuffer {
        self.entries.drain(..).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries the directory can hold before growing.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn position(&self, key: TypeKey) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&key, |e| e.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_core::Handle;

    fn entry(dir: &mut Directory, key: u32) -> Result<(), DuplicateKey> {
        dir.add(TypeKey(key), PoolId(key), Handle::from_raw(key + 1))
    }

    #[test]
    fn add_keeps_keys_sorted() {
        let mut dir = Directory::new();
        for key in [5, 1, 3, 0, 4] {
            entry(&mut dir, key).unwrap();
        }
        let keys: Vec<u32> = dir.iter().map(|e| e.key.0).collect();
        assert_eq!(keys, vec![0, 1, 3, 4, 5]);
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut dir = Directory::new();
        entry(&mut dir, 2).unwrap();
        assert_eq!(entry(&mut dir, 2), Err(DuplicateKey(TypeKey(2))));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn find_and_remove() {
        let mut dir = Directory::new();
        entry(&mut dir, 1).unwrap();
        entry(&mut dir, 7).unwrap();
        assert_eq!(dir.find(TypeKey(7)).unwrap().handle.raw(), 8);
        assert!(dir.find(TypeKey(3)).is_none());
        let removed = dir.remove(TypeKey(1)).unwrap();
        assert_eq!(removed.pool, PoolId(1));
        assert!(!dir.contains(TypeKey(1)));
        assert!(dir.remove(TypeKey(1)).is_none());
    }

    #[test]
    fn capacity_grows_one_then_doubles_and_never_shrinks() {
        let mut dir = Directory::new();
        assert_eq!(dir.capacity(), 0);
        entry(&mut dir, 0).unwrap();
        assert_eq!(dir.capacity(), 1);
        entry(&mut dir, 1).unwrap();
        assert_eq!(dir.capacity(), 2);
        entry(&mut dir, 2).unwrap();
        assert_eq!(dir.capacity(), 4);
        dir.remove(TypeKey(0));
        dir.remove(TypeKey(1));
        assert_eq!(dir.capacity(), 4);
        let drained = dir.drain();
        assert_eq!(drained.len(), 1);
        assert!(dir.is_empty());
        assert_eq!(dir.capacity(), 4);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        proptest! {
            #[test]
            fn entries_stay_sorted_and_match_model(
                ops in proptest::collection::vec((any::<bool>(), 0u32..16), 0..128),
            ) {
                let mut dir = Directory::new();
                let mut model = BTreeSet::new();
                for (insert, key) in ops {
                    if insert {
                        let added = entry(&mut dir, key).is_ok();
                        prop_assert_eq!(added, model.insert(key));
                    } else {
                        prop_assert_eq!(dir.remove(TypeKey(key)).is_some(), model.remove(&key));
                    }
                    let keys: Vec<u32> = dir.iter().map(|e| e.key.0).collect();
                    let expected: Vec<u32> = model.iter().copied().collect();
                    prop_assert_eq!(keys, expected);
                    prop_assert!(dir.capacity() >= dir.len());
                }
            }
        }
    }
}
