//! Benchmark fixtures for loam storage.
//!
//! - [`populated_pool`]: a pool of `n` plain records
//! - [`populated_store`]: a store with `n` owners, each carrying one record
//!   of every fixture kind

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use loam_core::Handle;
use loam_pool::SlabPool;
use loam_store::{OwnerId, Store};
use loam_test_utils::{Counted, Plain};

/// Build a pool holding `n` plain records with values `0..n`.
pub fn populated_pool(n: u32) -> (SlabPool<Plain>, Vec<Handle<Plain>>) {
    let mut pool = SlabPool::new();
    let handles = (0..n).map(|i| pool.create(Plain::new(u64::from(i)))).collect();
    (pool, handles)
}

/// Build a store with `n` owners, each with a `Counted` and a `Plain`.
pub fn populated_store(n: u32) -> (Store, Vec<OwnerId>) {
    let mut store = Store::new();
    store.register::<Counted>().unwrap();
    store.register::<Plain>().unwrap();
    let owners = (0..n)
        .map(|i| {
            let owner = store.create_owner();
            store.attach(owner, Counted::new(i as i32)).unwrap();
            store.attach(owner, Plain::new(u64::from(i))).unwrap();
            owner
        })
        .collect();
    (store, owners)
}
