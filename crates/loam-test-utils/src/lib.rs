//! Fixture record types for loam development.
//!
//! Provides small [`Record`] implementations covering each record kind the
//! pools distinguish: finalizing ([`Counted`]), finalizing with deferral
//! ([`Deferred`]), plain ([`Plain`]), and non-duplicable ([`Pinned`]).

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;

use loam_core::{Finalize, Record};

/// Finalizing record that decrements a shared counter when finalized.
///
/// Seed `counter` with the number of live records you expect; after every
/// record is disposed it reads zero.
#[derive(Debug, Default)]
pub struct Counted {
    pub id: i32,
    pub some_data: f32,
    pub counter: Option<Arc<AtomicI32>>,
}

impl Counted {
    pub fn new(id: i32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_counter(id: i32, counter: &Arc<AtomicI32>) -> Self {
        Self {
            id,
            counter: Some(Arc::clone(counter)),
            ..Self::default()
        }
    }
}

impl Record for Counted {
    fn type_name() -> &'static str {
        "Counted"
    }

    fn finalize(&mut self) -> Finalize {
        if let Some(counter) = &self.counter {
            counter.fetch_sub(1, Ordering::SeqCst);
        }
        Finalize::Done
    }

    /// Copies data fields only; the counter stays with the original.
    fn duplicate(&self) -> Option<Self> {
        Some(Self {
            id: self.id,
            some_data: self.some_data,
            counter: None,
        })
    }

    /// Keeps the destination's counter so its finalizer still reports.
    fn copy_from(&mut self, source: &Self) -> bool {
        self.id = source.id;
        self.some_data = source.some_data;
        true
    }
}

/// Finalizing record that defers `passes` times before finishing.
#[derive(Debug, Default)]
pub struct Deferred {
    pub passes: u32,
    pub attempts: Option<Arc<AtomicU32>>,
}

impl Deferred {
    pub fn new(passes: u32, attempts: &Arc<AtomicU32>) -> Self {
        Self {
            passes,
            attempts: Some(Arc::clone(attempts)),
        }
    }
}

impl Record for Deferred {
    fn type_name() -> &'static str {
        "Deferred"
    }

    fn finalize(&mut self) -> Finalize {
        if let Some(attempts) = &self.attempts {
            attempts.fetch_add(1, Ordering::SeqCst);
        }
        if self.passes > 0 {
            self.passes -= 1;
            return Finalize::Defer;
        }
        Finalize::Done
    }
}

/// Plain record without a finalizer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Plain {
    pub value: u64,
}

impl Plain {
    pub fn new(value: u64) -> Self {
        Self { value }
    }
}

impl Record for Plain {
    const FINALIZES: bool = false;

    fn type_name() -> &'static str {
        "Plain"
    }

    fn duplicate(&self) -> Option<Self> {
        Some(self.clone())
    }
}

/// Finalizing record that refuses duplication.
#[derive(Debug, Default)]
pub struct Pinned {
    pub tag: u32,
}

impl Record for Pinned {
    fn type_name() -> &'static str {
        "Pinned"
    }
}

/// Shared counter seeded with `value`.
pub fn counter(value: i32) -> Arc<AtomicI32> {
    Arc::new(AtomicI32::new(value))
}

/// Read a shared counter.
pub fn read(counter: &AtomicI32) -> i32 {
    counter.load(Ordering::SeqCst)
}
