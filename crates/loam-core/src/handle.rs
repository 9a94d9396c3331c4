//! Typed slot handles.
//!
//! A [`Handle`] names a slot in the pool that issued it. The raw value is the
//! slot index plus one, so zero is free to serve as the null sentinel. Handles
//! never point at memory: they stay valid when the pool reallocates its block
//! and are only meaningful when passed back to the issuing pool.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Stable identifier for a record of type `T` in a slab pool.
///
/// `Handle` is `Copy` and four bytes wide (eight with the
/// `generation-tracking` feature). Equality, ordering, and hashing consider
/// only the slot index, so a handle compares equal to a reissued handle for
/// the same slot.
#[must_use]
pub struct Handle<T> {
    raw: u32,
    #[cfg(feature = "generation-tracking")]
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

/// A handle with its record type erased.
///
/// Owner directories store handles of many record kinds side by side; they
/// keep them erased and re-type them at the pool boundary.
pub type RawHandle = Handle<()>;

impl<T> Handle<T> {
    /// The null handle. Refers to no record.
    pub const NULL: Self = Self {
        raw: 0,
        #[cfg(feature = "generation-tracking")]
        generation: 0,
        _marker: PhantomData,
    };

    /// Build a handle from its raw value (slot index + 1).
    ///
    /// Handles built this way carry generation 0 and are exempt from
    /// generation checks.
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            raw,
            #[cfg(feature = "generation-tracking")]
            generation: 0,
            _marker: PhantomData,
        }
    }

    /// Build a handle stamped with the slot generation it was issued for.
    #[cfg(feature = "generation-tracking")]
    pub const fn with_generation(raw: u32, generation: u32) -> Self {
        Self {
            raw,
            generation,
            _marker: PhantomData,
        }
    }

    /// The raw value: slot index + 1, or 0 for null.
    pub const fn raw(self) -> u32 {
        self.raw
    }

    /// Zero-based slot index, or `None` for the null handle.
    pub const fn slot(self) -> Option<usize> {
        if self.raw == 0 {
            None
        } else {
            Some(self.raw as usize - 1)
        }
    }

    /// Whether this is the null handle.
    pub const fn is_null(self) -> bool {
        self.raw == 0
    }

    /// Slot generation captured when the handle was issued.
    ///
    /// Always 0 unless the `generation-tracking` feature is enabled.
    pub const fn generation(self) -> u32 {
        #[cfg(feature = "generation-tracking")]
        {
            self.generation
        }
        #[cfg(not(feature = "generation-tracking"))]
        {
            0
        }
    }

    /// Reinterpret this handle as a handle for another record type.
    ///
    /// The index and generation are preserved. The result is only meaningful
    /// for a pool that actually stores `U` at this slot.
    pub const fn cast<U>(self) -> Handle<U> {
        Handle {
            raw: self.raw,
            #[cfg(feature = "generation-tracking")]
            generation: self.generation,
            _marker: PhantomData,
        }
    }

    /// Erase the record type.
    pub const fn erase(self) -> RawHandle {
        self.cast()
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "Handle(null)");
        }
        #[cfg(feature = "generation-tracking")]
        {
            write!(f, "Handle({}, gen={})", self.raw, self.generation)
        }
        #[cfg(not(feature = "generation-tracking"))]
        {
            write!(f, "Handle({})", self.raw)
        }
    }
}

impl<T> fmt::Display for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
