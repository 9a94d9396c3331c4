//! The [`Record`] trait implemented by every stored type.

/// Outcome of a record finalizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finalize {
    /// The record released its resources; the slot may be recycled.
    Done,
    /// The record is not ready yet. The pool keeps it in the garbage list
    /// and retries on the next dispose pass.
    Defer,
}

/// A type that can live in a slab pool.
///
/// `Default` supplies the value a slot holds after its record is disposed,
/// which is also what the raw data block shows for free slots.
///
/// Records fall in two kinds. Finalizing kinds (the default) have
/// [`finalize`](Record::finalize) called once per dispose attempt and may
/// defer. Plain kinds set [`FINALIZES`](Record::FINALIZES) to `false`; their
/// garbage is reset and recycled unconditionally and `finalize` is never
/// called.
pub trait Record: Default + Send + 'static {
    /// Whether this kind has a finalizer.
    const FINALIZES: bool = true;

    /// Human-readable name used in diagnostics and error messages.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Release resources held by the record before its slot is recycled.
    ///
    /// Returning [`Finalize::Defer`] keeps the record alive until the next
    /// dispose pass, e.g. while references it holds are still settling.
    fn finalize(&mut self) -> Finalize {
        Finalize::Done
    }

    /// Produce a copy of this record for another owner.
    ///
    /// Returns `None` for kinds that must not be duplicated. Owner
    /// duplication skips such records; explicit copies fail.
    fn duplicate(&self) -> Option<Self> {
        None
    }

    /// Overwrite this record with the data of `source`.
    ///
    /// Returns `false`, leaving `self` untouched, for kinds that cannot be
    /// duplicated. The default replaces `self` with
    /// [`duplicate`](Record::duplicate); override it to keep fields that
    /// belong to the destination slot.
    fn copy_from(&mut self, source: &Self) -> bool {
        match source.duplicate() {
            Some(copy) => {
                *self = copy;
                true
            }
            None => false,
        }
    }
}
