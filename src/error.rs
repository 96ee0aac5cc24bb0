//! Recoverable errors surfaced by [`IdIndex::ensure`](crate::IdIndex::ensure).
//!
//! Bookkeeping failures (refcount underflow, freeing a record that still
//! indexes tables, inserting a table twice) are not represented here: they
//! panic, because the index cannot be trusted afterwards.

use thiserror::Error;

use crate::id::Id;

/// Result alias for index operations.
pub type Result<T, E = IndexError> = core::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// Id `0`, or a pair whose relationship is `0`.
    #[error("invalid id {0}")]
    InvalidId(Id),

    /// Creating the record would break a relationship constraint.
    #[error("constraint violated: {0}")]
    ConstraintViolated(#[from] Constraint),
}

/// A relationship constraint checked before a concrete pair is indexed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Constraint {
    /// The relationship restricts targets to children of `parent`.
    #[error("target {target} of {relationship} is not a child of {parent}")]
    NotInParentSet {
        relationship: Id,
        target: Id,
        parent: Id,
    },

    /// `IsA` pointing at an entity that forbids inheritance.
    #[error("cannot inherit from final entity {target}")]
    FinalTarget { target: Id },
}
