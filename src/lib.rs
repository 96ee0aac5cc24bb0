//! id-index: the per-id metadata index of an entity component store.
//!
//! Every component, tag and `(relationship, target)` pair that a table can
//! contain gets one id record. The record caches the id's flags and type
//! info, lists the tables that contain the id, and links concrete pairs to
//! the wildcard records that match them.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: answer "which tables contain id X", including wildcard ids such as
//!   `(Likes, *)` and `(*, Bob)`, in O(1) average time.
//! - Layers:
//!   - RecordStore: arena of records (`SlotMap`) with a dense array tier for
//!     low ids and a `HashTable` tier for high ids and pairs. Records are
//!     addressed by generational `RecordKey`s.
//!   - Wildcard chains: intrusive lists of `RecordKey`s connecting each
//!     concrete `(R, T)` record to `(R, *)` and `(*, T)`.
//!   - TableCache: per-record lists of tables, split into tables with
//!     entities and empty tables.
//!   - IdIndex: creation, claims, destruction and table registration on top
//!     of the layers above, consulting a `Catalog` for entity metadata.
//!
//! Constraints
//! - Single-threaded: every mutation takes `&mut IdIndex`.
//! - Records are created on demand and never claimed by creation.
//! - A record is destroyed when its last claim is released. A claimed
//!   concrete pair holds its wildcard records; destroying a wildcard pair
//!   record destroys the unclaimed records still chained to it.
//! - Freeing a record that still indexes a table is a bug and panics.
//!
//! Identity
//! - Records are keyed by a normalized hash of the id: plain ids lose their
//!   generation and `_` halves of a pair become `*`. `(R, _)` and `(R, *)`
//!   therefore share one record.
//!
//! Ownership
//! - Chains, parents and table caches refer to records and tables by key.
//!   A stale `RecordKey` never resolves, so code holding one across a
//!   release can detect that the record went away.
//! - Tables are owned elsewhere. `release_empty_tables` drives the owner
//!   through the `TableHost` trait and tolerates tables that destroy other
//!   tables while the walk is in progress.
//!
//! Errors
//! - Invalid ids and broken relationship constraints are reported as
//!   `IndexError`. Refcount and cache bookkeeping errors panic.

mod catalog;
mod chain;
mod config;
mod error;
mod flags;
mod id;
mod index;
#[cfg(test)]
mod index_proptest;
mod record;
mod stats;
mod store;
mod table_cache;

pub use catalog::{Catalog, MemoryCatalog, TypeInfo};
pub use chain::ChainIter;
pub use config::{IndexConfig, DEFAULT_LOW_ID_THRESHOLD};
pub use error::{Constraint, IndexError, Result};
pub use flags::{Event, IdFlags, Observed, Traits};
pub use id::{Id, FIRST_BUILTIN};
pub use index::{IdIndex, TableHost};
pub use record::{ChainKind, ChainLink, IdRecord, NameIndex, ReachableCache};
pub use stats::IndexStats;
pub use store::{RecordKey, RecordStore, Tier};
pub use table_cache::{TableCache, TableId, TableRecord};
