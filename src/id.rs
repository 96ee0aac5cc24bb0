//! Identifier encoding and the hash used to key id records.
//!
//! An [`Id`] is either a plain entity reference or a `(relationship, target)`
//! pair. Plain ids carry a generation in bits 32..48 and optional id flags in
//! the top byte. Pairs set the `PAIR` bit and pack the relationship index in
//! bits 32..56 and the target index in the low 32 bits, so pairs never carry
//! generations.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const ENTITY_MASK: u64 = 0xFFFF_FFFF;
const GENERATION_MASK: u64 = 0xFFFF << 32;
const ID_FLAGS_MASK: u64 = 0xFF << 56;
const PAIR_FIRST_MASK: u64 = 0x00FF_FFFF;
const PAIR_FLAG: u64 = 1 << 63;

/// First index reserved for built-in entities.
pub const FIRST_BUILTIN: u64 = 256;

/// A 64-bit component, tag or relationship identifier.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Id(u64);

impl Id {
    /// Matches any concrete value in the position it occupies.
    pub const WILDCARD: Id = Id(FIRST_BUILTIN);
    /// Hashes like [`Id::WILDCARD`] but is kept verbatim on the record.
    pub const ANY: Id = Id(FIRST_BUILTIN + 1);
    /// Inheritance relationship; its targets must not be final.
    pub const IS_A: Id = Id(FIRST_BUILTIN + 2);
    /// Hierarchy relationship, consulted for restricted parent sets.
    pub const CHILD_OF: Id = Id(FIRST_BUILTIN + 3);
    /// Relationship whose pairs are flagged as union pairs.
    pub const UNION: Id = Id(FIRST_BUILTIN + 4);

    /// The id flag marking a pair.
    pub const PAIR: u64 = PAIR_FLAG;

    /// A plain id for entity `index` with generation zero.
    pub const fn new(index: u32) -> Self {
        Id(index as u64)
    }

    pub const fn from_raw(raw: u64) -> Self {
        Id(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Builds a `(first, second)` pair from the entity indices of both halves.
    pub const fn pair(first: Id, second: Id) -> Self {
        let first = first.0 & ENTITY_MASK & PAIR_FIRST_MASK;
        let second = second.0 & ENTITY_MASK;
        Id(PAIR_FLAG | (first << 32) | second)
    }

    pub const fn is_pair(self) -> bool {
        self.0 & PAIR_FLAG != 0
    }

    /// True when any id flag (including `PAIR`) is set.
    pub const fn has_id_flags(self) -> bool {
        self.0 & ID_FLAGS_MASK != 0
    }

    /// Relationship half of a pair, or the entity itself for a plain id.
    pub const fn first(self) -> Id {
        if self.is_pair() {
            Id((self.0 >> 32) & PAIR_FIRST_MASK)
        } else {
            Id(self.0 & ENTITY_MASK)
        }
    }

    /// Target half of a pair; `Id(0)` for a plain id.
    pub const fn second(self) -> Id {
        if self.is_pair() {
            Id(self.0 & ENTITY_MASK)
        } else {
            Id(0)
        }
    }

    pub const fn generation(self) -> u16 {
        if self.has_id_flags() {
            0
        } else {
            ((self.0 & GENERATION_MASK) >> 32) as u16
        }
    }

    /// Returns this plain id with its generation replaced. Pairs are returned unchanged.
    pub const fn with_generation(self, generation: u16) -> Self {
        if self.has_id_flags() {
            self
        } else {
            Id((self.0 & !GENERATION_MASK) | ((generation as u64) << 32))
        }
    }

    /// Clears the generation bits of a plain id.
    pub const fn strip_generation(self) -> Self {
        if self.has_id_flags() {
            self
        } else {
            Id(self.0 & !GENERATION_MASK)
        }
    }

    /// True for `*` and `_` themselves.
    pub const fn is_wildcard_entity(self) -> bool {
        self.0 == Self::WILDCARD.0 || self.0 == Self::ANY.0
    }

    /// True if the id itself, or either half of a pair, is `*` or `_`.
    pub const fn is_wildcard(self) -> bool {
        if self.is_pair() {
            self.first().is_wildcard_entity() || self.second().is_wildcard_entity()
        } else {
            self.is_wildcard_entity()
        }
    }

    /// Key under which the id record for `self` is stored.
    ///
    /// Generations are dropped from plain ids and `_` halves of a pair map to
    /// `*`, so `(R, _)` and `(R, *)` share one record.
    pub const fn record_hash(self) -> Id {
        let id = self.strip_generation();
        if !id.is_pair() {
            return id;
        }
        let mut first = id.first();
        let mut second = id.second();
        if first.0 == Self::ANY.0 {
            first = Self::WILDCARD;
        }
        if second.0 == Self::ANY.0 {
            second = Self::WILDCARD;
        }
        Id::pair(first, second)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn fmt_entity(id: Id, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match id {
        Id::WILDCARD => f.write_str("*"),
        Id::ANY => f.write_str("_"),
        Id::IS_A => f.write_str("IsA"),
        Id::CHILD_OF => f.write_str("ChildOf"),
        Id::UNION => f.write_str("Union"),
        other => write!(f, "#{}", other.0 & ENTITY_MASK),
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pair() {
            f.write_str("(")?;
            fmt_entity(self.first(), f)?;
            f.write_str(", ")?;
            fmt_entity(self.second(), f)?;
            f.write_str(")")
        } else if self.has_id_flags() {
            write!(f, "{:#x}", self.0)
        } else {
            fmt_entity(self.strip_generation(), f)?;
            match self.generation() {
                0 => Ok(()),
                g => write!(f, "v{g}"),
            }
        }
    }
}
