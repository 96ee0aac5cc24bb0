//! Bitsets cached on records and exchanged with the catalog.

use bitflags::bitflags;

bitflags! {
    /// Properties of an id record, computed once when the record is created.
    #[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct IdFlags: u32 {
        /// The id carries no data.
        const TAG          = 1 << 0;
        /// The relationship is traversable (no cycles).
        const ACYCLIC      = 1 << 1;
        /// Union relationship, or a pair of the union relationship.
        const UNION        = 1 << 2;
        const HAS_ON_ADD    = 1 << 3;
        const HAS_ON_REMOVE = 1 << 4;
        const HAS_ON_SET    = 1 << 5;
        const HAS_UN_SET    = 1 << 6;
    }
}

bitflags! {
    /// Traits declared on an entity that shape the records it takes part in.
    #[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Traits: u32 {
        const TAG     = 1 << 0;
        const ACYCLIC = 1 << 1;
        /// Cannot be the target of `IsA`.
        const FINAL   = 1 << 2;
        /// Relationship with at most one target per entity, stored as `(Union, R)`.
        const UNION   = 1 << 3;
    }
}

bitflags! {
    /// Markers placed on entities that are used inside ids.
    ///
    /// The delete policy reads these to decide whether deleting an entity must
    /// first clean up the tables that reference it.
    #[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Observed: u32 {
        /// Used as a component or as the relationship of a pair.
        const ID      = 1 << 0;
        /// Used as the target of a pair.
        const TARGET  = 1 << 1;
        /// Target of an acyclic relationship.
        const ACYCLIC = 1 << 2;
    }
}

bitflags! {
    /// Observer events checked when a record is created.
    #[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
    pub struct Event: u32 {
        const ON_ADD    = 1 << 0;
        const ON_REMOVE = 1 << 1;
        const ON_SET    = 1 << 2;
        const UN_SET    = 1 << 3;
    }
}

impl Event {
    /// Each single event paired with the record flag it sets.
    pub(crate) const RECORD_FLAGS: [(Event, IdFlags); 4] = [
        (Event::ON_ADD, IdFlags::HAS_ON_ADD),
        (Event::ON_REMOVE, IdFlags::HAS_ON_REMOVE),
        (Event::ON_SET, IdFlags::HAS_ON_SET),
        (Event::UN_SET, IdFlags::HAS_UN_SET),
    ];
}

impl From<Traits> for IdFlags {
    fn from(traits: Traits) -> Self {
        let mut flags = IdFlags::empty();
        flags.set(IdFlags::TAG, traits.contains(Traits::TAG));
        flags.set(IdFlags::ACYCLIC, traits.contains(Traits::ACYCLIC));
        flags.set(IdFlags::UNION, traits.contains(Traits::UNION));
        flags
    }
}
