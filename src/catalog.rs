//! Collaborators consulted while records are created.
//!
//! The index does not own entities, component metadata or observers. It asks a
//! [`Catalog`] about them exactly once per record, when the record is created,
//! and writes back the [`Observed`] markers that the delete policy relies on.

use hashbrown::{HashMap, HashSet};

use crate::flags::{Event, Observed, Traits};
use crate::id::Id;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Size and alignment of a registered component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypeInfo {
    pub component: Id,
    pub size: usize,
    pub alignment: usize,
}

impl TypeInfo {
    pub fn new(component: Id, size: usize, alignment: usize) -> Self {
        Self {
            component,
            size,
            alignment,
        }
    }

    /// Type info for a Rust type.
    pub fn of<T>(component: Id) -> Self {
        Self::new(component, core::mem::size_of::<T>(), core::mem::align_of::<T>())
    }
}

/// Entity, component and observer metadata owned outside the index.
pub trait Catalog {
    /// Registered component type of `entity`, or `None` if it is a tag.
    fn type_info(&self, entity: Id) -> Option<TypeInfo>;

    /// Whether an observer for `event` is registered for exactly `id`.
    fn has_observer(&self, id: Id, event: Event) -> bool;

    fn traits(&self, entity: Id) -> Traits;

    /// Parent whose children are the only valid targets of `relationship`.
    fn one_of(&self, relationship: Id) -> Option<Id>;

    fn is_child_of(&self, entity: Id, parent: Id) -> bool;

    /// Adds `marks` to the markers of `entity`.
    fn mark_observed(&mut self, entity: Id, marks: Observed);

    fn observed(&self, entity: Id) -> Observed;
}

/// Hash-map backed [`Catalog`].
#[derive(Debug, Default, Clone)]
pub struct MemoryCatalog {
    type_infos: HashMap<Id, TypeInfo>,
    observers: HashSet<(Id, Event)>,
    traits: HashMap<Id, Traits>,
    one_of: HashMap<Id, Id>,
    parents: HashMap<Id, Id>,
    observed: HashMap<Id, Observed>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_type_info(&mut self, info: TypeInfo) {
        self.type_infos.insert(info.component.strip_generation(), info);
    }

    pub fn remove_type_info(&mut self, component: Id) -> Option<TypeInfo> {
        self.type_infos.remove(&component.strip_generation())
    }

    /// Registers an observer for every event in `events`.
    pub fn add_observer(&mut self, id: Id, events: Event) {
        for event in events.iter() {
            self.observers.insert((id, event));
        }
    }

    pub fn add_traits(&mut self, entity: Id, traits: Traits) {
        *self.traits.entry(entity.strip_generation()).or_default() |= traits;
    }

    pub fn set_one_of(&mut self, relationship: Id, parent: Id) {
        self.one_of.insert(relationship.strip_generation(), parent);
    }

    pub fn set_parent(&mut self, child: Id, parent: Id) {
        self.parents.insert(child.strip_generation(), parent);
    }
}

impl Catalog for MemoryCatalog {
    fn type_info(&self, entity: Id) -> Option<TypeInfo> {
        self.type_infos.get(&entity.strip_generation()).copied()
    }

    fn has_observer(&self, id: Id, event: Event) -> bool {
        self.observers.contains(&(id, event))
    }

    fn traits(&self, entity: Id) -> Traits {
        self.traits
            .get(&entity.strip_generation())
            .copied()
            .unwrap_or_default()
    }

    fn one_of(&self, relationship: Id) -> Option<Id> {
        self.one_of.get(&relationship.strip_generation()).copied()
    }

    fn is_child_of(&self, entity: Id, parent: Id) -> bool {
        self.parents.get(&entity.strip_generation()) == Some(&parent)
    }

    fn mark_observed(&mut self, entity: Id, marks: Observed) {
        *self.observed.entry(entity.strip_generation()).or_default() |= marks;
    }

    fn observed(&self, entity: Id) -> Observed {
        self.observed
            .get(&entity.strip_generation())
            .copied()
            .unwrap_or_default()
    }
}
