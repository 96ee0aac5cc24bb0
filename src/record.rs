//! The per-id metadata node.

use hashbrown::HashMap;

use crate::catalog::TypeInfo;
use crate::flags::IdFlags;
use crate::id::Id;
use crate::store::RecordKey;
use crate::table_cache::TableCache;

/// Which wildcard list a [`ChainLink`] belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChainKind {
    /// Concrete `(R, T)` records under `(R, *)`.
    First,
    /// Concrete `(R, T)` records under `(*, T)`.
    Second,
    /// The subset of `Second` whose relationship is acyclic.
    Acyclic,
}

/// Neighbors of a record in one wildcard list.
///
/// On the wildcard record itself the slot of the matching kind is the list
/// head: only `next` is used and it points at the first member.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainLink {
    pub prev: Option<RecordKey>,
    pub next: Option<RecordKey>,
}

/// Entity names scoped to one id, e.g. children of a parent by name.
pub type NameIndex = HashMap<Box<str>, Id>;

/// Reachability results cached by traversal code.
///
/// The index owns the storage and drops it with the record; the contents are
/// managed by whoever performs the traversal.
#[derive(Debug, Default)]
pub struct ReachableCache {
    generation: u64,
    entries: Vec<(Id, Id)>,
}

impl ReachableCache {
    /// Bumped on every invalidation; compare to detect stale results.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn entries(&self) -> &[(Id, Id)] {
        &self.entries
    }

    pub fn push(&mut self, source: Id, reached: Id) {
        self.entries.push((source, reached));
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
        self.generation = self.generation.wrapping_add(1);
    }
}

#[derive(Debug)]
pub struct IdRecord {
    pub(crate) id: Id,
    pub(crate) hash: Id,
    pub(crate) refcount: u32,
    pub(crate) flags: IdFlags,
    pub(crate) type_info: Option<TypeInfo>,
    pub(crate) parent: Option<RecordKey>,
    pub(crate) first: ChainLink,
    pub(crate) second: ChainLink,
    pub(crate) acyclic: ChainLink,
    pub(crate) cache: TableCache,
    pub(crate) name_index: Option<NameIndex>,
    pub(crate) reachable: ReachableCache,
}

impl IdRecord {
    pub(crate) fn new(id: Id) -> Self {
        Self {
            id,
            hash: id.record_hash(),
            refcount: 0,
            flags: IdFlags::empty(),
            type_info: None,
            parent: None,
            first: ChainLink::default(),
            second: ChainLink::default(),
            acyclic: ChainLink::default(),
            cache: TableCache::new(),
            name_index: None,
            reachable: ReachableCache::default(),
        }
    }

    /// The id as it was first ensured; may contain `_` halves.
    pub fn id(&self) -> Id {
        self.id
    }

    /// The normalized key this record is stored under.
    pub fn hash(&self) -> Id {
        self.hash
    }

    pub fn refcount(&self) -> u32 {
        self.refcount
    }

    pub fn flags(&self) -> IdFlags {
        self.flags
    }

    pub fn type_info(&self) -> Option<&TypeInfo> {
        self.type_info.as_ref()
    }

    /// For a concrete pair `(R, T)`, the `(R, *)` record.
    pub fn parent(&self) -> Option<RecordKey> {
        self.parent
    }

    pub fn table_cache(&self) -> &TableCache {
        &self.cache
    }

    pub fn name_index(&self) -> Option<&NameIndex> {
        self.name_index.as_ref()
    }

    pub fn reachable(&self) -> &ReachableCache {
        &self.reachable
    }

    pub fn link(&self, kind: ChainKind) -> &ChainLink {
        match kind {
            ChainKind::First => &self.first,
            ChainKind::Second => &self.second,
            ChainKind::Acyclic => &self.acyclic,
        }
    }

    pub(crate) fn link_mut(&mut self, kind: ChainKind) -> &mut ChainLink {
        match kind {
            ChainKind::First => &mut self.first,
            ChainKind::Second => &mut self.second,
            ChainKind::Acyclic => &mut self.acyclic,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.id.is_wildcard()
    }
}
