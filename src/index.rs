//! IdIndex: the storage context that owns every id record.
//!
//! Records are created by [`IdIndex::ensure`], kept alive by claims
//! ([`IdIndex::claim`]/[`IdIndex::release`]) and by the tables registered in
//! their caches, and destroyed when the last claim goes away. A claimed
//! concrete pair holds one claim on each of its wildcard records, so a
//! wildcard record only reaches zero once none of its chain is claimed.
//! Destroying it then takes the unclaimed chain along.

use hashbrown::HashSet;

use crate::catalog::{Catalog, TypeInfo};
use crate::chain::ChainIter;
use crate::config::IndexConfig;
use crate::error::{Constraint, IndexError, Result};
use crate::flags::{Event, IdFlags, Observed, Traits};
use crate::id::Id;
use crate::record::{ChainKind, IdRecord, NameIndex, ReachableCache};
use crate::stats::IndexStats;
use crate::store::{RecordKey, RecordStore, Tier};
use crate::table_cache::{TableCache, TableId, TableRecord};

/// The table collaborator, as seen by [`IdIndex::release_empty_tables`].
///
/// Tables are refcounted by their owner. A table whose count drops to zero
/// must unregister itself through [`IdIndex::unregister_table`] before
/// `release_table` returns.
pub trait TableHost<C: Catalog> {
    fn claim_table(&mut self, table: TableId);

    fn table_refcount(&self, table: TableId) -> usize;

    fn release_table(&mut self, index: &mut IdIndex<C>, table: TableId);
}

pub struct IdIndex<C> {
    store: RecordStore,
    catalog: C,
    config: IndexConfig,
    stats: IndexStats,
}

impl<C: Catalog + Default> Default for IdIndex<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C: Catalog> IdIndex<C> {
    pub fn new(catalog: C) -> Self {
        Self::with_config(catalog, IndexConfig::default())
    }

    pub fn with_config(catalog: C, config: IndexConfig) -> Self {
        Self {
            store: RecordStore::new(config.low_id_threshold),
            catalog,
            config,
            stats: IndexStats::default(),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut C {
        &mut self.catalog
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The lookup path `id` takes in the record store.
    pub fn tier(&self, id: Id) -> Tier {
        self.store.tier(id.record_hash())
    }

    pub fn get_key(&self, id: Id) -> Option<RecordKey> {
        self.store.find(id.record_hash())
    }

    pub fn get(&self, id: Id) -> Option<&IdRecord> {
        self.get_key(id).and_then(|k| self.store.get(k))
    }

    pub fn record(&self, key: RecordKey) -> Option<&IdRecord> {
        self.store.get(key)
    }

    pub fn records(&self) -> impl Iterator<Item = (RecordKey, &IdRecord)> {
        self.store.iter()
    }

    /// Returns the record for `id`, creating it (and its wildcard records) if needed.
    ///
    /// Creation does not claim the record.
    pub fn ensure(&mut self, id: Id) -> Result<RecordKey> {
        match self.get_key(id) {
            Some(key) => Ok(key),
            None => self.create(id.strip_generation()),
        }
    }

    /// Resolves `id` for querying: union relationships are stored under
    /// `(Union, R)`, so `(R, *)` of a union relationship and any missing
    /// `(R, T)` fall back to that record.
    pub fn query_record(&self, id: Id) -> Option<&IdRecord> {
        let union_of = |rel: Id| self.get(Id::pair(Id::UNION, rel));
        match self.get(id) {
            None if id.is_pair() && id.first() != Id::WILDCARD => union_of(id.first()),
            None => None,
            Some(r)
                if id.is_pair()
                    && id.second() == Id::WILDCARD
                    && r.flags.contains(IdFlags::UNION) =>
            {
                union_of(id.first())
            }
            Some(r) => Some(r),
        }
    }

    fn check_constraints(&self, id: Id) -> Result<(Id, Id)> {
        if id.raw() == 0 {
            return Err(IndexError::InvalidId(id));
        }
        let (rel, tgt) = (id.first(), id.second());
        if rel.raw() == 0 {
            return Err(IndexError::InvalidId(id));
        }
        if !id.is_pair() || tgt.raw() == 0 || tgt.is_wildcard_entity() {
            return Ok((rel, tgt));
        }

        if let Some(parent) = self.catalog.one_of(rel) {
            if !self.catalog.is_child_of(tgt, parent) {
                return Err(Constraint::NotInParentSet {
                    relationship: rel,
                    target: tgt,
                    parent,
                }
                .into());
            }
        }
        if rel == Id::IS_A && self.catalog.traits(tgt).contains(Traits::FINAL) {
            return Err(Constraint::FinalTarget { target: tgt }.into());
        }
        Ok((rel, tgt))
    }

    fn create(&mut self, id: Id) -> Result<RecordKey> {
        let (rel, tgt) = self.check_constraints(id)?;
        let is_wildcard = id.is_wildcard();
        let is_pair = id.is_pair();

        let mut chains = None;
        let mut flags = if is_pair && !is_wildcard {
            let rel_wildcard = self.ensure(Id::pair(rel, Id::WILDCARD))?;
            let tgt_wildcard = self.ensure(Id::pair(Id::WILDCARD, tgt))?;
            chains = Some((rel_wildcard, tgt_wildcard));
            let mut flags = self.store.live(rel_wildcard).flags;
            if rel == Id::UNION {
                flags |= IdFlags::UNION;
            }
            flags
        } else {
            IdFlags::from(self.catalog.traits(rel))
        };

        for (event, flag) in Event::RECORD_FLAGS {
            if self.catalog.has_observer(id, event) {
                flags |= flag;
            }
        }

        let mut type_info = None;
        if !is_wildcard && (is_pair || !id.has_id_flags()) && !flags.contains(IdFlags::TAG) {
            type_info = self.catalog.type_info(rel);
            if type_info.is_none() && tgt.raw() != 0 {
                type_info = self.catalog.type_info(tgt);
            }
        }

        let mut record = IdRecord::new(id);
        record.flags = flags;
        record.type_info = type_info;
        record.parent = chains.map(|(rel_wildcard, _)| rel_wildcard);
        let key = self.store.insert(record);

        if let Some((rel_wildcard, tgt_wildcard)) = chains {
            self.store.chain_link(rel_wildcard, key, ChainKind::First);
            self.store.chain_link(tgt_wildcard, key, ChainKind::Second);
            if flags.contains(IdFlags::ACYCLIC) {
                self.store.chain_link(tgt_wildcard, key, ChainKind::Acyclic);
            }
        }

        if !rel.is_wildcard_entity() {
            self.catalog.mark_observed(rel, Observed::ID);
        }
        if tgt.raw() != 0 && !tgt.is_wildcard_entity() {
            let mut marks = Observed::TARGET;
            if flags.contains(IdFlags::ACYCLIC) {
                marks |= Observed::ACYCLIC;
            }
            self.catalog.mark_observed(tgt, marks);
        }

        self.stats.on_create(id, type_info.is_some());
        tracing::debug!(%id, ?flags, component = type_info.is_some(), "id created");
        Ok(key)
    }

    pub fn refcount(&self, key: RecordKey) -> Option<u32> {
        self.store.get(key).map(|r| r.refcount)
    }

    /// Adds a holder. Panics if `key` is stale.
    pub fn claim(&mut self, key: RecordKey) {
        let record = self.store.live_mut(key);
        record.refcount += 1;
        if record.refcount == 1 {
            for wildcard in self.wildcard_parents(key).into_iter().flatten() {
                self.store.live_mut(wildcard).refcount += 1;
            }
        }
    }

    /// `(R, *)` and `(*, T)` of a concrete pair record.
    fn wildcard_parents(&self, key: RecordKey) -> Option<[RecordKey; 2]> {
        let record = self.store.live(key);
        let id = record.id;
        if !id.is_pair() || id.is_wildcard() {
            return None;
        }
        let rel_wildcard = record.parent.expect("concrete pair has a parent");
        let tgt_wildcard = self
            .get_key(Id::pair(Id::WILDCARD, id.second()))
            .expect("concrete pair has a target wildcard record");
        Some([rel_wildcard, tgt_wildcard])
    }

    /// Drops a holder and returns the remaining count; at zero the record is
    /// destroyed and a concrete pair releases its wildcard records.
    ///
    /// Panics if `key` is stale, if the count is already zero, or if the
    /// record is destroyed while its table cache still holds tables.
    pub fn release(&mut self, key: RecordKey) -> u32 {
        let record = self.store.live_mut(key);
        assert!(
            record.refcount > 0,
            "id record refcount underflow for {}",
            record.id
        );
        record.refcount -= 1;
        let rc = record.refcount;
        if rc == 0 {
            let parents = self.wildcard_parents(key);
            self.destroy(key);
            for wildcard in parents.into_iter().flatten() {
                self.release(wildcard);
            }
        }
        rc
    }

    fn assert_no_tables(record: &IdRecord) {
        assert!(
            record.cache.is_empty(),
            "cannot free id record {} while it indexes {} tables and {} empty tables",
            record.id,
            record.cache.count(),
            record.cache.empty_count()
        );
    }

    fn destroy(&mut self, key: RecordKey) {
        let (id, flags) = {
            let record = self.store.live(key);
            Self::assert_no_tables(record);
            (record.id, record.flags)
        };

        if id.is_pair() && !id.is_wildcard() {
            self.store.chain_unlink(key, ChainKind::First);
            self.store.chain_unlink(key, ChainKind::Second);
            if flags.contains(IdFlags::ACYCLIC) {
                self.store.chain_unlink(key, ChainKind::Acyclic);
            }
        } else if id.is_pair() {
            let kind = if id.first().is_wildcard_entity() {
                ChainKind::Second
            } else {
                ChainKind::First
            };
            let _span = tracing::debug_span!("cascade", %id).entered();
            let mut next = self.store.live(key).link(kind).next;
            while let Some(cur) = next {
                let member = self.store.live(cur);
                assert!(
                    member.refcount == 0,
                    "cannot free {id} while chained record {} holds {} claims",
                    member.id,
                    member.refcount
                );
                Self::assert_no_tables(member);
                next = member.link(kind).next;
                self.destroy(cur);
            }
        }

        let record = self
            .store
            .remove(key)
            .expect("record is live until removed here");
        self.stats.on_delete(id, record.type_info.is_some());
        tracing::debug!(%id, "id deleted");
    }

    /// Attaches or clears component type info; returns whether it changed.
    pub fn set_type_info(&mut self, key: RecordKey, type_info: Option<TypeInfo>) -> bool {
        let record = self.store.live_mut(key);
        let id = record.id;
        let had = record.type_info.is_some();
        let changed = record.type_info != type_info;
        record.type_info = type_info;
        self.stats.on_type_info_change(id, had, type_info.is_some());
        changed
    }

    /// Concrete records chained under a wildcard record.
    pub fn chain(&self, key: RecordKey, kind: ChainKind) -> ChainIter<'_> {
        self.store.chain(key, kind)
    }

    pub fn table_cache(&self, key: RecordKey) -> Option<&TableCache> {
        self.store.get(key).map(|r| &r.cache)
    }

    pub fn get_table_record(&self, table: TableId, id: Id) -> Option<&TableRecord> {
        self.get(id).and_then(|r| r.cache.get(table))
    }

    pub fn table_record(&self, key: RecordKey, table: TableId) -> Option<&TableRecord> {
        self.store.get(key).and_then(|r| r.cache.get(table))
    }

    /// Registers `table`, whose type is `ty`, with every record it contains.
    ///
    /// Each column id gets a record of its own; concrete pairs also register
    /// with `(R, *)` and `(*, T)`, recording the first matching column and the
    /// number of matches. Every touched record is claimed once.
    pub fn register_table(&mut self, table: TableId, ty: &[Id], empty: bool) -> Result<()> {
        let entries = table_ids(ty);
        let mut keys = Vec::with_capacity(entries.len());
        for &(id, _, _) in &entries {
            keys.push(self.ensure(id)?);
        }
        for (key, (_, column, count)) in keys.into_iter().zip(entries) {
            self.claim(key);
            let record = self.store.live_mut(key);
            record.cache.insert(
                TableRecord {
                    table,
                    column,
                    count,
                },
                empty,
            );
            record.reachable.invalidate();
        }
        tracing::trace!(?table, columns = ty.len(), empty, "table registered");
        Ok(())
    }

    /// Reverses [`register_table`](Self::register_table) for a table being destroyed.
    ///
    /// Panics if the table was not registered with type `ty`.
    pub fn unregister_table(&mut self, table: TableId, ty: &[Id]) {
        for (id, _, _) in table_ids(ty) {
            let key = self
                .get_key(id)
                .unwrap_or_else(|| panic!("table {table:?} unregistered for unknown id {id}"));
            let record = self.store.live_mut(key);
            assert!(
                record.cache.remove(table).is_some(),
                "table {table:?} is not registered for {id}"
            );
            record.reachable.invalidate();
            self.release(key);
        }
        tracing::trace!(?table, "table unregistered");
    }

    /// Moves `table` between the empty and non-empty partitions of every
    /// record it is registered with. Returns the number of records updated.
    ///
    /// Panics if the table was not registered with type `ty`.
    pub fn set_table_empty(&mut self, table: TableId, ty: &[Id], empty: bool) -> usize {
        let mut moved = 0;
        for (id, _, _) in table_ids(ty) {
            let key = self
                .get_key(id)
                .unwrap_or_else(|| panic!("table {table:?} moved for unknown id {id}"));
            let cache = &mut self.store.live_mut(key).cache;
            assert!(cache.contains(table), "table {table:?} is not registered for {id}");
            if cache.set_empty(table, empty) {
                moved += 1;
            }
        }
        moved
    }

    /// Releases every empty table cached by `key`; returns how many were released.
    ///
    /// Releasing one table can release others that it held claims on. The
    /// walk therefore claims the next table before releasing the current one;
    /// if that claim turns out to be the last reference, the next table is
    /// already on its way out and the walk steps over it. If the cursor is
    /// still invalidated, the walk resumes at the first empty table it has
    /// not released yet.
    ///
    /// Panics if the record still indexes tables with entities.
    pub fn release_empty_tables<H: TableHost<C>>(&mut self, key: RecordKey, host: &mut H) -> usize {
        let record = self.store.live(key);
        let id = record.id;
        assert_eq!(
            record.cache.count(),
            0,
            "cannot release empty tables of {id} while it indexes tables with entities"
        );
        let _span = tracing::debug_span!("release_empty_tables", %id).entered();
        self.claim(key);

        let mut released: HashSet<TableId> = HashSet::new();
        let mut cursor = self.store.live(key).cache.first_empty();
        loop {
            let Some(record) = self.store.get(key) else {
                tracing::debug!(%id, "record destroyed during release");
                break;
            };
            let cache = &record.cache;
            let current = match cursor {
                Some(t) if cache.is_table_empty(t) == Some(true) && !released.contains(&t) => t,
                _ => match cache
                    .iter_empty()
                    .map(|r| r.table)
                    .find(|t| !released.contains(t))
                {
                    Some(t) => t,
                    None => break,
                },
            };
            let next = next_unreleased(cache, current, &released);

            if let Some(n) = next {
                host.claim_table(n);
            }
            released.insert(current);
            host.release_table(self, current);

            cursor = next;
            if let Some(n) = next {
                if host.table_refcount(n) == 1 {
                    released.insert(n);
                    cursor = self
                        .store
                        .get(key)
                        .and_then(|r| next_unreleased(&r.cache, n, &released));
                }
                host.release_table(self, n);
            }
        }

        if self.store.contains(key) {
            self.release(key);
        }
        tracing::debug!(%id, tables = released.len(), "released empty tables");
        released.len()
    }

    /// Name index of `key`, created on first use.
    pub fn name_index_ensure(&mut self, key: RecordKey) -> &mut NameIndex {
        self.store
            .live_mut(key)
            .name_index
            .get_or_insert_with(NameIndex::default)
    }

    pub fn name_index(&self, id: Id) -> Option<&NameIndex> {
        self.get(id).and_then(|r| r.name_index.as_ref())
    }

    pub fn reachable_mut(&mut self, key: RecordKey) -> &mut ReachableCache {
        &mut self.store.live_mut(key).reachable
    }

    /// Destroys every record, regardless of claims.
    ///
    /// Concrete pairs go first so that no wildcard chain is left holding a
    /// claimed record. Panics if any record still indexes a table.
    pub fn clear(&mut self) {
        let concrete: Vec<RecordKey> = self
            .store
            .iter()
            .filter(|(_, r)| r.id.is_pair() && !r.id.is_wildcard())
            .map(|(k, _)| k)
            .collect();
        for key in concrete {
            self.destroy(key);
        }
        let rest: Vec<RecordKey> = self.store.keys().collect();
        for key in rest {
            self.destroy(key);
        }
    }
}

fn next_unreleased(cache: &TableCache, from: TableId, released: &HashSet<TableId>) -> Option<TableId> {
    let mut next = cache.next_in_partition(from);
    while let Some(t) = next {
        if !released.contains(&t) {
            return Some(t);
        }
        next = cache.next_in_partition(t);
    }
    None
}

/// Ids a table with type `ty` registers under: `(id, first column, count)`.
fn table_ids(ty: &[Id]) -> Vec<(Id, usize, usize)> {
    let mut out: Vec<(Id, usize, usize)> = ty
        .iter()
        .enumerate()
        .map(|(column, &id)| (id.strip_generation(), column, 1))
        .collect();

    let mut wildcards: Vec<(Id, usize, usize)> = Vec::new();
    for (column, &id) in ty.iter().enumerate() {
        if !id.is_pair() || id.is_wildcard() {
            continue;
        }
        for w in [
            Id::pair(id.first(), Id::WILDCARD),
            Id::pair(Id::WILDCARD, id.second()),
        ] {
            match wildcards.iter_mut().find(|e| e.0 == w) {
                Some(e) => e.2 += 1,
                None => wildcards.push((w, column, 1)),
            }
        }
    }
    wildcards.retain(|w| !out.iter().any(|e| e.0.record_hash() == w.0));
    out.extend(wildcards);
    out
}
