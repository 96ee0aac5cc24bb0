#![cfg(test)]

// Property tests for IdIndex kept inside the crate so the model can compare
// against record internals without widening the public API.

use crate::catalog::MemoryCatalog;
use crate::id::Id;
use crate::index::IdIndex;
use crate::record::ChainKind;
use crate::table_cache::TableId;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const RELS: [u32; 2] = [600, 601];
const TGTS: [u32; 3] = [700, 701, 702];
const PLAIN: [u32; 3] = [10, 11, 5000];

// Pool-indexed ids so shrinking moves towards the first entries.
fn pool() -> Vec<Id> {
    let mut ids: Vec<Id> = PLAIN.iter().map(|&e| Id::new(e)).collect();
    for &r in &RELS {
        for &t in &TGTS {
            ids.push(Id::pair(Id::new(r), Id::new(t)));
        }
        ids.push(Id::pair(Id::new(r), Id::WILDCARD));
    }
    for &t in &TGTS {
        ids.push(Id::pair(Id::WILDCARD, Id::new(t)));
    }
    ids
}

#[derive(Clone, Debug)]
enum Op {
    Ensure(usize),
    Claim(usize),
    Release(usize),
    Register(u8, Vec<usize>, bool),
    Unregister(u8),
    SetEmpty(u8, bool),
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let n = pool().len();
    let idx = 0..n;
    let table = 0u8..4;
    let op = prop_oneof![
        idx.clone().prop_map(Op::Ensure),
        idx.clone().prop_map(Op::Claim),
        idx.clone().prop_map(Op::Release),
        (
            table.clone(),
            proptest::collection::vec(0..n, 1..5),
            any::<bool>()
        )
            .prop_map(|(t, ty, e)| Op::Register(t, ty, e)),
        table.clone().prop_map(Op::Unregister),
        (table, any::<bool>()).prop_map(|(t, e)| Op::SetEmpty(t, e)),
    ];
    proptest::collection::vec(op, 1..80)
}

/// Every record a table with type `ty` holds one claim on.
fn derived(ty: &[Id]) -> BTreeSet<Id> {
    let mut out = BTreeSet::new();
    for &id in ty {
        out.insert(id.record_hash());
        if id.is_pair() && !id.is_wildcard() {
            out.insert(Id::pair(id.first(), Id::WILDCARD));
            out.insert(Id::pair(Id::WILDCARD, id.second()));
        }
    }
    out
}

#[derive(Default)]
struct Model {
    // live record hash -> claims taken through `claim`
    claims: BTreeMap<Id, u32>,
    // table -> (type, empty)
    tables: BTreeMap<TableId, (Vec<Id>, bool)>,
}

impl Model {
    fn ensure(&mut self, id: Id) {
        let id = id.record_hash();
        self.claims.entry(id).or_insert(0);
        if id.is_pair() && !id.is_wildcard() {
            self.claims.entry(Id::pair(id.first(), Id::WILDCARD)).or_insert(0);
            self.claims.entry(Id::pair(Id::WILDCARD, id.second())).or_insert(0);
        }
    }

    fn table_refs(&self, id: Id) -> u32 {
        self.tables
            .values()
            .filter(|(ty, _)| derived(ty).contains(&id))
            .count() as u32
    }

    fn own_refcount(&self, id: Id) -> u32 {
        self.claims.get(&id).copied().unwrap_or(0) + self.table_refs(id)
    }

    /// Own claims and table refs, plus one hold from every claimed member
    /// of a wildcard record's chain.
    fn refcount(&self, id: Id) -> u32 {
        let held = if id.is_pair() && id.is_wildcard() {
            self.chained(id)
                .filter(|&k| self.own_refcount(k) > 0)
                .count() as u32
        } else {
            0
        };
        self.own_refcount(id) + held
    }

    fn chained(&self, id: Id) -> impl Iterator<Item = Id> + '_ {
        let (rel, tgt) = (id.first(), id.second());
        self.claims.keys().copied().filter(move |k| {
            k.is_pair()
                && !k.is_wildcard()
                && if rel == Id::WILDCARD {
                    k.second() == tgt
                } else {
                    k.first() == rel
                }
        })
    }

    /// Destroys `id` if nothing holds it. A wildcard pair takes its chain
    /// with it; a concrete pair lets go of its wildcard records.
    fn collect(&mut self, id: Id) {
        if !self.claims.contains_key(&id) || self.refcount(id) != 0 {
            return;
        }
        self.claims.remove(&id);
        if !id.is_pair() {
            return;
        }
        if !id.is_wildcard() {
            self.collect(Id::pair(id.first(), Id::WILDCARD));
            self.collect(Id::pair(Id::WILDCARD, id.second()));
            return;
        }
        let chain: Vec<Id> = self.chained(id).collect();
        for k in chain {
            debug_assert_eq!(self.own_refcount(k), 0);
            self.claims.remove(&k);
        }
    }
}

// Property: state-machine equivalence against a claim-counting model.
// Invariants exercised across random operation sequences:
// - A record is live iff the model has it; refcount equals external claims
//   plus the number of registered tables deriving the record, plus one per
//   claimed chain member for wildcard records.
// - Concrete pairs are chained under both wildcard records.
// - Registered tables are found in every derived record, in the partition
//   matching their empty state.
// - Releasing a wildcard record to zero destroys its chain, which by then
//   holds no claims.
proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]
    #[test]
    fn prop_index_state_machine(ops in arb_ops()) {
        let ids = pool();
        let mut sut: IdIndex<MemoryCatalog> = IdIndex::default();
        let mut model = Model::default();

        for op in ops {
            match op {
                Op::Ensure(i) => {
                    let k = sut.ensure(ids[i]).expect("pool ids are valid");
                    prop_assert_eq!(sut.get_key(ids[i]), Some(k));
                    model.ensure(ids[i]);
                }
                Op::Claim(i) => {
                    let id = ids[i].record_hash();
                    if let Some(c) = model.claims.get_mut(&id) {
                        *c += 1;
                        let k = sut.get_key(id).expect("model record is live");
                        sut.claim(k);
                    }
                }
                Op::Release(i) => {
                    let id = ids[i].record_hash();
                    if let Some(c) = model.claims.get_mut(&id).filter(|c| **c > 0) {
                        *c -= 1;
                        let k = sut.get_key(id).expect("model record is live");
                        let rc = sut.release(k);
                        prop_assert_eq!(rc, model.refcount(id));
                        model.collect(id);
                    }
                }
                Op::Register(t, ty, empty) => {
                    let table = TableId(u64::from(t));
                    if model.tables.contains_key(&table) {
                        continue;
                    }
                    let mut seen = BTreeSet::new();
                    let ty: Vec<Id> = ty
                        .into_iter()
                        .map(|i| ids[i])
                        .filter(|id| seen.insert(id.record_hash()))
                        .collect();
                    sut.register_table(table, &ty, empty).expect("pool ids are valid");
                    for &id in &ty {
                        model.ensure(id);
                    }
                    model.tables.insert(table, (ty, empty));
                }
                Op::Unregister(t) => {
                    let table = TableId(u64::from(t));
                    if let Some((ty, _)) = model.tables.remove(&table) {
                        sut.unregister_table(table, &ty);
                        for id in derived(&ty) {
                            model.collect(id);
                        }
                    }
                }
                Op::SetEmpty(t, empty) => {
                    let table = TableId(u64::from(t));
                    if let Some((ty, e)) = model.tables.get_mut(&table) {
                        let moved = sut.set_table_empty(table, ty, empty);
                        let expected = if *e == empty { 0 } else { derived(ty).len() };
                        prop_assert_eq!(moved, expected);
                        *e = empty;
                    }
                }
            }

            prop_assert_eq!(sut.len(), model.claims.len());
            prop_assert_eq!(sut.stats().live(), model.claims.len() as u64);
            for &id in model.claims.keys() {
                let r = sut.get(id).expect("model record is live");
                prop_assert_eq!(r.refcount(), model.refcount(id));
                if id.is_pair() && !id.is_wildcard() {
                    let k = sut.get_key(id).unwrap();
                    let rw = sut.get_key(Id::pair(id.first(), Id::WILDCARD)).unwrap();
                    let tw = sut.get_key(Id::pair(Id::WILDCARD, id.second())).unwrap();
                    prop_assert_eq!(r.parent(), Some(rw));
                    prop_assert!(sut.chain(rw, ChainKind::First).any(|m| m == k));
                    prop_assert!(sut.chain(tw, ChainKind::Second).any(|m| m == k));
                }
            }
            for (&table, (ty, empty)) in &model.tables {
                for id in derived(ty) {
                    let r = sut.get(id).expect("derived record is live");
                    prop_assert_eq!(r.table_cache().is_table_empty(table), Some(*empty));
                }
            }
        }

        for (table, (ty, _)) in std::mem::take(&mut model.tables) {
            sut.unregister_table(table, &ty);
        }
        sut.clear();
        prop_assert!(sut.is_empty());
        prop_assert_eq!(sut.stats().id_create_total, sut.stats().id_delete_total);
    }
}
