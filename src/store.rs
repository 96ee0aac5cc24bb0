//! RecordStore: arena of id records with a dense tier for low ids and a hash
//! tier for everything else.
//!
//! Records live in a `SlotMap`, so every record has a stable, generational
//! [`RecordKey`] that wildcard chains and parents can hold without pointers.
//! Lookup goes through one of two tiers, chosen by the record hash:
//! - below the threshold: a fixed array slot indexed by the hash itself;
//! - otherwise: a `HashTable` of keys searched by the stored hash.
//!
//! A freed dense slot keeps a tombstone instead of going back to empty.

use core::hash::BuildHasher;
use hashbrown::HashTable;
use slotmap::{new_key_type, SlotMap};
use std::collections::hash_map::RandomState;

use crate::id::Id;
use crate::record::IdRecord;

new_key_type! {
    /// Stable handle to an id record. Stale keys never resolve.
    pub struct RecordKey;
}

/// Which lookup path a record hash takes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tier {
    Dense,
    Sparse,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
enum LowSlot {
    #[default]
    Empty,
    Live(RecordKey),
    Tombstone,
}

pub struct RecordStore<S = RandomState> {
    hasher: S,
    records: SlotMap<RecordKey, IdRecord>,
    dense: Box<[LowSlot]>,
    sparse: HashTable<RecordKey>,
}

impl RecordStore {
    pub fn new(low_id_threshold: u64) -> Self {
        Self::with_hasher(low_id_threshold, RandomState::default())
    }
}

impl<S> RecordStore<S>
where
    S: BuildHasher,
{
    pub fn with_hasher(low_id_threshold: u64, hasher: S) -> Self {
        let len = usize::try_from(low_id_threshold).expect("low id threshold fits in memory");
        Self {
            hasher,
            records: SlotMap::with_key(),
            dense: vec![LowSlot::Empty; len].into_boxed_slice(),
            sparse: HashTable::new(),
        }
    }

    fn make_hash(&self, hash: Id) -> u64 {
        self.hasher.hash_one(hash.raw())
    }

    fn dense_index(&self, hash: Id) -> Option<usize> {
        usize::try_from(hash.raw())
            .ok()
            .filter(|&i| i < self.dense.len())
    }

    pub fn tier(&self, hash: Id) -> Tier {
        match self.dense_index(hash) {
            Some(_) => Tier::Dense,
            None => Tier::Sparse,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up the record stored under an already normalized hash.
    pub fn find(&self, hash: Id) -> Option<RecordKey> {
        if let Some(i) = self.dense_index(hash) {
            return match self.dense[i] {
                LowSlot::Live(k) => Some(k),
                LowSlot::Empty | LowSlot::Tombstone => None,
            };
        }
        let h = self.make_hash(hash);
        self.sparse
            .find(h, |&k| {
                self.records
                    .get(k)
                    .map(|r| r.hash == hash)
                    .unwrap_or(false)
            })
            .copied()
    }

    /// Stores a new record under `record.hash`.
    ///
    /// Panics if a record with the same hash is live.
    pub fn insert(&mut self, record: IdRecord) -> RecordKey {
        let hash = record.hash;
        if let Some(i) = self.dense_index(hash) {
            assert!(
                !matches!(self.dense[i], LowSlot::Live(_)),
                "duplicate id record for {hash}"
            );
            let k = self.records.insert(record);
            self.dense[i] = LowSlot::Live(k);
            return k;
        }

        let h = self.make_hash(hash);
        match self.sparse.entry(
            h,
            |&k| self.records.get(k).map(|r| r.hash == hash).unwrap_or(false),
            |&k| {
                self.records
                    .get(k)
                    .map(|r| self.hasher.hash_one(r.hash.raw()))
                    .unwrap_or(0)
            },
        ) {
            hashbrown::hash_table::Entry::Occupied(_) => {
                panic!("duplicate id record for {hash}")
            }
            hashbrown::hash_table::Entry::Vacant(v) => {
                let k = self.records.insert(record);
                let _ = v.insert(k);
                k
            }
        }
    }

    /// Removes a record and returns it; its key becomes stale.
    pub fn remove(&mut self, key: RecordKey) -> Option<IdRecord> {
        let record = self.records.remove(key)?;
        let hash = record.hash;
        if let Some(i) = self.dense_index(hash) {
            debug_assert_eq!(self.dense[i], LowSlot::Live(key));
            self.dense[i] = LowSlot::Tombstone;
        } else {
            let h = self.make_hash(hash);
            self.sparse
                .find_entry(h, |&k| k == key)
                .expect("sparse tier indexes every live high record")
                .remove();
        }
        Some(record)
    }

    pub fn contains(&self, key: RecordKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn get(&self, key: RecordKey) -> Option<&IdRecord> {
        self.records.get(key)
    }

    pub fn get_mut(&mut self, key: RecordKey) -> Option<&mut IdRecord> {
        self.records.get_mut(key)
    }

    /// Like `get_mut` for keys the caller knows are live.
    pub(crate) fn live_mut(&mut self, key: RecordKey) -> &mut IdRecord {
        self.records
            .get_mut(key)
            .expect("id record key refers to a destroyed record")
    }

    pub(crate) fn live(&self, key: RecordKey) -> &IdRecord {
        self.records
            .get(key)
            .expect("id record key refers to a destroyed record")
    }

    pub fn keys(&self) -> impl Iterator<Item = RecordKey> + '_ {
        self.records.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordKey, &IdRecord)> {
        self.records.iter()
    }

    /// Number of dense slots that held a record which has since been freed.
    pub fn dense_tombstones(&self) -> usize {
        self.dense
            .iter()
            .filter(|s| matches!(s, LowSlot::Tombstone))
            .count()
    }
}
