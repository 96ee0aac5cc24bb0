//! Counters describing the records currently in the index.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::id::Id;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IndexStats {
    /// Records ever created.
    pub id_create_total: u64,
    /// Records ever destroyed.
    pub id_delete_total: u64,
    /// Live non-wildcard records.
    pub id_count: u64,
    /// Live non-wildcard records with type info.
    pub component_id_count: u64,
    /// Live non-wildcard records without type info.
    pub tag_id_count: u64,
    /// Live non-wildcard pair records.
    pub pair_id_count: u64,
    /// Live wildcard records.
    pub wildcard_id_count: u64,
}

impl IndexStats {
    pub(crate) fn on_create(&mut self, id: Id, has_type_info: bool) {
        self.id_create_total += 1;
        if id.is_wildcard() {
            self.wildcard_id_count += 1;
            return;
        }
        self.id_count += 1;
        if has_type_info {
            self.component_id_count += 1;
        } else {
            self.tag_id_count += 1;
        }
        if id.is_pair() {
            self.pair_id_count += 1;
        }
    }

    pub(crate) fn on_delete(&mut self, id: Id, has_type_info: bool) {
        self.id_delete_total += 1;
        if id.is_wildcard() {
            self.wildcard_id_count -= 1;
            return;
        }
        self.id_count -= 1;
        if has_type_info {
            self.component_id_count -= 1;
        } else {
            self.tag_id_count -= 1;
        }
        if id.is_pair() {
            self.pair_id_count -= 1;
        }
    }

    /// Moves one record between the tag and component counts.
    pub(crate) fn on_type_info_change(&mut self, id: Id, had: bool, has: bool) {
        if id.is_wildcard() || had == has {
            return;
        }
        if has {
            self.tag_id_count -= 1;
            self.component_id_count += 1;
        } else {
            self.tag_id_count += 1;
            self.component_id_count -= 1;
        }
    }

    /// Live records of every kind.
    pub fn live(&self) -> u64 {
        self.id_count + self.wildcard_id_count
    }
}
