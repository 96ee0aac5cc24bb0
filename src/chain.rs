//! Wildcard chains: doubly linked lists of concrete pair records hanging off
//! their `(R, *)` and `(*, T)` records.
//!
//! Links are [`RecordKey`]s stored in the [`ChainLink`] slots of each record.
//! A member's `prev` is either another member or the wildcard record itself,
//! so unlinking never needs to know which wildcard record it belongs to.

use core::hash::BuildHasher;

use crate::record::{ChainKind, ChainLink};
use crate::store::{RecordKey, RecordStore};

impl<S: BuildHasher> RecordStore<S> {
    /// Pushes `node` at the front of the `kind` list of `head`.
    pub(crate) fn chain_link(&mut self, head: RecordKey, node: RecordKey, kind: ChainKind) {
        debug_assert_ne!(head, node);
        let first = self.live(head).link(kind).next;
        *self.live_mut(node).link_mut(kind) = ChainLink {
            prev: Some(head),
            next: first,
        };
        if let Some(cur) = first {
            self.live_mut(cur).link_mut(kind).prev = Some(node);
        }
        self.live_mut(head).link_mut(kind).next = Some(node);
        tracing::trace!(?head, ?node, ?kind, "linked into wildcard chain");
    }

    /// Removes `node` from its `kind` list.
    pub(crate) fn chain_unlink(&mut self, node: RecordKey, kind: ChainKind) {
        let ChainLink { prev, next } = *self.live(node).link(kind);
        let prev = prev.expect("chained record has a predecessor");
        self.live_mut(prev).link_mut(kind).next = next;
        if let Some(n) = next {
            self.live_mut(n).link_mut(kind).prev = Some(prev);
        }
        *self.live_mut(node).link_mut(kind) = ChainLink::default();
        tracing::trace!(?node, ?kind, "unlinked from wildcard chain");
    }

    /// Walks the `kind` list starting after `head`.
    pub fn chain(&self, head: RecordKey, kind: ChainKind) -> ChainIter<'_, S> {
        ChainIter {
            store: self,
            kind,
            cur: self.get(head).and_then(|r| r.link(kind).next),
        }
    }
}

/// Iterator over the members of one wildcard chain.
pub struct ChainIter<'a, S = std::collections::hash_map::RandomState> {
    store: &'a RecordStore<S>,
    kind: ChainKind,
    cur: Option<RecordKey>,
}

impl<'a, S: BuildHasher> Iterator for ChainIter<'a, S> {
    type Item = RecordKey;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.cur?;
        self.cur = self.store.get(key).and_then(|r| r.link(self.kind).next);
        Some(key)
    }
}
