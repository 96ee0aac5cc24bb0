//! TableCache: per-id index of the tables containing that id.
//!
//! Each cached table is a node in one of two ordered lists, tables that hold
//! entities and tables that are empty. Nodes are found through a hash map
//! keyed by [`TableId`]; list neighbors are stored as table ids rather than
//! pointers, so removing or moving a table never disturbs the position of any
//! other table. That stability is what lets a bulk release walk the empty list
//! while tables are being destroyed around it.

use hashbrown::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identity of an archetype table.
///
/// This is a plain key: holding one does not keep the table alive, and the
/// table's owner remains responsible for its lifetime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TableId(pub u64);

/// Where an id occurs inside a table's type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TableRecord {
    pub table: TableId,
    /// Index of the first matching column.
    pub column: usize,
    /// Number of matching columns; above one only for wildcard ids.
    pub count: usize,
}

#[derive(Debug)]
struct Node {
    record: TableRecord,
    empty: bool,
    prev: Option<TableId>,
    next: Option<TableId>,
}

#[derive(Debug, Default, Clone, Copy)]
struct List {
    head: Option<TableId>,
    tail: Option<TableId>,
    len: usize,
}

#[derive(Debug, Default)]
pub struct TableCache {
    nodes: HashMap<TableId, Node>,
    tables: List,
    empty_tables: List,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn list_mut(&mut self, empty: bool) -> &mut List {
        if empty {
            &mut self.empty_tables
        } else {
            &mut self.tables
        }
    }

    fn push_back(&mut self, table: TableId, empty: bool) {
        let tail = self.list_mut(empty).tail;
        {
            let node = self.nodes.get_mut(&table).expect("node exists before linking");
            node.empty = empty;
            node.prev = tail;
            node.next = None;
        }
        match tail {
            Some(t) => {
                self.nodes.get_mut(&t).expect("list tail is cached").next = Some(table);
            }
            None => self.list_mut(empty).head = Some(table),
        }
        let list = self.list_mut(empty);
        list.tail = Some(table);
        list.len += 1;
    }

    fn unlink(&mut self, table: TableId) {
        let (prev, next, empty) = {
            let node = self.nodes.get(&table).expect("node exists before unlinking");
            (node.prev, node.next, node.empty)
        };
        match prev {
            Some(p) => self.nodes.get_mut(&p).expect("prev is cached").next = next,
            None => self.list_mut(empty).head = next,
        }
        match next {
            Some(n) => self.nodes.get_mut(&n).expect("next is cached").prev = prev,
            None => self.list_mut(empty).tail = prev,
        }
        self.list_mut(empty).len -= 1;
    }

    /// Adds a table to the list matching `empty`.
    ///
    /// Panics if the table is already cached.
    pub fn insert(&mut self, record: TableRecord, empty: bool) {
        let table = record.table;
        let prior = self.nodes.insert(
            table,
            Node {
                record,
                empty,
                prev: None,
                next: None,
            },
        );
        assert!(prior.is_none(), "table {table:?} inserted twice into the same cache");
        self.push_back(table, empty);
    }

    /// Removes a table; returns its record if it was cached.
    pub fn remove(&mut self, table: TableId) -> Option<TableRecord> {
        if !self.nodes.contains_key(&table) {
            return None;
        }
        self.unlink(table);
        self.nodes.remove(&table).map(|n| n.record)
    }

    pub fn get(&self, table: TableId) -> Option<&TableRecord> {
        self.nodes.get(&table).map(|n| &n.record)
    }

    pub fn contains(&self, table: TableId) -> bool {
        self.nodes.contains_key(&table)
    }

    /// `Some(true)` if the table is in the empty list, `None` if not cached.
    pub fn is_table_empty(&self, table: TableId) -> Option<bool> {
        self.nodes.get(&table).map(|n| n.empty)
    }

    /// Moves a table to the list matching `empty`; returns whether it moved.
    pub fn set_empty(&mut self, table: TableId, empty: bool) -> bool {
        match self.nodes.get(&table) {
            Some(node) if node.empty != empty => {}
            _ => return false,
        }
        self.unlink(table);
        self.push_back(table, empty);
        tracing::trace!(?table, empty, "table moved between cache partitions");
        true
    }

    /// Number of tables with entities.
    pub fn count(&self) -> usize {
        self.tables.len
    }

    /// Number of empty tables.
    pub fn empty_count(&self) -> usize {
        self.empty_tables.len
    }

    /// True if neither list holds a table.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first_empty(&self) -> Option<TableId> {
        self.empty_tables.head
    }

    /// The table after `table` in whichever list holds it.
    pub fn next_in_partition(&self, table: TableId) -> Option<TableId> {
        self.nodes.get(&table).and_then(|n| n.next)
    }

    /// Tables with entities, in insertion order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            cache: self,
            cur: self.tables.head,
        }
    }

    /// Empty tables, in insertion order.
    pub fn iter_empty(&self) -> Iter<'_> {
        Iter {
            cache: self,
            cur: self.empty_tables.head,
        }
    }

    /// Tables with entities followed by empty tables.
    pub fn iter_all(&self) -> impl Iterator<Item = &TableRecord> {
        self.iter().chain(self.iter_empty())
    }
}

/// Iterator over one list of a [`TableCache`].
pub struct Iter<'a> {
    cache: &'a TableCache,
    cur: Option<TableId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a TableRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cache.nodes.get(&self.cur?)?;
        self.cur = node.next;
        Some(&node.record)
    }
}
