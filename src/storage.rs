//! Node storage with generation-checked slots.
//!
//! Nodes live in a plain `Vec` indexed by [`NodeRef`]. Slot 0 is the terminal
//! sentinel. Freed slots form an intrusive free list through
//! [`NodeState::Recycled`]; each time a slot is freed its generation is bumped, so
//! every outstanding reference to the old node becomes detectably stale.
//!
//! All lifecycle transitions go through this module, which keeps the per-status
//! counters and the element count (for the memory estimate) exact.

use std::mem;

use crate::error::{GenError, Result};
use crate::node::{self, Element, NodeState, NodeStatus, Row};
use crate::reference::NodeRef;
use crate::types::Level;

struct Slot {
    generation: u32,
    state: NodeState,
}

pub struct Storage {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    /// Maximal number of simultaneously live (non-recycled) nodes.
    limit: usize,
    building: usize,
    canonical: usize,
    merged: usize,
    elements: usize,
    peak_nodes: usize,
    peak_bytes: usize,
}

impl Storage {
    pub fn new(limit: usize) -> Self {
        let terminal = Slot {
            generation: 0,
            state: NodeState::Canonical {
                level: Level::TERMINAL,
                rows: Vec::new(),
                refcount: 0,
                signature: 0,
            },
        };
        Self {
            slots: vec![terminal],
            free_head: None,
            limit,
            building: 0,
            canonical: 0,
            merged: 0,
            elements: 0,
            peak_nodes: 0,
            peak_bytes: 0,
        }
    }

    /// Number of slots ever allocated (excluding the terminal).
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }
    /// Number of live (non-recycled) nodes.
    pub fn live(&self) -> usize {
        self.building + self.canonical + self.merged
    }
    pub fn building(&self) -> usize {
        self.building
    }
    pub fn canonical(&self) -> usize {
        self.canonical
    }
    pub fn merged(&self) -> usize {
        self.merged
    }
    pub fn elements(&self) -> usize {
        self.elements
    }
    pub fn peak_nodes(&self) -> usize {
        self.peak_nodes
    }
    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes
    }

    /// Approximate heap footprint of the node storage.
    pub fn memory_bytes(&self) -> usize {
        self.slots.capacity() * mem::size_of::<Slot>() + self.elements * mem::size_of::<Element>()
    }

    fn note_peak(&mut self) {
        self.peak_nodes = self.peak_nodes.max(self.live());
        self.peak_bytes = self.peak_bytes.max(self.memory_bytes());
    }

    fn slot(&self, r: NodeRef) -> &Slot {
        let slot = &self.slots[r.index()];
        assert_eq!(slot.generation, r.generation(), "Stale reference {}", r);
        slot
    }

    fn slot_mut(&mut self, r: NodeRef) -> &mut Slot {
        assert!(!r.is_terminal(), "Terminal node is immutable");
        let slot = &mut self.slots[r.index()];
        assert_eq!(slot.generation, r.generation(), "Stale reference {}", r);
        slot
    }

    /// Check whether a reference still designates a live node.
    pub fn is_valid(&self, r: NodeRef) -> bool {
        self.slots
            .get(r.index())
            .map_or(false, |s| s.generation == r.generation() && s.state.status() != NodeStatus::Recycled)
    }

    /// Allocate an empty `Building` node.
    pub fn alloc(&mut self, level: Level) -> Result<NodeRef> {
        if self.live() >= self.limit {
            return Err(GenError::OutOfMemory { limit: self.limit });
        }

        let state = NodeState::Building {
            level,
            rows: Vec::new(),
        };
        let r = match self.free_head {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                self.free_head = match slot.state {
                    NodeState::Recycled { next_free } => next_free,
                    _ => unreachable!("free list points to a live node"),
                };
                slot.state = state;
                NodeRef::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, state });
                NodeRef::new(index, 0)
            }
        };

        self.building += 1;
        self.note_peak();
        Ok(r)
    }

    pub fn state(&self, r: NodeRef) -> &NodeState {
        &self.slot(r).state
    }

    pub fn status(&self, r: NodeRef) -> NodeStatus {
        self.state(r).status()
    }

    pub fn level(&self, r: NodeRef) -> Level {
        match self.state(r) {
            NodeState::Building { level, .. } | NodeState::Canonical { level, .. } => *level,
            state => panic!("Node {} is {:?} and has no level", r, state.status()),
        }
    }

    /// Rows of a `Building` or `Canonical` node.
    pub fn rows(&self, r: NodeRef) -> &[Row] {
        match self.state(r) {
            NodeState::Building { rows, .. } | NodeState::Canonical { rows, .. } => rows,
            state => panic!("Node {} is {:?} and has no rows", r, state.status()),
        }
    }

    /// Mutable rows of a node under construction.
    ///
    /// # Panics
    ///
    /// Panics unless the node is `Building`: canonical nodes are immutable.
    pub fn rows_mut(&mut self, r: NodeRef) -> &mut Vec<Row> {
        match &mut self.slot_mut(r).state {
            NodeState::Building { rows, .. } => rows,
            state => panic!("Node {} is {:?}, not under construction", r, state.status()),
        }
    }

    /// Insert an element into a node under construction.
    pub fn insert(&mut self, r: NodeRef, row: u32, element: Element) {
        node::insert(self.rows_mut(r), row, element);
        self.elements += 1;
        self.note_peak();
    }

    pub fn refcount(&self, r: NodeRef) -> u32 {
        match self.state(r) {
            NodeState::Canonical { refcount, .. } => *refcount,
            _ => 0,
        }
    }

    pub fn signature(&self, r: NodeRef) -> Option<u64> {
        match self.state(r) {
            NodeState::Canonical { signature, .. } => Some(*signature),
            _ => None,
        }
    }

    /// Add a parent pointer to a canonical node. No-op for the terminal.
    pub fn inc_ref(&mut self, r: NodeRef) {
        if r.is_terminal() {
            return;
        }
        match &mut self.slot_mut(r).state {
            NodeState::Canonical { refcount, .. } => *refcount += 1,
            state => panic!("Cannot reference {:?} node {}", state.status(), r),
        }
    }

    /// Drop a parent pointer from a canonical node, returning the new refcount.
    pub fn dec_ref(&mut self, r: NodeRef) -> u32 {
        match &mut self.slot_mut(r).state {
            NodeState::Canonical { refcount, .. } => {
                assert!(*refcount > 0, "Refcount underflow on {}", r);
                *refcount -= 1;
                *refcount
            }
            state => panic!("Cannot dereference {:?} node {}", state.status(), r),
        }
    }

    /// Turn a `Building` node into a `Canonical` one with refcount 1.
    pub fn promote(&mut self, r: NodeRef, signature: u64) {
        let slot = self.slot_mut(r);
        let (level, rows) = match &mut slot.state {
            NodeState::Building { level, rows } => (*level, mem::take(rows)),
            state => panic!("Cannot promote {:?} node {}", state.status(), r),
        };
        slot.state = NodeState::Canonical {
            level,
            rows,
            refcount: 1,
            signature,
        };
        self.building -= 1;
        self.canonical += 1;
    }

    /// Turn a `Building` node into a `Merged` forwarder, returning its rows.
    pub fn forward(&mut self, r: NodeRef, target: NodeRef) -> Vec<Row> {
        let slot = self.slot_mut(r);
        let rows = match &mut slot.state {
            NodeState::Building { rows, .. } => mem::take(rows),
            state => panic!("Cannot merge {:?} node {}", state.status(), r),
        };
        slot.state = NodeState::Merged { target };
        self.building -= 1;
        self.merged += 1;
        self.elements -= node::element_count(&rows);
        rows
    }

    /// Free an unreferenced canonical node, returning its level, signature and rows.
    pub fn retire(&mut self, r: NodeRef) -> (Level, u64, Vec<Row>) {
        let result = match &mut self.slot_mut(r).state {
            NodeState::Canonical {
                level,
                rows,
                refcount: 0,
                signature,
            } => (*level, *signature, mem::take(rows)),
            state => panic!("Cannot retire {:?} node {} while referenced", state.status(), r),
        };
        self.canonical -= 1;
        self.elements -= node::element_count(&result.2);
        self.free(r);
        result
    }

    /// Free a `Building` node, returning its rows.
    pub fn discard(&mut self, r: NodeRef) -> Vec<Row> {
        let rows = match &mut self.slot_mut(r).state {
            NodeState::Building { rows, .. } => mem::take(rows),
            state => panic!("Cannot discard {:?} node {}", state.status(), r),
        };
        self.building -= 1;
        self.elements -= node::element_count(&rows);
        self.free(r);
        rows
    }

    /// Free a `Merged` forwarder.
    pub fn recycle(&mut self, r: NodeRef) {
        match self.state(r) {
            NodeState::Merged { .. } => {}
            state => panic!("Cannot recycle {:?} node {}", state.status(), r),
        }
        self.merged -= 1;
        self.free(r);
    }

    fn free(&mut self, r: NodeRef) {
        let next_free = self.free_head;
        let slot = self.slot_mut(r);
        slot.generation = slot.generation.wrapping_add(1);
        slot.state = NodeState::Recycled { next_free };
        self.free_head = Some(r.index() as u32);
    }

    /// Iterate over all live nodes (excluding the terminal).
    pub fn iter_live(&self) -> impl Iterator<Item = (NodeRef, &NodeState)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, s)| s.state.status() != NodeStatus::Recycled)
            .map(|(i, s)| (NodeRef::new(i as u32, s.generation), &s.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(column: u32) -> Element {
        Element {
            column,
            weight: 1.0,
            down: NodeRef::TERMINAL,
        }
    }

    #[test]
    fn test_alloc() {
        let mut storage = Storage::new(8);
        let a = storage.alloc(Level::new(1)).unwrap();
        let b = storage.alloc(Level::new(1)).unwrap();
        assert_eq!(a.index(), 1);
        assert_eq!(b.index(), 2);
        assert_eq!(storage.building(), 2);
        assert_eq!(storage.status(a), NodeStatus::Building);
    }

    #[test]
    fn test_alloc_too_much() {
        let mut storage = Storage::new(2);
        storage.alloc(Level::new(1)).unwrap();
        storage.alloc(Level::new(1)).unwrap();
        assert_eq!(storage.alloc(Level::new(1)), Err(GenError::OutOfMemory { limit: 2 }));
    }

    #[test]
    fn test_lifecycle() {
        let mut storage = Storage::new(8);
        let a = storage.alloc(Level::new(1)).unwrap();
        storage.insert(a, 0, el(1));
        assert_eq!(storage.elements(), 1);

        storage.promote(a, 42);
        assert_eq!(storage.status(a), NodeStatus::Canonical);
        assert_eq!(storage.refcount(a), 1);
        assert_eq!(storage.signature(a), Some(42));

        storage.inc_ref(a);
        assert_eq!(storage.dec_ref(a), 1);
        assert_eq!(storage.dec_ref(a), 0);

        let (level, signature, rows) = storage.retire(a);
        assert_eq!(level, Level::new(1));
        assert_eq!(signature, 42);
        assert_eq!(rows.len(), 1);
        assert!(!storage.is_valid(a));
        assert_eq!(storage.live(), 0);
        assert_eq!(storage.elements(), 0);
    }

    #[test]
    fn test_recycled_slot_gets_new_generation() {
        let mut storage = Storage::new(8);
        let a = storage.alloc(Level::new(1)).unwrap();
        storage.discard(a);
        let b = storage.alloc(Level::new(2)).unwrap();
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert!(storage.is_valid(b));
        assert!(!storage.is_valid(a));
    }

    #[test]
    #[should_panic(expected = "Stale reference")]
    fn test_stale_reference_rejected() {
        let mut storage = Storage::new(8);
        let a = storage.alloc(Level::new(1)).unwrap();
        storage.discard(a);
        storage.alloc(Level::new(1)).unwrap();
        storage.rows(a);
    }

    #[test]
    #[should_panic(expected = "not under construction")]
    fn test_canonical_is_immutable() {
        let mut storage = Storage::new(8);
        let a = storage.alloc(Level::new(1)).unwrap();
        storage.promote(a, 0);
        storage.insert(a, 0, el(1));
    }

    #[test]
    fn test_merged_forwarding() {
        let mut storage = Storage::new(8);
        let target = storage.alloc(Level::new(1)).unwrap();
        storage.promote(target, 7);
        let dup = storage.alloc(Level::new(1)).unwrap();
        storage.insert(dup, 3, el(4));

        let rows = storage.forward(dup, target);
        assert_eq!(rows.len(), 1);
        assert_eq!(storage.elements(), 0);
        assert!(matches!(storage.state(dup), NodeState::Merged { target: t } if *t == target));

        storage.recycle(dup);
        assert_eq!(storage.merged(), 0);
        assert_eq!(storage.live(), 1);
    }
}
