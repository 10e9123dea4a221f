//! Single-removal partition group.
//!
//! Handles are assigned in discovery order, so the unexplored states are exactly the
//! handles past an exploration cursor. Each request removes one state from the
//! unexplored range, giving a breadth-first exploration order.

use super::{PartitionGroup, StateTable, Stored};
use crate::minterm::{Minterm, MintermPool};
use crate::types::StateHandle;

#[derive(Default)]
pub struct SingleRemoval {
    table: StateTable,
    /// Handle of the first unexplored state.
    cursor: usize,
}

impl SingleRemoval {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartitionGroup for SingleRemoval {
    fn has_unexplored(&self) -> bool {
        self.cursor < self.table.len()
    }

    fn next_unexplored(&mut self, pool: &mut MintermPool) -> Option<(StateHandle, Minterm)> {
        let handle = StateHandle::new(self.cursor as u32);
        let m = self.table.get(handle)?;
        self.cursor += 1;
        Some((handle, pool.share(m)))
    }

    fn add_if_new(&mut self, pool: &mut MintermPool, m: Minterm) -> Stored {
        self.table.insert(pool, m)
    }

    fn clear(&mut self, pool: &mut MintermPool) {
        self.table.clear(pool);
        self.cursor = 0;
    }

    fn table(&self) -> &StateTable {
        &self.table
    }
}
