//! Batched-removal partition group.
//!
//! Newly discovered states are collected in a pending batch instead of joining the
//! unexplored view right away. The view is refilled from the batch according to the
//! [`RefillPolicy`]:
//!
//! - [`RefillPolicy::Lazy`]: the batch replaces the view once the view is exhausted,
//!   so states are explored generation by generation.
//! - [`RefillPolicy::Eager`]: the batch is appended to the view on every request,
//!   which maximizes the number of refills.
//!
//! When both the view and the batch are non-empty, `Lazy` drains the view first and
//! `Eager` keeps the view's leftover states ahead of the appended batch.

use std::mem;

use log::debug;

use super::{PartitionGroup, RefillPolicy, StateTable, Stored};
use crate::minterm::{Minterm, MintermPool};
use crate::types::StateHandle;

pub struct BatchedRemoval {
    table: StateTable,
    policy: RefillPolicy,
    /// Current unexplored view; states before `position` are already explored.
    view: Vec<StateHandle>,
    position: usize,
    /// States discovered since the last refill.
    pending: Vec<StateHandle>,
    refills: usize,
}

impl BatchedRemoval {
    pub fn new(policy: RefillPolicy) -> Self {
        Self {
            table: StateTable::new(),
            policy,
            view: Vec::new(),
            position: 0,
            pending: Vec::new(),
            refills: 0,
        }
    }

    /// Number of times the view was refilled from the pending batch.
    pub fn refills(&self) -> usize {
        self.refills
    }

    fn refill(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        match self.policy {
            RefillPolicy::Lazy => {
                if self.position < self.view.len() {
                    return;
                }
                self.view = mem::take(&mut self.pending);
            }
            RefillPolicy::Eager => {
                self.view.drain(..self.position);
                self.view.append(&mut self.pending);
            }
        }
        self.position = 0;
        self.refills += 1;
        debug!("refill #{}: {} unexplored", self.refills, self.view.len());
    }
}

impl PartitionGroup for BatchedRemoval {
    fn has_unexplored(&self) -> bool {
        self.position < self.view.len() || !self.pending.is_empty()
    }

    fn next_unexplored(&mut self, pool: &mut MintermPool) -> Option<(StateHandle, Minterm)> {
        self.refill();
        let handle = *self.view.get(self.position)?;
        self.position += 1;
        let m = self.table.get(handle)?;
        Some((handle, pool.share(m)))
    }

    fn add_if_new(&mut self, pool: &mut MintermPool, m: Minterm) -> Stored {
        let stored = self.table.insert(pool, m);
        if stored.is_new {
            self.pending.push(stored.handle);
        }
        stored
    }

    fn clear(&mut self, pool: &mut MintermPool) {
        self.table.clear(pool);
        self.view.clear();
        self.pending.clear();
        self.position = 0;
    }

    fn table(&self) -> &StateTable {
        &self.table
    }
}
