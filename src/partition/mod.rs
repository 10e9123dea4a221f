//! State-set groups for the tangible and vanishing partitions.
//!
//! A partition group remembers every state discovered so far (the state table)
//! and which of them are still waiting to be explored. Two strategies are provided:
//!
//! | Strategy | Unexplored view | Refill | Use Case |
//! |----------|-----------------|--------|----------|
//! | [`SingleRemoval`] | cursor over discovery order | none | Default, breadth-first |
//! | [`BatchedRemoval`] | swapped batch of new states | lazy or eager | Amortized set operations |
//!
//! The strategy only affects exploration order and bookkeeping cost, never which
//! states are found. It is chosen at runtime via [`PartitionStrategy`].
//!
//! # Example
//!
//! ```
//! use ssgen_rs::minterm::MintermPool;
//! use ssgen_rs::partition::{PartitionGroup, PartitionStrategy};
//!
//! let mut pool = MintermPool::new(1);
//! let mut group = PartitionStrategy::default().build();
//!
//! let m = pool.acquire();
//! pool.fill(m, &[0, 5]);
//! let first = group.add_if_new(&mut pool, m);
//! let second = group.add_if_new(&mut pool, m);
//! pool.release(m);
//!
//! assert!(first.is_new && !second.is_new);
//! assert_eq!(first.handle, second.handle);
//! ```

mod batched;
mod single;

use std::collections::HashMap;

pub use batched::BatchedRemoval;
pub use single::SingleRemoval;

use crate::minterm::{Minterm, MintermPool};
use crate::types::StateHandle;

/// Result of inserting a state into a partition group.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Stored {
    /// The handle the state is stored under.
    pub handle: StateHandle,

    /// Whether this insertion discovered a previously unseen state.
    pub is_new: bool,
}

/// Contract shared by all partition strategies.
pub trait PartitionGroup {
    /// Whether some discovered state has not been explored yet.
    fn has_unexplored(&self) -> bool;

    /// Pop the next unexplored state and mark it explored.
    ///
    /// The returned minterm carries a fresh reference the caller must release.
    fn next_unexplored(&mut self, pool: &mut MintermPool) -> Option<(StateHandle, Minterm)>;

    /// Insert the encoding unless an identical one is already known.
    ///
    /// On a new state the group takes its own reference to `m`; the caller's
    /// reference is untouched either way.
    fn add_if_new(&mut self, pool: &mut MintermPool, m: Minterm) -> Stored;

    /// Drop all members, releasing their encodings.
    fn clear(&mut self, pool: &mut MintermPool);

    /// The state table backing this group.
    fn table(&self) -> &StateTable;

    /// Number of discovered states.
    fn len(&self) -> usize {
        self.table().len()
    }

    /// Whether no state was discovered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encoding of a discovered state.
    fn encoding(&self, handle: StateHandle) -> Option<Minterm> {
        self.table().get(handle)
    }

    /// Handle of a known encoding, if any.
    fn lookup(&self, pool: &MintermPool, m: Minterm) -> Option<StateHandle> {
        self.table().lookup(pool, m)
    }
}

/// When a batched group swaps pending states into its unexplored view.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum RefillPolicy {
    /// Swap only once the current view is exhausted.
    #[default]
    Lazy,
    /// Append pending states to the view on every request ("maximize refills").
    Eager,
}

/// Runtime selection of a partition strategy.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum PartitionStrategy {
    #[default]
    Single,
    Batched(RefillPolicy),
}

impl PartitionStrategy {
    /// Create an empty group using this strategy.
    pub fn build(self) -> Box<dyn PartitionGroup> {
        match self {
            PartitionStrategy::Single => Box::new(SingleRemoval::new()),
            PartitionStrategy::Batched(policy) => Box::new(BatchedRemoval::new(policy)),
        }
    }
}

/// Queryable table of discovered states.
///
/// Handles are dense indices in discovery order. Lookup by encoding goes through
/// hash buckets holding the handles of all states with the same encoding hash.
#[derive(Default)]
pub struct StateTable {
    minterms: Vec<Minterm>,
    buckets: HashMap<u64, Vec<StateHandle>>,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.minterms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minterms.is_empty()
    }

    /// Encoding stored under `handle`.
    pub fn get(&self, handle: StateHandle) -> Option<Minterm> {
        self.minterms.get(handle.index()).copied()
    }

    /// Find the handle of an encoding.
    pub fn lookup(&self, pool: &MintermPool, m: Minterm) -> Option<StateHandle> {
        let bucket = self.buckets.get(&pool.hash(m))?;
        bucket
            .iter()
            .copied()
            .find(|&h| pool.equals(self.minterms[h.index()], m))
    }

    /// Insert an encoding, sharing it on success.
    pub fn insert(&mut self, pool: &mut MintermPool, m: Minterm) -> Stored {
        let hash = pool.hash(m);
        let bucket = self.buckets.entry(hash).or_default();

        if let Some(&handle) = bucket
            .iter()
            .find(|&&h| pool.equals(self.minterms[h.index()], m))
        {
            return Stored {
                handle,
                is_new: false,
            };
        }

        let handle = StateHandle::new(self.minterms.len() as u32);
        bucket.push(handle);
        self.minterms.push(pool.share(m));
        Stored {
            handle,
            is_new: true,
        }
    }

    /// Iterate over `(handle, encoding)` pairs in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (StateHandle, Minterm)> + '_ {
        self.minterms
            .iter()
            .enumerate()
            .map(|(i, &m)| (StateHandle::new(i as u32), m))
    }

    /// Remove all states, releasing their encodings.
    pub fn clear(&mut self, pool: &mut MintermPool) {
        for m in self.minterms.drain(..) {
            pool.release(m);
        }
        self.buckets.clear();
    }
}
