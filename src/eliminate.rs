//! Transitive elimination of vanishing states.
//!
//! The [`Eliminator`] collects two kinds of edges while vanishing states are
//! explored:
//!
//! - *entries*: edges from a source (a tangible state, or the initial distribution)
//!   into a vanishing state;
//! - *branches*: the outgoing edges of every explored vanishing state.
//!
//! Every vanishing state reached by an entry is resolved into its *tangible
//! distribution*: the probability of ending in each tangible state, with branch
//! weights normalized to sum to 1 at every vanishing state. Each entry then yields one
//! source-to-tangible edge per reachable tangible state, carrying the entry weight
//! times that probability:
//!
//! ```text
//!            0.5 ─▶ B                         A ──0.5──▶ B
//!  A ──▶ V ─┤                    ==>
//!            0.5 ─▶ C                         A ──0.5──▶ C
//! ```
//!
//! Distributions are memoized until [`clear`][Eliminator::clear], so vanishing states
//! shared by many paths are resolved once. Resolution uses an explicit stack; a stack
//! deeper than the capacity, or a cycle among vanishing states, is reported as
//! [`GenError::Overflow`].

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::error::{GenError, Result};
use crate::types::StateHandle;

/// Origin of probability mass entering the vanishing partition.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Source {
    /// The initial distribution.
    Initial,
    Tangible(StateHandle),
}

/// Target of a vanishing branch.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Target {
    Tangible(StateHandle),
    Vanishing(StateHandle),
}

#[derive(Debug)]
struct Frame {
    state: StateHandle,
    expanded: bool,
}

pub struct Eliminator {
    capacity: usize,
    entries: Vec<(Source, StateHandle, f64)>,
    branches: HashMap<StateHandle, Vec<(Target, f64)>>,
    distributions: HashMap<StateHandle, Vec<(StateHandle, f64)>>,
    active: HashSet<StateHandle>,
    stack: Vec<Frame>,
}

impl Eliminator {
    /// Create an eliminator whose stack holds at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
            branches: HashMap::new(),
            distributions: HashMap::new(),
            active: HashSet::new(),
            stack: Vec::with_capacity(capacity.min(1024)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.branches.is_empty()
    }

    /// Record an edge from `source` into the vanishing state `to`.
    pub fn add_entry(&mut self, source: Source, to: StateHandle, weight: f64) {
        self.entries.push((source, to, weight));
    }

    /// Record an outgoing edge of the vanishing state `from`.
    pub fn add_branch(&mut self, from: StateHandle, to: Target, weight: f64) {
        self.branches.entry(from).or_default().push((to, weight));
    }

    /// Mark a vanishing state as explored, even if it has no branches yet.
    pub fn add_state(&mut self, state: StateHandle) {
        self.branches.entry(state).or_default();
    }

    /// Number of vanishing states whose tangible distribution is memoized.
    pub fn resolved(&self) -> usize {
        self.distributions.len()
    }

    /// Eliminate every recorded entry, calling `emit(source, tangible, weight)` once
    /// per tangible state reachable from the entry.
    ///
    /// Returns the number of emitted edges. Recorded edges are kept; call
    /// [`clear`][Eliminator::clear] afterwards.
    pub fn eliminate(&mut self, mut emit: impl FnMut(Source, StateHandle, f64) -> Result<()>) -> Result<usize> {
        let mut emitted = 0;

        for i in 0..self.entries.len() {
            let (source, state, weight) = self.entries[i];
            self.resolve(state)?;
            for &(to, p) in &self.distributions[&state] {
                let mass = weight * p;
                if mass == 0.0 {
                    continue;
                }
                emit(source, to, mass)?;
                emitted += 1;
            }
        }

        debug!(
            "eliminated {} entries through {} vanishing states into {} edges",
            self.entries.len(),
            self.distributions.len(),
            emitted
        );
        Ok(emitted)
    }

    /// Compute the tangible distribution of `root` and of every vanishing state below it.
    fn resolve(&mut self, root: StateHandle) -> Result<()> {
        if self.distributions.contains_key(&root) {
            return Ok(());
        }
        self.stack.clear();
        self.active.clear();
        self.stack.push(Frame {
            state: root,
            expanded: false,
        });

        while let Some(frame) = self.stack.last_mut() {
            let state = frame.state;
            if self.distributions.contains_key(&state) {
                self.stack.pop();
                continue;
            }

            let branches = match self.branches.get(&state) {
                Some(branches) if !branches.is_empty() => branches,
                _ => {
                    return Err(GenError::EngineFailed(format!(
                        "vanishing state {} has no immediate successors",
                        state
                    )))
                }
            };

            if !frame.expanded {
                frame.expanded = true;
                self.active.insert(state);
                for &(target, _) in branches {
                    let Target::Vanishing(next) = target else {
                        continue;
                    };
                    if self.distributions.contains_key(&next) {
                        continue;
                    }
                    if self.active.contains(&next) || self.stack.len() >= self.capacity {
                        return Err(GenError::Overflow {
                            capacity: self.capacity,
                        });
                    }
                    self.stack.push(Frame {
                        state: next,
                        expanded: false,
                    });
                }
                continue;
            }

            let total: f64 = branches.iter().map(|(_, w)| w).sum();
            if total <= 0.0 {
                return Err(GenError::EngineFailed(format!(
                    "immediate events of vanishing state {} have total weight {}",
                    state, total
                )));
            }

            let mut distribution = Vec::new();
            for &(target, w) in branches {
                let p = w / total;
                if p == 0.0 {
                    continue;
                }
                match target {
                    Target::Tangible(to) => add_mass(&mut distribution, to, p),
                    Target::Vanishing(next) => {
                        for &(to, q) in &self.distributions[&next] {
                            add_mass(&mut distribution, to, p * q);
                        }
                    }
                }
            }

            self.active.remove(&state);
            self.distributions.insert(state, distribution);
            self.stack.pop();
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.branches.clear();
        self.distributions.clear();
        self.active.clear();
        self.stack.clear();
    }
}

fn add_mass(distribution: &mut Vec<(StateHandle, f64)>, to: StateHandle, p: f64) {
    match distribution.iter_mut().find(|(h, _)| *h == to) {
        Some((_, mass)) => *mass += p,
        None => distribution.push((to, p)),
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn h(i: u32) -> StateHandle {
        StateHandle::new(i)
    }

    fn collect(elim: &mut Eliminator) -> Result<Vec<(Source, StateHandle, f64)>> {
        let mut out = Vec::new();
        elim.eliminate(|s, t, w| {
            out.push((s, t, w));
            Ok(())
        })?;
        Ok(out)
    }

    #[test]
    fn test_single_branch_point() {
        let mut elim = Eliminator::new(16);
        elim.add_entry(Source::Tangible(h(0)), h(0), 2.0);
        elim.add_branch(h(0), Target::Tangible(h(1)), 1.0);
        elim.add_branch(h(0), Target::Tangible(h(2)), 3.0);

        let out = collect(&mut elim).unwrap();
        assert_eq!(
            out,
            vec![
                (Source::Tangible(h(0)), h(1), 0.5),
                (Source::Tangible(h(0)), h(2), 1.5),
            ]
        );
    }

    #[test]
    fn test_chain_of_vanishing_states() {
        let mut elim = Eliminator::new(16);
        elim.add_entry(Source::Initial, h(0), 1.0);
        elim.add_branch(h(0), Target::Vanishing(h(1)), 1.0);
        elim.add_branch(h(0), Target::Tangible(h(7)), 1.0);
        elim.add_branch(h(1), Target::Tangible(h(8)), 4.0);

        let out = collect(&mut elim).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.contains(&(Source::Initial, h(7), 0.5)));
        assert!(out.contains(&(Source::Initial, h(8), 0.5)));
    }

    #[test]
    fn test_cycle_overflows() {
        let mut elim = Eliminator::new(8);
        elim.add_entry(Source::Tangible(h(0)), h(0), 1.0);
        elim.add_branch(h(0), Target::Vanishing(h(1)), 1.0);
        elim.add_branch(h(1), Target::Vanishing(h(0)), 1.0);

        assert_eq!(collect(&mut elim), Err(GenError::Overflow { capacity: 8 }));
    }

    #[test]
    fn test_chain_of_diamonds() {
        // Diamond i: 3i -> {3i+1, 3i+2} -> 3(i+1); the last join leads to tangible 1000.
        let k = 40;
        let mut elim = Eliminator::new(256);
        elim.add_entry(Source::Initial, h(0), 2.0);
        for i in 0..k {
            let (top, left, right, join) = (h(3 * i), h(3 * i + 1), h(3 * i + 2), h(3 * i + 3));
            elim.add_branch(top, Target::Vanishing(left), 1.0);
            elim.add_branch(top, Target::Vanishing(right), 1.0);
            elim.add_branch(left, Target::Vanishing(join), 1.0);
            elim.add_branch(right, Target::Vanishing(join), 1.0);
        }
        elim.add_branch(h(3 * k), Target::Tangible(h(1000)), 1.0);

        let out = collect(&mut elim).unwrap();
        assert_eq!(out, vec![(Source::Initial, h(1000), 2.0)]);
        assert_eq!(elim.resolved(), 3 * k as usize + 1);
    }

    #[test]
    fn test_shared_state_resolved_once() {
        let mut elim = Eliminator::new(16);
        elim.add_entry(Source::Tangible(h(0)), h(5), 1.0);
        elim.add_entry(Source::Tangible(h(1)), h(5), 4.0);
        elim.add_branch(h(5), Target::Tangible(h(2)), 1.0);
        elim.add_branch(h(5), Target::Tangible(h(3)), 1.0);

        let out = collect(&mut elim).unwrap();
        assert_eq!(
            out,
            vec![
                (Source::Tangible(h(0)), h(2), 0.5),
                (Source::Tangible(h(0)), h(3), 0.5),
                (Source::Tangible(h(1)), h(2), 2.0),
                (Source::Tangible(h(1)), h(3), 2.0),
            ]
        );
        assert_eq!(elim.resolved(), 1);
        elim.clear();
        assert_eq!(elim.resolved(), 0);
    }

    #[test]
    fn test_dead_end() {
        let mut elim = Eliminator::new(8);
        elim.add_entry(Source::Tangible(h(0)), h(3), 1.0);
        elim.add_state(h(3));

        assert!(matches!(collect(&mut elim), Err(GenError::EngineFailed(_))));
        elim.clear();
        assert!(elim.is_empty());
    }
}
