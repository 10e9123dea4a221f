//! Explicit state-space exploration.
//!
//! The [`Explorer`] drives a [`Model`] from its initial states, discovering every
//! reachable state and forwarding the edges between them to an [`EdgeSink`].
//! States are split into two partitions, each tracked by a [`PartitionGroup`]:
//!
//! - *tangible* states, which persist for positive time and fire timed events;
//! - *vanishing* states, which fire immediate events and take no time.
//!
//! The main loop always finishes the vanishing states reachable from the last
//! tangible state before moving on:
//!
//! ```text
//! loop:
//!   cancelled?                 -> Terminated
//!   vanishing unexplored?      -> explore it
//!   vanishing just exhausted?  -> apply the vanishing policy
//!   tangible unexplored?       -> explore it
//!   otherwise                  -> Done
//! ```
//!
//! With [`VanishingPolicy::Transitive`], edges touching vanishing states are
//! collected by the [`Eliminator`] and replaced by tangible-to-tangible edges whose
//! weights are the probabilities of the eliminated paths. With
//! [`VanishingPolicy::Structural`], vanishing states are ordinary members of the
//! state space and all edges go to the sink.
//!
//! # Example
//!
//! ```
//! use ssgen_rs::error::ModelError;
//! use ssgen_rs::explorer::{Explorer, ExplorerConfig};
//! use ssgen_rs::model::{EventId, Model};
//! use ssgen_rs::relation::{RelationBuilder, RelationConfig};
//!
//! /// A counter modulo 3.
//! struct Ring;
//!
//! impl Model for Ring {
//!     fn num_variables(&self) -> usize {
//!         1
//!     }
//!     fn initial_state(&self, _: usize, out: &mut [u32]) -> Result<f64, ModelError> {
//!         out[1] = 0;
//!         Ok(1.0)
//!     }
//!     fn enabled_events(&self, _: &[u32], timed: &mut Vec<EventId>, _: &mut Vec<EventId>) -> Result<(), ModelError> {
//!         timed.push(0);
//!         Ok(())
//!     }
//!     fn next_state(&self, _: EventId, state: &[u32], out: &mut [u32]) -> Result<(), ModelError> {
//!         out[1] = (state[1] + 1) % 3;
//!         Ok(())
//!     }
//! }
//!
//! let mut builder = RelationBuilder::new(RelationConfig::new(1));
//! let mut explorer = Explorer::new(Ring, ExplorerConfig::default());
//! let stats = explorer.run(&mut builder).unwrap();
//!
//! assert_eq!(stats.tangible_states, 3);
//! assert_eq!(builder.edges(builder.root().unwrap()).count(), 3);
//! ```

use std::mem;

use log::{debug, info, warn};
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::eliminate::{Eliminator, Source, Target};
use crate::error::{GenError, Result};
use crate::minterm::{Minterm, MintermPool};
use crate::model::{EventId, Model};
use crate::partition::{PartitionGroup, PartitionStrategy};
use crate::sink::EdgeSink;
use crate::stats::RunStats;
use crate::types::{Partition, StateId};

/// How vanishing states are handled.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum VanishingPolicy {
    /// Keep vanishing states in the state space; edges touching them go to the sink.
    Structural,
    /// Eliminate vanishing states, redistributing their probability mass.
    #[default]
    Transitive,
}

/// Configuration of an [`Explorer`].
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    pub tangible: PartitionStrategy,
    pub vanishing: PartitionStrategy,
    pub policy: VanishingPolicy,
    /// Only discover states; no edge reaches the sink.
    pub states_only: bool,
    /// Capacity of the vanishing elimination stack.
    pub max_vanishing_depth: usize,
    /// Log progress every that many explored states (0 disables).
    pub progress_every: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            tangible: PartitionStrategy::default(),
            vanishing: PartitionStrategy::default(),
            policy: VanishingPolicy::default(),
            states_only: false,
            max_vanishing_depth: 1024,
            progress_every: 100_000,
        }
    }
}

/// Lifecycle of an [`Explorer`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExplorerState {
    Idle,
    Running,
    Done,
}

/// A failed run: the error, together with the statistics gathered until then.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct Failure {
    pub error: GenError,
    pub stats: RunStats,
}

/// Explicit state-space generator.
pub struct Explorer<M: Model> {
    model: M,
    config: ExplorerConfig,
    state: ExplorerState,
    pool: MintermPool,
    tangible: Box<dyn PartitionGroup>,
    vanishing: Box<dyn PartitionGroup>,
    eliminator: Eliminator,
    initial: Vec<(StateId, f64)>,
    stats: RunStats,
    cancel: CancelToken,
    /// Copy of the state being explored.
    source: Vec<u32>,
    timed: Vec<EventId>,
    immediate: Vec<EventId>,
}

impl<M: Model> Explorer<M> {
    pub fn new(model: M, config: ExplorerConfig) -> Self {
        let num_vars = model.num_variables();
        Self {
            pool: MintermPool::new(num_vars),
            tangible: config.tangible.build(),
            vanishing: config.vanishing.build(),
            eliminator: Eliminator::new(config.max_vanishing_depth),
            state: ExplorerState::Idle,
            initial: Vec::new(),
            stats: RunStats::default(),
            cancel: CancelToken::new(),
            source: vec![0; num_vars + 1],
            timed: Vec::new(),
            immediate: Vec::new(),
            model,
            config,
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that cancels this explorer's run.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> ExplorerState {
        self.state
    }
    pub fn model(&self) -> &M {
        &self.model
    }
    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }
    pub fn pool(&self) -> &MintermPool {
        &self.pool
    }
    /// The tangible partition (the reachable tangible state table).
    pub fn tangible(&self) -> &dyn PartitionGroup {
        self.tangible.as_ref()
    }
    /// The vanishing partition (empty after transitive elimination).
    pub fn vanishing(&self) -> &dyn PartitionGroup {
        self.vanishing.as_ref()
    }
    /// Initial probability mass per state, in order of first occurrence.
    pub fn initial_distribution(&self) -> &[(StateId, f64)] {
        &self.initial
    }
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Encoding of a discovered state.
    pub fn encoding(&self, id: StateId) -> Option<&[u32]> {
        let group = match id.partition {
            Partition::Tangible => &self.tangible,
            Partition::Vanishing => &self.vanishing,
        };
        group.encoding(id.handle).map(|m| self.pool.get(m))
    }

    /// Generate the whole reachable state space, feeding edges into `sink`.
    ///
    /// An explorer runs once: calling `run` again fails with `EngineFailed`. On
    /// failure the sink's unflushed batch is discarded and every state is dropped.
    pub fn run(&mut self, sink: &mut dyn EdgeSink) -> Result<RunStats, Failure> {
        if self.state != ExplorerState::Idle {
            return Err(Failure {
                error: GenError::EngineFailed("explorer has already run".to_string()),
                stats: self.stats.clone(),
            });
        }

        self.state = ExplorerState::Running;
        info!(
            "exploring {} variables ({:?} policy, states only: {})",
            self.model.num_variables(),
            self.config.policy,
            self.config.states_only
        );
        let result = self.generate(sink);
        self.collect_stats(sink);
        self.state = ExplorerState::Done;

        match result {
            Ok(()) => {
                info!(
                    "done: {} tangible states, {} edges, {} explorations",
                    self.stats.tangible_states, self.stats.edges, self.stats.explored
                );
                Ok(self.stats.clone())
            }
            Err(error) => {
                warn!("generation failed: {}", error);
                self.teardown(sink);
                Err(Failure {
                    error,
                    stats: self.stats.clone(),
                })
            }
        }
    }

    fn collect_stats(&mut self, sink: &dyn EdgeSink) {
        self.stats.tangible_states = self.tangible.len();
        self.stats.vanishing_states = self.vanishing.len();
        self.stats.pool_peak = self.pool.peak_live();
        self.stats.sink = sink.stats();
    }

    fn teardown(&mut self, sink: &mut dyn EdgeSink) {
        sink.discard();
        self.eliminator.clear();
        self.tangible.clear(&mut self.pool);
        self.vanishing.clear(&mut self.pool);
        self.initial.clear();
        debug!("teardown done, {} minterms still live", self.pool.live());
    }

    fn generate(&mut self, sink: &mut dyn EdgeSink) -> Result<()> {
        for index in 0..self.model.num_initial_states() {
            let m = self.pool.acquire();
            let result = self.add_initial(index, m);
            self.pool.release(m);
            result?;
        }

        let mut vanishing_pending = false;
        loop {
            if self.cancel.is_cancelled() {
                return Err(GenError::Terminated);
            }

            if let Some((handle, m)) = self.vanishing.next_unexplored(&mut self.pool) {
                let result = self.explore(StateId::vanishing(handle), m, sink);
                self.pool.release(m);
                result?;
                vanishing_pending = true;
            } else if vanishing_pending {
                vanishing_pending = false;
                if self.config.policy == VanishingPolicy::Transitive {
                    self.eliminate(sink)?;
                    self.vanishing.clear(&mut self.pool);
                }
            } else if let Some((handle, m)) = self.tangible.next_unexplored(&mut self.pool) {
                let result = self.explore(StateId::tangible(handle), m, sink);
                self.pool.release(m);
                result?;
            } else {
                break;
            }
        }

        sink.flush()
    }

    fn add_initial(&mut self, index: usize, m: Minterm) -> Result<()> {
        let out = self.pool.get_mut(m);
        let weight = self.model.initial_state(index, out)?;
        out[0] = 0;
        check_weight(weight, || format!("initial state #{}", index))?;

        let id = self.insert(m)?;
        match id.partition {
            Partition::Vanishing if self.config.policy == VanishingPolicy::Transitive => {
                if !self.config.states_only {
                    self.eliminator.add_entry(Source::Initial, id.handle, weight);
                }
            }
            _ => add_mass(&mut self.initial, id, weight),
        }
        Ok(())
    }

    /// Classify and insert a state, checking assertions if it is new.
    fn insert(&mut self, m: Minterm) -> Result<StateId> {
        let slots = self.pool.get(m);
        let vanishing = self.model.is_vanishing(slots)?;
        let (group, partition) = if vanishing {
            (&mut self.vanishing, Partition::Vanishing)
        } else {
            (&mut self.tangible, Partition::Tangible)
        };

        let stored = group.add_if_new(&mut self.pool, m);
        if stored.is_new && !self.model.check_assertions(self.pool.get(m))? {
            return Err(GenError::AssertionFailure {
                state: self.pool.show(m),
            });
        }
        Ok(StateId {
            partition,
            handle: stored.handle,
        })
    }

    fn explore(&mut self, id: StateId, m: Minterm, sink: &mut dyn EdgeSink) -> Result<()> {
        self.source.copy_from_slice(self.pool.get(m));
        self.timed.clear();
        self.immediate.clear();
        self.model
            .enabled_events(&self.source, &mut self.timed, &mut self.immediate)?;

        self.stats.explored += 1;
        let events = match id.partition {
            Partition::Vanishing => {
                self.stats.vanishing_explored += 1;
                if self.immediate.is_empty() {
                    return Err(GenError::EngineFailed(format!(
                        "vanishing state {} has no enabled immediate events",
                        self.pool.show(m)
                    )));
                }
                if self.config.policy == VanishingPolicy::Transitive {
                    self.eliminator.add_state(id.handle);
                }
                mem::take(&mut self.immediate)
            }
            Partition::Tangible => mem::take(&mut self.timed),
        };

        if self.config.progress_every > 0 && self.stats.explored % self.config.progress_every == 0 {
            info!(
                "explored {} states: {} tangible, {} vanishing",
                self.stats.explored,
                self.tangible.len(),
                self.vanishing.len()
            );
        }

        let result = self.fire_all(id, &events, sink);
        match id.partition {
            Partition::Vanishing => self.immediate = events,
            Partition::Tangible => self.timed = events,
        }
        result
    }

    fn fire_all(&mut self, from: StateId, events: &[EventId], sink: &mut dyn EdgeSink) -> Result<()> {
        for &event in events {
            self.fire(from, event, sink)?;
        }
        Ok(())
    }

    fn fire(&mut self, from: StateId, event: EventId, sink: &mut dyn EdgeSink) -> Result<()> {
        let weighted = sink.is_weighted();
        let weight = match from.partition {
            Partition::Vanishing => self.model.weight(event, &self.source)?,
            Partition::Tangible if weighted => self.model.rate(event, &self.source)?,
            Partition::Tangible => 1.0,
        };
        check_weight(weight, || {
            format!("event {} in state {}", self.model.event_name(event), crate::minterm::show_slots(&self.source))
        })?;

        let next = self.pool.acquire();
        let result = self.fire_into(from, event, weight, next, sink);
        self.pool.release(next);
        result
    }

    fn fire_into(&mut self, from: StateId, event: EventId, weight: f64, next: Minterm, sink: &mut dyn EdgeSink) -> Result<()> {
        let out = self.pool.get_mut(next);
        self.model.next_state(event, &self.source, out)?;
        out[0] = 0;

        let to = self.insert(next)?;
        if self.config.states_only {
            return Ok(());
        }

        let transitive = self.config.policy == VanishingPolicy::Transitive;
        match (from.partition, to.partition) {
            (Partition::Tangible, Partition::Vanishing) if transitive => {
                self.eliminator.add_entry(Source::Tangible(from.handle), to.handle, weight);
            }
            (Partition::Vanishing, _) if transitive => {
                let target = match to.partition {
                    Partition::Tangible => Target::Tangible(to.handle),
                    Partition::Vanishing => Target::Vanishing(to.handle),
                };
                self.eliminator.add_branch(from.handle, target, weight);
            }
            _ => {
                self.stats.edges += 1;
                if sink.is_weighted() {
                    sink.add_weighted_edge(&self.source, self.pool.get(next), weight)?;
                } else {
                    sink.add_edge(&self.source, self.pool.get(next))?;
                }
            }
        }
        Ok(())
    }

    /// Replace the collected vanishing paths by tangible edges.
    fn eliminate(&mut self, sink: &mut dyn EdgeSink) -> Result<()> {
        let Self {
            eliminator,
            tangible,
            pool,
            initial,
            stats,
            ..
        } = self;
        let weighted = sink.is_weighted();

        let paths = eliminator.eliminate(|source, to, weight| {
            let to_id = StateId::tangible(to);
            let Source::Tangible(from) = source else {
                add_mass(initial, to_id, weight);
                return Ok(());
            };

            let (Some(from_m), Some(to_m)) = (tangible.encoding(from), tangible.encoding(to)) else {
                return Err(GenError::EngineFailed(format!(
                    "eliminated path {} -> {} leaves the tangible partition",
                    StateId::tangible(from),
                    to_id
                )));
            };
            stats.edges += 1;
            if weighted {
                sink.add_weighted_edge(pool.get(from_m), pool.get(to_m), weight)
            } else {
                sink.add_edge(pool.get(from_m), pool.get(to_m))
            }
        })?;

        stats.eliminated_paths += paths;
        eliminator.clear();
        Ok(())
    }
}

fn check_weight(weight: f64, context: impl FnOnce() -> String) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(GenError::EngineFailed(format!("invalid weight {} for {}", weight, context())))
    }
}

fn add_mass(initial: &mut Vec<(StateId, f64)>, id: StateId, weight: f64) {
    match initial.iter_mut().find(|(s, _)| *s == id) {
        Some((_, mass)) => *mass += weight,
        None => initial.push((id, weight)),
    }
}
