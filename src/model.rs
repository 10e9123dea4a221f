//! Interface to the model being explored.
//!
//! The explorer never interprets states itself: it asks the [`Model`] which events are
//! enabled, what their successors, weights and rates are, and whether a state is
//! vanishing. States are exchanged as minterm-shaped slices of length `N + 1`, where
//! slot 0 is reserved and slot `k` holds the value of variable `k`.

use crate::error::ModelError;

/// Index of an event within a model.
pub type EventId = usize;

/// A discrete-event model, seen from the state-space generator.
pub trait Model {
    /// Number of state variables `N`.
    fn num_variables(&self) -> usize;

    fn num_initial_states(&self) -> usize {
        1
    }

    /// Write the `index`-th initial state into `out` and return its initial weight.
    fn initial_state(&self, index: usize, out: &mut [u32]) -> Result<f64, ModelError>;

    /// Collect the events enabled in `state`, split into timed and immediate ones.
    ///
    /// Both lists are empty on entry.
    fn enabled_events(
        &self,
        state: &[u32],
        timed: &mut Vec<EventId>,
        immediate: &mut Vec<EventId>,
    ) -> Result<(), ModelError>;

    /// Write the state reached by firing `event` in `state` into `out`.
    fn next_state(&self, event: EventId, state: &[u32], out: &mut [u32]) -> Result<(), ModelError>;

    /// Weight of an immediate event; branches of a vanishing state are chosen
    /// proportionally to their weights.
    fn weight(&self, _event: EventId, _state: &[u32]) -> Result<f64, ModelError> {
        Ok(1.0)
    }

    /// Rate of a timed event (used in Markov chain mode).
    fn rate(&self, _event: EventId, _state: &[u32]) -> Result<f64, ModelError> {
        Ok(1.0)
    }

    /// Whether `state` is vanishing, i.e. has at least one immediate event enabled.
    fn is_vanishing(&self, state: &[u32]) -> Result<bool, ModelError> {
        let mut timed = Vec::new();
        let mut immediate = Vec::new();
        self.enabled_events(state, &mut timed, &mut immediate)?;
        Ok(!immediate.is_empty())
    }

    /// Whether `state` satisfies every model assertion.
    fn check_assertions(&self, _state: &[u32]) -> Result<bool, ModelError> {
        Ok(true)
    }

    /// Human-readable event name, for diagnostics.
    fn event_name(&self, event: EventId) -> String {
        format!("e{}", event)
    }
}
