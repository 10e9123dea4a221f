//! Type-safe wrappers for levels and state handles.
//!
//! This module provides newtype wrappers that keep relation levels, state handles
//! and partition tags apart, preventing the usual mix-ups between "variable index",
//! "row value" and "discovery number" in exploration code.
use std::fmt;

/// A level of the relation diagram (1-indexed, 0 is the terminal level).
///
/// Level `k` decides on state variable `k`: rows are indexed by the value of the
/// variable in the source state, columns by its value in the target state.
///
/// # Invariants
///
/// - Level 0 is the terminal level (no rows)
/// - The top level equals the number of state variables
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Level(u32);

impl Level {
    /// The terminal level.
    pub const TERMINAL: Level = Level(0);

    /// Creates a new level with the given index.
    pub const fn new(index: u32) -> Self {
        Level(index)
    }

    /// Returns the level index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the level directly below (index - 1), or None at the terminal level.
    pub fn below(self) -> Option<Self> {
        if self.0 > 0 {
            Some(Level(self.0 - 1))
        } else {
            None
        }
    }

    /// Checks if this is the terminal level.
    pub const fn is_terminal(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl From<Level> for usize {
    fn from(level: Level) -> Self {
        level.0 as usize
    }
}

/// A state handle: the discovery number of a state within its partition.
///
/// Handles are assigned in discovery order starting at 0 and are never reused while
/// the owning partition is live.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StateHandle(u32);

impl StateHandle {
    pub const fn new(index: u32) -> Self {
        StateHandle(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// The partition a state belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Partition {
    /// Only timed events are enabled; the state persists for a positive duration.
    Tangible,
    /// At least one immediate (zero-duration) event is enabled.
    Vanishing,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Tangible => write!(f, "tangible"),
            Partition::Vanishing => write!(f, "vanishing"),
        }
    }
}

/// A state handle tagged with its partition.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StateId {
    pub partition: Partition,
    pub handle: StateHandle,
}

impl StateId {
    pub const fn tangible(handle: StateHandle) -> Self {
        Self {
            partition: Partition::Tangible,
            handle,
        }
    }

    pub const fn vanishing(handle: StateHandle) -> Self {
        Self {
            partition: Partition::Vanishing,
            handle,
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.partition {
            Partition::Tangible => write!(f, "T{}", self.handle),
            Partition::Vanishing => write!(f, "V{}", self.handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_navigation() {
        let top = Level::new(2);
        let mid = top.below().unwrap();
        let bottom = mid.below().unwrap();

        assert_eq!(mid, Level::new(1));
        assert_eq!(bottom, Level::TERMINAL);
        assert!(bottom.is_terminal());
        assert!(!mid.is_terminal());
        assert_eq!(bottom.below(), None);
        assert!(bottom < mid && mid < top);
    }

    #[test]
    fn test_state_id_display() {
        assert_eq!(StateId::tangible(StateHandle::new(3)).to_string(), "Ts3");
        assert_eq!(StateId::vanishing(StateHandle::new(0)).to_string(), "Vs0");
        assert_eq!(Level::new(4).to_string(), "L4");
    }
}
