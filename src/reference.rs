use std::fmt::{Display, Formatter};

/// A generation-checked reference to a relation node.
///
/// The index addresses a slot of the node storage; the generation must match the
/// slot's current generation, so a reference to a recycled node is detected
/// instead of silently aliasing whatever reuses the slot.
///
/// Index 0 is reserved for the terminal node at level 0.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeRef {
    index: u32,
    generation: u32,
}

impl NodeRef {
    /// The terminal node.
    pub const TERMINAL: NodeRef = NodeRef {
        index: 0,
        generation: 0,
    };

    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Return the slot index of the reference.
    pub const fn index(self) -> usize {
        self.index as usize
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }

    pub const fn is_terminal(self) -> bool {
        self.index == 0
    }

    /// Pack the reference into a single integer (for hashing).
    pub(crate) const fn packed(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }
}

impl Display for NodeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_terminal() {
            write!(f, "@T")
        } else {
            write!(f, "@{}.{}", self.index, self.generation)
        }
    }
}
