//! Per-level unique table for canonical relation nodes.
//!
//! The builder keeps one subtable per level:
//!
//! ```text
//! subtables[1] → canonical nodes at level 1 (variable x1)
//! subtables[2] → canonical nodes at level 2 (variable x2)
//! ...
//! ```
//!
//! Each subtable maps a structural signature to the nodes carrying it. The signature
//! ignores weights, so several nodes may share a bucket; the caller supplies the full
//! equality test (including the weight tolerance) when probing.

use std::collections::HashMap;

use crate::reference::NodeRef;
use crate::types::Level;

/// Unique table of canonical nodes at a single level.
#[derive(Debug, Clone)]
pub struct Subtable {
    /// The level of all nodes in this subtable.
    pub level: Level,

    /// Map from signature to the canonical nodes with that signature.
    buckets: HashMap<u64, Vec<NodeRef>>,
    len: usize,
}

impl Subtable {
    /// Create a new empty subtable for the given level.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            buckets: HashMap::new(),
            len: 0,
        }
    }

    /// Find a node with the given signature satisfying `eq`.
    pub fn find(&self, signature: u64, mut eq: impl FnMut(NodeRef) -> bool) -> Option<NodeRef> {
        self.buckets
            .get(&signature)?
            .iter()
            .copied()
            .find(|&r| eq(r))
    }

    /// Insert a node into the subtable.
    pub fn insert(&mut self, signature: u64, node: NodeRef) {
        self.buckets.entry(signature).or_default().push(node);
        self.len += 1;
    }

    /// Remove a node from the subtable.
    ///
    /// Returns whether the node was present.
    pub fn remove(&mut self, signature: u64, node: NodeRef) -> bool {
        let Some(bucket) = self.buckets.get_mut(&signature) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|&r| r == node) else {
            return false;
        };
        bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&signature);
        }
        self.len -= 1;
        true
    }

    /// Get the number of nodes in this subtable.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the subtable is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over all `(signature, node)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u64, NodeRef)> + '_ {
        self.buckets
            .iter()
            .flat_map(|(&sig, nodes)| nodes.iter().map(move |&r| (sig, r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtable_basic() {
        let mut st = Subtable::new(Level::new(1));
        let a = NodeRef::new(1, 0);

        assert!(st.find(7, |_| true).is_none());

        st.insert(7, a);
        assert_eq!(st.find(7, |r| r == a), Some(a));
        assert_eq!(st.len(), 1);

        assert!(st.remove(7, a));
        assert!(!st.remove(7, a));
        assert!(st.find(7, |_| true).is_none());
        assert!(st.is_empty());
    }

    #[test]
    fn test_subtable_shared_signature() {
        let mut st = Subtable::new(Level::new(2));
        let a = NodeRef::new(1, 0);
        let b = NodeRef::new(2, 0);
        let c = NodeRef::new(3, 4);

        // Nodes differing only in weights collide on purpose.
        st.insert(10, a);
        st.insert(10, b);
        st.insert(20, c);

        assert_eq!(st.len(), 3);
        assert_eq!(st.find(10, |r| r == b), Some(b));
        assert_eq!(st.find(10, |r| r == c), None);
        assert_eq!(st.find(20, |_| true), Some(c));
        assert_eq!(st.iter().count(), 3);

        st.remove(10, a);
        assert_eq!(st.find(10, |_| true), Some(b));
    }
}
