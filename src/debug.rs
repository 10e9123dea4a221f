//! Debug utilities for inspecting relation structure.
//!
//! This module provides helpers for exploring the diagram and for verifying the
//! structural invariants of a [`RelationBuilder`]. These are primarily useful in
//! tests and during development.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use crate::node::{self, NodeState, NodeStatus};
use crate::reference::NodeRef;
use crate::relation::RelationBuilder;
use crate::types::Level;

/// Detailed information about a single relation node.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub node_ref: NodeRef,
    pub status: NodeStatus,
    /// Level of the node (None for forwarded and recycled nodes)
    pub level: Option<Level>,
    pub refcount: u32,
    pub rows: usize,
    pub elements: usize,
    /// Distinct children, in first-seen order
    pub children: Vec<NodeRef>,
}

impl std::fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.node_ref.is_terminal() {
            return write!(f, "TERMINAL");
        }
        write!(
            f,
            "{}({:?}, level={}, rc={}, rows={}, elements={})",
            self.node_ref,
            self.status,
            self.level.map_or("?".to_string(), |l| l.to_string()),
            self.refcount,
            self.rows,
            self.elements,
        )
    }
}

/// A tree representation of a relation for debugging.
#[derive(Debug, Clone)]
pub struct RelationTree {
    pub root: NodeRef,
    pub nodes: Vec<NodeInfo>,
}

impl std::fmt::Display for RelationTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Relation Tree (root = {}):", self.root)?;
        for node in &self.nodes {
            writeln!(f, "  {}", node)?;
        }
        Ok(())
    }
}

impl RelationBuilder {
    /// Get detailed information about a single node.
    pub fn node_info(&self, node_ref: NodeRef) -> NodeInfo {
        let status = self.storage.status(node_ref);
        let (level, rows) = match self.storage.state(node_ref) {
            NodeState::Building { level, rows } | NodeState::Canonical { level, rows, .. } => {
                (Some(*level), rows.as_slice())
            }
            _ => (None, &[][..]),
        };

        let mut children = Vec::new();
        for e in node::elements(rows) {
            if !children.contains(&e.down) {
                children.push(e.down);
            }
        }

        NodeInfo {
            node_ref,
            status,
            level,
            refcount: self.storage.refcount(node_ref),
            rows: rows.len(),
            elements: node::element_count(rows),
            children,
        }
    }

    /// Get a tree representation of a relation for debugging.
    ///
    /// Returns all nodes reachable from the root, sorted from the top level down.
    pub fn debug_tree(&self, root: NodeRef) -> RelationTree {
        let mut nodes = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![root];

        while let Some(node_ref) = stack.pop() {
            if !visited.insert(node_ref) {
                continue;
            }
            let info = self.node_info(node_ref);
            stack.extend(info.children.iter().copied());
            nodes.push(info);
        }

        nodes.sort_by_key(|n| std::cmp::Reverse(n.level.map_or(0, |l| l.index())));
        RelationTree { root, nodes }
    }

    /// Print a compact representation of a relation.
    pub fn debug_string(&self, root: NodeRef) -> String {
        let mut result = String::new();
        let tree = self.debug_tree(root);

        writeln!(&mut result, "Relation {} (size={}):", root, tree.nodes.len()).unwrap();
        for node in &tree.nodes {
            writeln!(&mut result, "  {}", node).unwrap();
        }
        result
    }

    /// Dump the complete builder state for debugging.
    pub fn dump_state(&self) -> String {
        let mut result = String::new();

        writeln!(&mut result, "=== Relation State ===").unwrap();
        writeln!(&mut result, "root={:?} batch={:?}", self.root(), self.batch()).unwrap();
        writeln!(&mut result, "{:?}", self.stats()).unwrap();
        writeln!(&mut result, "Canonical nodes by level:").unwrap();
        for subtable in self.subtables.iter().skip(1).rev() {
            if !subtable.is_empty() {
                let nodes: Vec<String> = subtable.iter().map(|(_, r)| r.to_string()).collect();
                writeln!(&mut result, "  {}: [{}]", subtable.level, nodes.join(", ")).unwrap();
            }
        }

        result
    }

    /// Verify the structural invariants of the builder.
    ///
    /// Returns a description of the first violated invariant:
    ///
    /// - rows and columns of canonical nodes are strictly sorted and non-empty;
    /// - canonical nodes point only one level down, to canonical nodes or the terminal;
    /// - every refcount equals the number of parent pointers, counting the root slot
    ///   and every shared result handle as parents;
    /// - canonical nodes are registered in their level's subtable, and no two of them
    ///   are equal;
    /// - every canonical node is reachable (no leaks), and no `Merged` node survives a
    ///   flush.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut parents: HashMap<NodeRef, u32> = HashMap::new();
        let mut canonical = Vec::new();

        for (r, state) in self.storage.iter_live() {
            match state {
                NodeState::Canonical { level, rows, signature, .. } => {
                    self.check_canonical_node(r, *level, rows, *signature)?;
                    for e in node::elements(rows) {
                        *parents.entry(e.down).or_default() += 1;
                    }
                    canonical.push(r);
                }
                NodeState::Building { rows, .. } => {
                    if self.batch().is_none() {
                        return Err(format!("Building node {} outside of a batch", r));
                    }
                    for e in node::elements(rows) {
                        if !e.down.is_terminal() && self.storage.status(e.down) == NodeStatus::Canonical {
                            *parents.entry(e.down).or_default() += 1;
                        }
                    }
                }
                NodeState::Merged { target } => {
                    return Err(format!("Merged node {} (into {}) survived a flush", r, target));
                }
                NodeState::Recycled { .. } => unreachable!(),
            }
        }

        if let Some(root) = self.root() {
            if !self.storage.is_valid(root) {
                return Err(format!("Root {} is stale", root));
            }
            *parents.entry(root).or_default() += 1;
        }
        for (&r, &count) in &self.shared {
            if !self.storage.is_valid(r) {
                return Err(format!("Shared result {} is stale", r));
            }
            *parents.entry(r).or_default() += count;
        }

        for &r in &canonical {
            let expected = parents.get(&r).copied().unwrap_or(0);
            let actual = self.storage.refcount(r);
            if expected != actual {
                return Err(format!("Node {} has refcount {} but {} parents", r, actual, expected));
            }
            if actual == 0 {
                return Err(format!("Node {} is canonical but unreferenced", r));
            }
        }

        let registered: usize = self.subtables.iter().map(|s| s.len()).sum();
        if registered != canonical.len() {
            return Err(format!(
                "{} canonical nodes but {} subtable entries",
                canonical.len(),
                registered
            ));
        }

        // Reachability from the root, the shared results and the batch.
        let mut reachable = HashSet::new();
        let mut stack: Vec<NodeRef> = self.root().into_iter().chain(self.shared.keys().copied()).collect();
        stack.extend(self.batch());
        while let Some(r) = stack.pop() {
            if r.is_terminal() || !reachable.insert(r) {
                continue;
            }
            if !self.storage.is_valid(r) {
                return Err(format!("Recycled node {} is reachable", r));
            }
            stack.extend(node::elements(self.storage.rows(r)).map(|e| e.down));
        }
        if let Some(&leak) = canonical.iter().find(|r| !reachable.contains(r)) {
            return Err(format!("Node {} is leaked", leak));
        }

        Ok(())
    }

    fn check_canonical_node(&self, r: NodeRef, level: Level, rows: &[node::Row], signature: u64) -> Result<(), String> {
        if rows.is_empty() {
            return Err(format!("Node {} has no rows", r));
        }
        if rows.windows(2).any(|w| w[0].index >= w[1].index) {
            return Err(format!("Rows of node {} are not sorted", r));
        }
        for row in rows {
            if row.elements.is_empty() {
                return Err(format!("Row {} of node {} is empty", row.index, r));
            }
            if row.elements.windows(2).any(|w| w[0].column >= w[1].column) {
                return Err(format!("Columns of row {} of node {} are not sorted", row.index, r));
            }
        }

        for e in node::elements(rows) {
            match level.below() {
                Some(below) if below.is_terminal() => {
                    if !e.down.is_terminal() {
                        return Err(format!("Level-1 node {} points to {}", r, e.down));
                    }
                }
                Some(below) => {
                    if !self.storage.is_valid(e.down) {
                        return Err(format!("Node {} points to stale {}", r, e.down));
                    }
                    if self.storage.status(e.down) != NodeStatus::Canonical {
                        return Err(format!("Canonical node {} points to non-canonical {}", r, e.down));
                    }
                    if self.storage.level(e.down) != below {
                        return Err(format!("Node {} at {} skips to {}", r, level, e.down));
                    }
                }
                None => return Err(format!("Node {} is at the terminal level", r)),
            }
        }

        if node::signature(level, rows) != signature {
            return Err(format!("Node {} has an outdated signature", r));
        }
        let subtable = &self.subtables[level.index()];
        if subtable.find(signature, |other| other == r).is_none() {
            return Err(format!("Node {} is missing from the subtable", r));
        }
        let tolerance = self.config().tolerance;
        if let Some(twin) = subtable.find(signature, |other| {
            other != r && node::rows_equal(self.storage.rows(other), rows, tolerance)
        }) {
            return Err(format!("Nodes {} and {} are equal", r, twin));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::relation::{RelationBuilder, RelationConfig};

    fn sample() -> RelationBuilder {
        let mut builder = RelationBuilder::new(RelationConfig::new(2));
        builder.add_edge(&[0, 0, 0], &[0, 1, 0]).unwrap();
        builder.add_edge(&[0, 0, 1], &[0, 1, 1]).unwrap();
        builder.flush_batch();
        builder
    }

    #[test]
    fn test_debug_tree() {
        let builder = sample();
        let root = builder.root().unwrap();

        let tree = builder.debug_tree(root);
        println!("{}", tree);
        assert_eq!(tree.root, root);
        // Root, one shared level-1 node, and the terminal.
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.nodes[0].node_ref, root);
        assert_eq!(tree.nodes[0].children.len(), 1);
    }

    #[test]
    fn test_debug_string() {
        let builder = sample();
        let s = builder.debug_string(builder.root().unwrap());
        assert!(s.contains("level=L2"), "Expected level=L2 in: {}", s);
        assert!(s.contains("rc=2"), "Expected rc=2 in: {}", s);
        assert!(s.contains("TERMINAL"), "Expected TERMINAL in: {}", s);
    }

    #[test]
    fn test_invariants_hold_with_open_batch() {
        let mut builder = sample();
        builder.add_edge(&[0, 2, 2], &[0, 0, 0]).unwrap();
        builder.check_invariants().unwrap();
        builder.discard_batch();
        builder.check_invariants().unwrap();
        println!("{}", builder.dump_state());
    }
}
