//! Iterator over the edges encoded by a relation node.
//!
//! Every path from a level-`N` node down to the terminal is one edge: the row indices
//! along the path spell the source encoding, the columns spell the target encoding,
//! and the product of the element weights is the edge weight.
//!
//! # Example
//!
//! ```
//! use ssgen_rs::relation::{RelationBuilder, RelationConfig};
//!
//! let mut builder = RelationBuilder::new(RelationConfig::new(2).weighted(true));
//! builder.add_weighted_edge(&[0, 1, 0], &[0, 0, 1], 2.0).unwrap();
//! builder.flush_batch();
//!
//! let root = builder.root().unwrap();
//! let edges: Vec<_> = builder.edges(root).collect();
//! assert_eq!(edges, vec![(vec![0, 1, 0], vec![0, 0, 1], 2.0)]);
//! ```
//!
//! Note: the number of edges can be exponential in the number of nodes.

use crate::reference::NodeRef;
use crate::relation::RelationBuilder;

impl RelationBuilder {
    /// Returns an iterator over all edges `(from, to, weight)` encoded below `node`.
    ///
    /// Encodings are minterm-shaped: slot 0 is zero, slot `k` is the value of
    /// variable `k`. Edges come in lexicographic order of `(from[N], to[N], ...)`.
    pub fn edges(&self, node: NodeRef) -> RelationEdges<'_> {
        RelationEdges::new(self, node)
    }
}

/// Frame on the exploration stack.
#[derive(Debug)]
struct StackFrame {
    node: NodeRef,
    /// Position of the next element to visit: (row position, element position).
    row: usize,
    element: usize,
    /// Product of the weights above this node.
    weight: f64,
}

/// An iterator over the edges of a relation.
///
/// Created by [`RelationBuilder::edges()`].
///
/// Uses depth-first traversal with backtracking. The current source and target
/// encodings are kept in two vectors that are overwritten level by level.
pub struct RelationEdges<'a> {
    builder: &'a RelationBuilder,
    stack: Vec<StackFrame>,
    from: Vec<u32>,
    to: Vec<u32>,
}

impl<'a> RelationEdges<'a> {
    pub fn new(builder: &'a RelationBuilder, node: NodeRef) -> Self {
        let width = builder.num_variables() + 1;
        let stack = if node.is_terminal() {
            Vec::new()
        } else {
            vec![StackFrame {
                node,
                row: 0,
                element: 0,
                weight: 1.0,
            }]
        };
        RelationEdges {
            builder,
            stack,
            from: vec![0; width],
            to: vec![0; width],
        }
    }
}

impl Iterator for RelationEdges<'_> {
    type Item = (Vec<u32>, Vec<u32>, f64);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let rows = self.builder.rows(frame.node);

            let Some(row) = rows.get(frame.row) else {
                // All rows explored - backtrack
                self.stack.pop();
                continue;
            };
            let Some(&e) = row.elements.get(frame.element) else {
                frame.row += 1;
                frame.element = 0;
                continue;
            };
            frame.element += 1;

            let level = self.builder.level(frame.node).index();
            self.from[level] = row.index;
            self.to[level] = e.column;
            let weight = frame.weight * e.weight;

            if e.down.is_terminal() {
                return Some((self.from.clone(), self.to.clone(), weight));
            }
            self.stack.push(StackFrame {
                node: e.down,
                row: 0,
                element: 0,
                weight,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::relation::{RelationBuilder, RelationConfig};

    #[test]
    fn test_edges_in_order() {
        let mut builder = RelationBuilder::new(RelationConfig::new(2));
        builder.add_edge(&[0, 1, 1], &[0, 0, 0]).unwrap();
        builder.add_edge(&[0, 0, 0], &[0, 1, 0]).unwrap();
        builder.add_edge(&[0, 0, 0], &[0, 1, 2]).unwrap();
        builder.flush_batch();

        let root = builder.root().unwrap();
        let edges: Vec<_> = builder.edges(root).map(|(from, to, _)| (from, to)).collect();
        for (from, to) in &edges {
            println!("  {:?} -> {:?}", from, to);
        }
        assert_eq!(
            edges,
            vec![
                (vec![0, 0, 0], vec![0, 1, 0]),
                (vec![0, 0, 0], vec![0, 1, 2]),
                (vec![0, 1, 1], vec![0, 0, 0]),
            ]
        );
    }

    #[test]
    fn test_edges_of_terminal() {
        let builder = RelationBuilder::new(RelationConfig::new(1));
        assert_eq!(builder.edges(crate::reference::NodeRef::TERMINAL).count(), 0);
    }

    #[test]
    fn test_edge_weights_are_path_products() {
        let mut builder = RelationBuilder::new(RelationConfig::new(2).weighted(true));
        builder.add_weighted_edge(&[0, 0, 0], &[0, 1, 1], 1.5).unwrap();
        builder.add_weighted_edge(&[0, 0, 0], &[0, 2, 1], 3.0).unwrap();
        builder.flush_batch();

        let root = builder.root().unwrap();
        let weights: Vec<f64> = builder.edges(root).map(|(_, _, w)| w).collect();
        assert_eq!(weights, vec![1.5, 3.0]);
    }
}
