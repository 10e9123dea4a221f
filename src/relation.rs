//! Canonical, hash-consed transition relation builder.
//!
//! The [`RelationBuilder`] encodes a set of `(from, to)` state pairs, optionally
//! weighted, as a layered matrix diagram. Level `k` branches on the value of
//! variable `k` in the source state (rows) and in the target state (columns).
//!
//! Edges are first inserted into a *batch*: a tree of `Building` nodes that is cheap
//! to extend. When the batch is flushed it is merged into the canonical root:
//!
//! 1. **accumulate**: the root's elements are merged into the batch column by
//!    column (root-only columns are shared, shared columns recurse, and level-1
//!    weights are summed);
//! 2. **reduce**: the batch is canonicalized bottom-up, each node either merging
//!    into an equal node from the level's [`Subtable`] or being promoted to a new
//!    canonical node;
//! 3. the reduced batch replaces the root and the old root is released, recycling
//!    every node that is no longer referenced.
//!
//! # Example
//!
//! ```
//! use ssgen_rs::relation::{RelationBuilder, RelationConfig};
//!
//! let mut builder = RelationBuilder::new(RelationConfig::new(2));
//! builder.add_edge(&[0, 0, 1], &[0, 1, 1]).unwrap();
//! builder.add_edge(&[0, 1, 1], &[0, 0, 0]).unwrap();
//! builder.flush_batch();
//!
//! let root = builder.root().unwrap();
//! assert_eq!(builder.edges(root).count(), 2);
//! assert!(builder.check_invariants().is_ok());
//! ```

use std::collections::HashMap;
use std::mem;

use log::{debug, info, warn};

use crate::error::{GenError, Result};
use crate::node::{self, Element, NodeStatus, Row};
use crate::reference::NodeRef;
use crate::storage::Storage;
use crate::subtable::Subtable;
use crate::types::Level;

/// Configuration of a [`RelationBuilder`].
#[derive(Debug, Clone)]
pub struct RelationConfig {
    /// Number of state variables `N` (the diagram has levels `1..=N`).
    pub num_variables: usize,
    /// Whether edges carry real weights (Markov chain rates).
    pub weighted: bool,
    /// Number of edges collected before an automatic flush.
    pub batch_size: usize,
    /// Maximal number of live nodes.
    pub max_nodes: usize,
    /// Relative tolerance of weight comparison during hash-consing.
    pub tolerance: f64,
}

impl RelationConfig {
    pub fn new(num_variables: usize) -> Self {
        Self {
            num_variables,
            weighted: false,
            batch_size: 1024,
            max_nodes: 1 << 24,
            tolerance: 1e-7,
        }
    }

    pub fn weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Counters describing a builder.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RelationStats {
    /// Distinct edges inserted into batches. Repeating an edge already in the
    /// current batch does not count (in a weighted relation its weight is summed).
    pub edges_added: usize,
    /// Edges dropped on input (weighted self-loops and zero weights).
    pub edges_dropped: usize,
    /// Non-empty batches merged into the root.
    pub batches: usize,
    /// Batch nodes that turned out to duplicate a canonical node.
    pub merges: usize,
    pub canonical_nodes: usize,
    pub building_nodes: usize,
    pub peak_nodes: usize,
    /// Approximate current memory footprint, in bytes.
    pub memory: usize,
    pub peak_memory: usize,
}

/// Builder of a canonical transition relation.
pub struct RelationBuilder {
    config: RelationConfig,
    pub(crate) storage: Storage,
    /// Unique tables, `subtables[k]` for level `k` (index 0 is unused).
    pub(crate) subtables: Vec<Subtable>,
    root: Option<NodeRef>,
    batch: Option<NodeRef>,
    batch_edges: usize,
    /// Forwarding nodes created by the current flush.
    merged: Vec<NodeRef>,
    /// Outstanding shared result handles.
    pub(crate) shared: HashMap<NodeRef, u32>,
    stats: RelationStats,
}

impl RelationBuilder {
    /// Create an empty builder.
    ///
    /// # Panics
    ///
    /// Panics if `num_variables` is zero or `batch_size` is zero.
    pub fn new(config: RelationConfig) -> Self {
        assert!(config.num_variables > 0, "Relation needs at least one variable");
        assert!(config.batch_size > 0, "Batch size must be positive");

        let subtables = (0..=config.num_variables)
            .map(|k| Subtable::new(Level::new(k as u32)))
            .collect();
        Self {
            storage: Storage::new(config.max_nodes),
            subtables,
            root: None,
            batch: None,
            batch_edges: 0,
            merged: Vec::new(),
            shared: HashMap::new(),
            stats: RelationStats::default(),
            config,
        }
    }

    pub fn config(&self) -> &RelationConfig {
        &self.config
    }
    pub fn num_variables(&self) -> usize {
        self.config.num_variables
    }
    pub fn is_weighted(&self) -> bool {
        self.config.weighted
    }
    /// Number of edges in the current (unflushed) batch.
    pub fn batch_edges(&self) -> usize {
        self.batch_edges
    }
    /// The canonical root, once at least one non-empty batch was flushed.
    pub fn root(&self) -> Option<NodeRef> {
        self.root
    }
    pub(crate) fn batch(&self) -> Option<NodeRef> {
        self.batch
    }
    pub fn level(&self, node: NodeRef) -> Level {
        self.storage.level(node)
    }
    /// Populated rows of a node, sorted by row index.
    pub fn rows(&self, node: NodeRef) -> &[Row] {
        self.storage.rows(node)
    }
    pub fn refcount(&self, node: NodeRef) -> u32 {
        self.storage.refcount(node)
    }
    pub fn status(&self, node: NodeRef) -> NodeStatus {
        self.storage.status(node)
    }

    pub fn stats(&self) -> RelationStats {
        RelationStats {
            canonical_nodes: self.storage.canonical(),
            building_nodes: self.storage.building(),
            peak_nodes: self.storage.peak_nodes(),
            memory: self.storage.memory_bytes(),
            peak_memory: self.storage.peak_bytes(),
            ..self.stats.clone()
        }
    }

    fn check_width(&self, from: &[u32], to: &[u32]) {
        let width = self.config.num_variables + 1;
        assert_eq!(from.len(), width, "Source encoding has foreign length");
        assert_eq!(to.len(), width, "Target encoding has foreign length");
    }

    /// Add an unweighted edge. In a weighted relation the edge gets weight 1.
    ///
    /// Both encodings are minterm slices of length `N + 1` (slot 0 is ignored).
    pub fn add_edge(&mut self, from: &[u32], to: &[u32]) -> Result<()> {
        self.check_width(from, to);
        if self.config.weighted && from[1..] == to[1..] {
            debug!("dropped self-loop");
            self.stats.edges_dropped += 1;
            return Ok(());
        }
        self.insert_path(from, to, 1.0)
    }

    /// Add a weighted edge, summing with an existing edge between the same states.
    ///
    /// Self-loops and zero weights are dropped. Fails if the relation is unweighted
    /// or the weight is negative or not finite.
    pub fn add_weighted_edge(&mut self, from: &[u32], to: &[u32], weight: f64) -> Result<()> {
        self.check_width(from, to);
        if !self.config.weighted {
            return Err(GenError::EngineFailed(
                "weighted edge added to an unweighted relation".to_string(),
            ));
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(GenError::EngineFailed(format!("invalid edge weight {}", weight)));
        }
        if weight == 0.0 {
            warn!("dropped edge with zero weight");
            self.stats.edges_dropped += 1;
            return Ok(());
        }
        if from[1..] == to[1..] {
            debug!("dropped self-loop");
            self.stats.edges_dropped += 1;
            return Ok(());
        }
        self.insert_path(from, to, weight)
    }

    /// Insert one path into the batch, creating `Building` nodes on the way down.
    ///
    /// Missing nodes are allocated before anything is linked into the batch, so a
    /// failed allocation leaves the batch as it was.
    fn insert_path(&mut self, from: &[u32], to: &[u32], weight: f64) -> Result<()> {
        let num_vars = self.config.num_variables;
        let top = match self.batch {
            Some(batch) => batch,
            None => self.storage.alloc(Level::new(num_vars as u32))?,
        };

        let mut node = top;
        let mut k = num_vars;
        while k > 1 {
            match node::find(self.storage.rows(node), from[k], to[k]) {
                Some(e) => node = e.down,
                None => break,
            }
            k -= 1;
        }

        let mut chain = Vec::with_capacity(k - 1);
        for level in (1..k).rev() {
            match self.storage.alloc(Level::new(level as u32)) {
                Ok(child) => chain.push(child),
                Err(err) => {
                    for child in chain {
                        self.storage.discard(child);
                    }
                    if self.batch.is_none() {
                        self.storage.discard(top);
                    }
                    debug!("insertion failed at level {}: {}", level, err);
                    return Err(err);
                }
            }
        }
        self.batch = Some(top);

        for child in chain {
            let element = Element {
                column: to[k],
                weight: 1.0,
                down: child,
            };
            self.storage.insert(node, from[k], element);
            node = child;
            k -= 1;
        }

        let (row, column) = (from[1], to[1]);
        let weighted = self.config.weighted;
        match node::find_mut(self.storage.rows_mut(node), row, column) {
            Some(e) => {
                if weighted {
                    e.weight += weight;
                }
                return Ok(());
            }
            None => self.storage.insert(
                node,
                row,
                Element {
                    column,
                    weight,
                    down: NodeRef::TERMINAL,
                },
            ),
        }

        self.batch_edges += 1;
        self.stats.edges_added += 1;
        if self.batch_edges >= self.config.batch_size {
            self.flush_batch();
        }
        Ok(())
    }

    /// Merge the current batch into the canonical root.
    ///
    /// Does nothing if the batch is empty. Afterwards no `Building` or `Merged`
    /// node remains.
    pub fn flush_batch(&mut self) {
        let Some(batch) = self.batch.take() else {
            return;
        };
        let edges = mem::take(&mut self.batch_edges);

        if let Some(root) = self.root {
            self.accumulate(batch, root);
        }
        let (new_root, _) = self.reduce(batch, true);

        if let Some(old_root) = self.root.replace(new_root) {
            self.unlink(old_root);
        }
        for node in mem::take(&mut self.merged) {
            self.storage.recycle(node);
        }

        self.stats.batches += 1;
        info!(
            "flushed batch #{} with {} edges: {} canonical nodes, {} merges so far",
            self.stats.batches,
            edges,
            self.storage.canonical(),
            self.stats.merges
        );
    }

    /// Merge the elements of the canonical node `root` into the batch node `batch`.
    fn accumulate(&mut self, batch: NodeRef, root: NodeRef) {
        let at_bottom = self.storage.level(batch) == Level::new(1);
        let weighted = self.config.weighted;
        let root_rows = self.storage.rows(root).to_vec();

        for row in root_rows {
            for re in row.elements {
                let Some(be) = node::find(self.storage.rows(batch), row.index, re.column).copied() else {
                    // Root-only column: share the canonical child.
                    self.storage.inc_ref(re.down);
                    self.storage.insert(batch, row.index, re);
                    continue;
                };

                if at_bottom {
                    if weighted {
                        if let Some(e) = node::find_mut(self.storage.rows_mut(batch), row.index, re.column) {
                            e.weight = be.weight + re.weight;
                        }
                    }
                    continue;
                }

                if weighted && be.weight != re.weight {
                    // b * B + c * R == c * (b/c * B + R)
                    self.scale(be.down, be.weight / re.weight);
                    if let Some(e) = node::find_mut(self.storage.rows_mut(batch), row.index, re.column) {
                        e.weight = re.weight;
                    }
                }
                self.accumulate(be.down, re.down);
            }
        }
    }

    /// Multiply every element weight of a `Building` node by `factor`.
    fn scale(&mut self, node: NodeRef, factor: f64) {
        for row in self.storage.rows_mut(node) {
            for e in &mut row.elements {
                e.weight *= factor;
            }
        }
    }

    /// Canonicalize a batch node bottom-up.
    ///
    /// Returns the canonical node and the factor that must be multiplied into the
    /// parent's element weight.
    fn reduce(&mut self, node: NodeRef, top: bool) -> (NodeRef, f64) {
        if self.storage.status(node) != NodeStatus::Building {
            return (node, 1.0);
        }

        let children: Vec<(u32, u32, NodeRef)> = self
            .storage
            .rows(node)
            .iter()
            .flat_map(|r| r.elements.iter().map(move |e| (r.index, e.column, e.down)))
            .filter(|&(_, _, down)| !down.is_terminal() && self.storage.status(down) == NodeStatus::Building)
            .collect();
        for (row, column, child) in children {
            let (canonical, factor) = self.reduce(child, false);
            if let Some(e) = node::find_mut(self.storage.rows_mut(node), row, column) {
                e.down = canonical;
                e.weight *= factor;
            }
        }

        let factor = if self.config.weighted && !top {
            self.normalize(node)
        } else {
            1.0
        };

        let level = self.storage.level(node);
        let signature = node::signature(level, self.storage.rows(node));
        let tolerance = self.config.tolerance;
        let storage = &self.storage;
        let found = self.subtables[level.index()].find(signature, |other| {
            node::rows_equal(storage.rows(other), storage.rows(node), tolerance)
        });

        match found {
            Some(target) => {
                self.storage.inc_ref(target);
                let rows = self.storage.forward(node, target);
                self.merged.push(node);
                self.stats.merges += 1;
                for e in node::elements(&rows) {
                    self.unlink(e.down);
                }
                debug!("merged {} into {} at {}", node, target, level);
                (target, factor)
            }
            None => {
                self.storage.promote(node, signature);
                self.subtables[level.index()].insert(signature, node);
                (node, factor)
            }
        }
    }

    /// Drop one parent pointer, recycling the node (and recursively its children)
    /// when nothing references it anymore.
    fn unlink(&mut self, node: NodeRef) {
        if node.is_terminal() || self.storage.dec_ref(node) > 0 {
            return;
        }
        let (level, signature, rows) = self.storage.retire(node);
        self.subtables[level.index()].remove(signature, node);
        for e in node::elements(&rows) {
            self.unlink(e.down);
        }
    }

    /// Tear down the current batch without merging it.
    pub fn discard_batch(&mut self) {
        if let Some(batch) = self.batch.take() {
            debug!("discarding batch with {} edges", self.batch_edges);
            self.batch_edges = 0;
            self.discard_node(batch);
        }
    }

    fn discard_node(&mut self, node: NodeRef) {
        match self.storage.status(node) {
            NodeStatus::Building => {
                let rows = self.storage.discard(node);
                for e in node::elements(&rows) {
                    self.discard_node(e.down);
                }
            }
            NodeStatus::Canonical => self.unlink(node),
            NodeStatus::Merged | NodeStatus::Recycled => {}
        }
    }

    /// Take a shared handle to the current root.
    ///
    /// The handle keeps the relation alive after the root is replaced by later
    /// flushes; it must be given back with [`release`][RelationBuilder::release].
    pub fn share_result(&mut self) -> Option<NodeRef> {
        let root = self.root?;
        self.storage.inc_ref(root);
        *self.shared.entry(root).or_default() += 1;
        Some(root)
    }

    /// Give back a handle obtained from [`share_result`][RelationBuilder::share_result].
    ///
    /// # Panics
    ///
    /// Panics if `node` is not an outstanding shared handle.
    pub fn release(&mut self, node: NodeRef) {
        let count = self
            .shared
            .get_mut(&node)
            .unwrap_or_else(|| panic!("Node {} is not a shared result", node));
        *count -= 1;
        if *count == 0 {
            self.shared.remove(&node);
        }
        self.unlink(node);
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn weighted(num_vars: usize) -> RelationBuilder {
        RelationBuilder::new(RelationConfig::new(num_vars).weighted(true))
    }

    fn edge_set(builder: &RelationBuilder) -> Vec<(Vec<u32>, Vec<u32>, f64)> {
        let mut edges: Vec<_> = match builder.root() {
            Some(root) => builder.edges(root).collect(),
            None => Vec::new(),
        };
        edges.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        edges
    }

    #[test]
    fn test_empty_flush_is_noop() {
        let mut builder = RelationBuilder::new(RelationConfig::new(3));
        builder.flush_batch();
        assert_eq!(builder.root(), None);
        assert_eq!(builder.stats().batches, 0);
        assert_eq!(builder.storage.live(), 0);
    }

    #[test]
    fn test_single_weighted_edge() {
        let mut builder = weighted(2);
        builder.add_weighted_edge(&[0, 1, 0], &[0, 0, 1], 2.0).unwrap();
        builder.flush_batch();

        let root = builder.root().unwrap();
        assert_eq!(builder.level(root), Level::new(2));
        assert_eq!(builder.refcount(root), 1);

        let rows = builder.rows(root);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].index, 0);
        let top = rows[0].elements[0];
        assert_eq!(top.column, 1);
        assert_eq!(top.weight, 2.0);

        let rows = builder.rows(top.down);
        assert_eq!(rows[0].index, 1);
        assert_eq!(rows[0].elements[0].column, 0);
        assert_eq!(rows[0].elements[0].weight, 1.0);
        assert!(rows[0].elements[0].down.is_terminal());

        assert_eq!(edge_set(&builder), vec![(vec![0, 1, 0], vec![0, 0, 1], 2.0)]);
        builder.check_invariants().unwrap();
    }

    #[test]
    fn test_weights_of_repeated_edge_are_summed() {
        let mut builder = weighted(2);
        builder.add_weighted_edge(&[0, 1, 1], &[0, 2, 2], 0.5).unwrap();
        builder.add_weighted_edge(&[0, 1, 1], &[0, 2, 2], 0.25).unwrap();
        builder.flush_batch();
        builder.add_weighted_edge(&[0, 1, 1], &[0, 2, 2], 1.0).unwrap();
        builder.flush_batch();

        let edges = edge_set(&builder);
        assert_eq!(edges.len(), 1);
        assert!((edges[0].2 - 1.75).abs() < 1e-12);
        builder.check_invariants().unwrap();
    }

    #[test]
    fn test_weighted_self_loop_and_zero_dropped() {
        let mut builder = weighted(1);
        builder.add_weighted_edge(&[0, 3], &[0, 3], 5.0).unwrap();
        builder.add_weighted_edge(&[0, 3], &[0, 4], 0.0).unwrap();
        builder.add_edge(&[0, 4], &[0, 4]).unwrap();
        builder.flush_batch();

        assert_eq!(builder.root(), None);
        assert_eq!(builder.stats().edges_dropped, 3);
    }

    #[test]
    fn test_unweighted_self_loop_kept() {
        let mut builder = RelationBuilder::new(RelationConfig::new(1));
        builder.add_edge(&[0, 3], &[0, 3]).unwrap();
        builder.flush_batch();
        assert_eq!(edge_set(&builder), vec![(vec![0, 3], vec![0, 3], 1.0)]);
    }

    #[test]
    fn test_invalid_weights() {
        let mut builder = weighted(1);
        assert!(matches!(
            builder.add_weighted_edge(&[0, 0], &[0, 1], -1.0),
            Err(GenError::EngineFailed(_))
        ));
        assert!(matches!(
            builder.add_weighted_edge(&[0, 0], &[0, 1], f64::NAN),
            Err(GenError::EngineFailed(_))
        ));

        let mut unweighted = RelationBuilder::new(RelationConfig::new(1));
        assert!(matches!(
            unweighted.add_weighted_edge(&[0, 0], &[0, 1], 1.0),
            Err(GenError::EngineFailed(_))
        ));
    }

    #[test]
    fn test_auto_flush() {
        let mut builder = RelationBuilder::new(RelationConfig::new(1).batch_size(2));
        builder.add_edge(&[0, 0], &[0, 1]).unwrap();
        assert_eq!(builder.batch_edges(), 1);
        builder.add_edge(&[0, 1], &[0, 2]).unwrap();
        assert_eq!(builder.batch_edges(), 0);
        assert_eq!(builder.stats().batches, 1);
        assert!(builder.root().is_some());
    }

    #[test]
    fn test_sharing_across_rows() {
        // Two sources with identical lower structure share the level-1 node.
        let mut builder = RelationBuilder::new(RelationConfig::new(2));
        builder.add_edge(&[0, 0, 0], &[0, 1, 0]).unwrap();
        builder.add_edge(&[0, 0, 1], &[0, 1, 1]).unwrap();
        builder.flush_batch();

        let root = builder.root().unwrap();
        let rows = builder.rows(root);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].elements[0].down, rows[1].elements[0].down);
        assert_eq!(builder.refcount(rows[0].elements[0].down), 2);
        assert_eq!(builder.stats().canonical_nodes, 2);
        assert_eq!(builder.stats().merges, 1);
        builder.check_invariants().unwrap();
    }

    #[test]
    fn test_root_replacement_reclaims_nodes() {
        let mut builder = RelationBuilder::new(RelationConfig::new(2));
        builder.add_edge(&[0, 0, 0], &[0, 1, 0]).unwrap();
        builder.flush_batch();
        let first = builder.root().unwrap();

        builder.add_edge(&[0, 1, 1], &[0, 0, 1]).unwrap();
        builder.flush_batch();
        let second = builder.root().unwrap();

        assert_ne!(first, second);
        assert!(!builder.storage.is_valid(first));
        assert_eq!(builder.storage.building(), 0);
        assert_eq!(builder.storage.merged(), 0);
        assert_eq!(edge_set(&builder).len(), 2);
        builder.check_invariants().unwrap();
    }

    #[test]
    fn test_duplicate_flush_keeps_root() {
        let mut builder = RelationBuilder::new(RelationConfig::new(2));
        builder.add_edge(&[0, 0, 0], &[0, 1, 0]).unwrap();
        builder.flush_batch();
        let first = builder.root().unwrap();

        builder.add_edge(&[0, 0, 0], &[0, 1, 0]).unwrap();
        builder.flush_batch();
        assert_eq!(builder.root(), Some(first));
        assert_eq!(builder.refcount(first), 1);
        builder.check_invariants().unwrap();
    }

    #[test]
    fn test_shared_result_survives_flush() {
        let mut builder = RelationBuilder::new(RelationConfig::new(1));
        builder.add_edge(&[0, 0], &[0, 1]).unwrap();
        builder.flush_batch();

        let shared = builder.share_result().unwrap();
        assert_eq!(builder.refcount(shared), 2);

        builder.add_edge(&[0, 1], &[0, 2]).unwrap();
        builder.flush_batch();
        assert_ne!(builder.root(), Some(shared));
        assert_eq!(builder.refcount(shared), 1);
        assert_eq!(builder.edges(shared).count(), 1);
        builder.check_invariants().unwrap();

        builder.release(shared);
        assert!(!builder.storage.is_valid(shared));
        builder.check_invariants().unwrap();
    }

    #[test]
    fn test_discard_batch() {
        let mut builder = RelationBuilder::new(RelationConfig::new(2));
        builder.add_edge(&[0, 0, 0], &[0, 1, 0]).unwrap();
        builder.flush_batch();
        let live = builder.storage.live();

        builder.add_edge(&[0, 2, 2], &[0, 1, 0]).unwrap();
        builder.discard_batch();
        assert_eq!(builder.storage.live(), live);
        assert_eq!(builder.batch_edges(), 0);
        assert_eq!(edge_set(&builder).len(), 1);
        builder.check_invariants().unwrap();
    }

    #[test]
    fn test_out_of_memory() {
        let mut builder = RelationBuilder::new(RelationConfig::new(3).max_nodes(2));
        assert_eq!(
            builder.add_edge(&[0, 0, 0, 0], &[0, 1, 1, 1]),
            Err(GenError::OutOfMemory { limit: 2 })
        );
        builder.discard_batch();
        assert_eq!(builder.storage.live(), 0);
    }

    #[test]
    fn test_failed_insertion_leaves_batch_intact() {
        let mut builder = RelationBuilder::new(RelationConfig::new(3).max_nodes(2));
        assert!(builder.add_edge(&[0, 0, 0, 0], &[0, 1, 1, 1]).is_err());
        assert_eq!(builder.storage.live(), 0);
        assert_eq!(builder.batch(), None);
        builder.flush_batch();
        assert_eq!(builder.root(), None);
        builder.check_invariants().unwrap();

        // The second path needs two new nodes; only one fits.
        let mut builder = RelationBuilder::new(RelationConfig::new(3).max_nodes(4));
        builder.add_edge(&[0, 0, 0, 0], &[0, 1, 1, 1]).unwrap();
        assert_eq!(
            builder.add_edge(&[0, 0, 0, 2], &[0, 1, 1, 3]),
            Err(GenError::OutOfMemory { limit: 4 })
        );
        assert_eq!(builder.storage.live(), 3);
        assert_eq!(builder.batch_edges(), 1);

        builder.flush_batch();
        builder.check_invariants().unwrap();
        assert_eq!(edge_set(&builder), vec![(vec![0, 0, 0, 0], vec![0, 1, 1, 1], 1.0)]);
    }

    #[test]
    fn test_repeated_edge_counted_once() {
        let mut builder = RelationBuilder::new(RelationConfig::new(2));
        builder.add_edge(&[0, 1, 1], &[0, 2, 2]).unwrap();
        builder.add_edge(&[0, 1, 1], &[0, 2, 2]).unwrap();
        assert_eq!(builder.batch_edges(), 1);
        assert_eq!(builder.stats().edges_added, 1);

        let mut weighted = RelationBuilder::new(RelationConfig::new(2).weighted(true));
        weighted.add_weighted_edge(&[0, 1, 1], &[0, 2, 2], 1.5).unwrap();
        weighted.add_weighted_edge(&[0, 1, 1], &[0, 2, 2], 2.5).unwrap();
        assert_eq!(weighted.stats().edges_added, 1);
        weighted.flush_batch();
        let root = weighted.root().unwrap();
        assert_eq!(weighted.total_weight(root), 4.0);
    }
}
