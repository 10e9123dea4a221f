//! Destinations for the edges discovered during exploration.
//!
//! The explorer is agnostic of how edges are stored: it feeds an [`EdgeSink`]. The
//! canonical [`RelationBuilder`] is the main implementation; [`EdgeLog`] simply keeps
//! the edges in a list, which is handy for small models and tests.

use log::debug;

use crate::error::{GenError, Result};
use crate::relation::RelationBuilder;

/// Counters reported by an edge sink.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SinkStats {
    /// Edges accepted by the sink.
    pub edges: usize,
    /// Edges dropped on input (weighted self-loops and zero weights).
    pub dropped: usize,
    pub batches: usize,
    /// Live nodes of the encoded relation (0 for plain lists).
    pub nodes: usize,
    pub peak_nodes: usize,
    /// Peak memory estimate, in bytes.
    pub peak_memory: usize,
}

/// Receiver of `(from, to)` edges between minterm-shaped state encodings.
pub trait EdgeSink {
    /// Whether the sink stores weights (Markov chain mode).
    fn is_weighted(&self) -> bool;

    fn add_edge(&mut self, from: &[u32], to: &[u32]) -> Result<()>;

    fn add_weighted_edge(&mut self, from: &[u32], to: &[u32], weight: f64) -> Result<()>;

    /// Make every edge added so far part of the final result.
    fn flush(&mut self) -> Result<()>;

    /// Drop every edge added since the last flush.
    fn discard(&mut self);

    fn stats(&self) -> SinkStats {
        SinkStats::default()
    }
}

impl EdgeSink for RelationBuilder {
    fn is_weighted(&self) -> bool {
        RelationBuilder::is_weighted(self)
    }

    fn add_edge(&mut self, from: &[u32], to: &[u32]) -> Result<()> {
        RelationBuilder::add_edge(self, from, to)
    }

    fn add_weighted_edge(&mut self, from: &[u32], to: &[u32], weight: f64) -> Result<()> {
        RelationBuilder::add_weighted_edge(self, from, to, weight)
    }

    fn flush(&mut self) -> Result<()> {
        self.flush_batch();
        Ok(())
    }

    fn discard(&mut self) {
        self.discard_batch();
    }

    fn stats(&self) -> SinkStats {
        let stats = RelationBuilder::stats(self);
        SinkStats {
            edges: stats.edges_added,
            dropped: stats.edges_dropped,
            batches: stats.batches,
            nodes: stats.canonical_nodes + stats.building_nodes,
            peak_nodes: stats.peak_nodes,
            peak_memory: stats.peak_memory,
        }
    }
}

/// One edge recorded by an [`EdgeLog`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEdge {
    pub from: Vec<u32>,
    pub to: Vec<u32>,
    pub weight: f64,
}

/// Edge sink keeping a plain list of edges, in insertion order.
///
/// Unlike the relation builder, repeated edges are kept as separate entries.
#[derive(Debug, Default, Clone)]
pub struct EdgeLog {
    weighted: bool,
    edges: Vec<LoggedEdge>,
    /// Number of edges covered by the last flush.
    flushed: usize,
    dropped: usize,
}

impl EdgeLog {
    pub fn new(weighted: bool) -> Self {
        Self {
            weighted,
            ..Default::default()
        }
    }

    pub fn edges(&self) -> &[LoggedEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Sum of the weights of all logged edges between two encodings.
    pub fn weight(&self, from: &[u32], to: &[u32]) -> f64 {
        self.edges
            .iter()
            .filter(|e| e.from == from && e.to == to)
            .map(|e| e.weight)
            .sum()
    }
}

impl EdgeSink for EdgeLog {
    fn is_weighted(&self) -> bool {
        self.weighted
    }

    fn add_edge(&mut self, from: &[u32], to: &[u32]) -> Result<()> {
        if self.weighted {
            return self.add_weighted_edge(from, to, 1.0);
        }
        self.edges.push(LoggedEdge {
            from: from.to_vec(),
            to: to.to_vec(),
            weight: 1.0,
        });
        Ok(())
    }

    fn add_weighted_edge(&mut self, from: &[u32], to: &[u32], weight: f64) -> Result<()> {
        if !self.weighted {
            return Err(GenError::EngineFailed(
                "weighted edge added to an unweighted edge log".to_string(),
            ));
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(GenError::EngineFailed(format!("invalid edge weight {}", weight)));
        }
        if weight == 0.0 || from[1..] == to[1..] {
            debug!("dropped edge with weight {}", weight);
            self.dropped += 1;
            return Ok(());
        }
        self.edges.push(LoggedEdge {
            from: from.to_vec(),
            to: to.to_vec(),
            weight,
        });
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushed = self.edges.len();
        Ok(())
    }

    fn discard(&mut self) {
        self.edges.truncate(self.flushed);
    }

    fn stats(&self) -> SinkStats {
        SinkStats {
            edges: self.edges.len(),
            dropped: self.dropped,
            ..Default::default()
        }
    }
}
