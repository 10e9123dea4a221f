//! Rate normalization for weighted relations.
//!
//! While a batch is reduced, every non-top node is rescaled so that its largest
//! element weight is exactly 1. The removed factor is pushed into the parent's
//! element weight, so the product along every path is preserved. Nodes that differ
//! only by a constant factor thus become structurally equal and are shared.
//!
//! The top level is never normalized: it keeps the absolute magnitudes.

use crate::reference::NodeRef;
use crate::relation::RelationBuilder;

impl RelationBuilder {
    /// Divide the weights of a `Building` node by their maximum and return it.
    ///
    /// A node without elements is left untouched (factor 1).
    pub(crate) fn normalize(&mut self, node: NodeRef) -> f64 {
        let max = self
            .storage
            .rows(node)
            .iter()
            .flat_map(|r| r.elements.iter())
            .map(|e| e.weight)
            .fold(0.0, f64::max);
        if max <= 0.0 {
            return 1.0;
        }

        if max != 1.0 {
            for row in self.storage.rows_mut(node) {
                for e in &mut row.elements {
                    e.weight /= max;
                }
            }
        }
        max
    }
}
