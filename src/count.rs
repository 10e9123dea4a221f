use std::collections::HashMap;

use num_bigint::BigUint;

use crate::node;
use crate::reference::NodeRef;
use crate::relation::RelationBuilder;

impl RelationBuilder {
    /// Number of edges encoded below `node`.
    ///
    /// Shared subdiagrams are counted once per path, so the result may be far larger
    /// than the number of nodes and is computed exactly.
    pub fn edge_count(&self, node: NodeRef) -> BigUint {
        let mut cache = HashMap::new();
        self._edge_count(node, &mut cache)
    }

    fn _edge_count(&self, node: NodeRef, cache: &mut HashMap<NodeRef, BigUint>) -> BigUint {
        if node.is_terminal() {
            return BigUint::from(1u32);
        }

        if let Some(count) = cache.get(&node) {
            return count.clone();
        }

        let mut count = BigUint::ZERO;
        for e in node::elements(self.rows(node)) {
            count += self._edge_count(e.down, cache);
        }

        cache.insert(node, count.clone());
        count
    }

    /// Sum of all edge weights encoded below `node`.
    pub fn total_weight(&self, node: NodeRef) -> f64 {
        let mut cache = HashMap::new();
        self._total_weight(node, &mut cache)
    }

    fn _total_weight(&self, node: NodeRef, cache: &mut HashMap<NodeRef, f64>) -> f64 {
        if node.is_terminal() {
            return 1.0;
        }
        if let Some(&total) = cache.get(&node) {
            return total;
        }

        let total = node::elements(self.rows(node))
            .map(|e| e.weight * self._total_weight(e.down, cache))
            .sum();
        cache.insert(node, total);
        total
    }
}
