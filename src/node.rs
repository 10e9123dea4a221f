//! Relation nodes and their lifecycle.
//!
//! A node at level `k` holds sparse rows, indexed by the value of variable `k` in the
//! source state. Each row is a column-sorted list of [`Element`]s pointing one level
//! down. The value of a path through the diagram is the product of its element
//! weights (all weights are 1.0 in an unweighted relation).
//!
//! The lifecycle is an explicit tagged variant:
//!
//! ```text
//! Building ──promote──▶ Canonical ──refcount 0──▶ Recycled
//!     │                                              ▲
//!     └──duplicate found──▶ Merged ──cleanup─────────┘
//! ```
//!
//! Only `Building` nodes are mutable and only `Building`/`Canonical` nodes own rows.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::reference::NodeRef;
use crate::types::Level;

/// One entry of a row: target column, weight and down-pointer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Element {
    pub column: u32,
    pub weight: f64,
    pub down: NodeRef,
}

/// A populated row of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub index: u32,
    pub elements: Vec<Element>,
}

/// Lifecycle state of a node slot.
#[derive(Debug, Clone)]
pub enum NodeState {
    /// Under construction in the current batch; exactly one owner.
    Building { level: Level, rows: Vec<Row> },
    /// Hash-consed, shared and immutable.
    Canonical {
        level: Level,
        rows: Vec<Row>,
        refcount: u32,
        signature: u64,
    },
    /// Superseded by an equal canonical node; kept only until cleanup.
    Merged { target: NodeRef },
    /// On the free list.
    Recycled { next_free: Option<u32> },
}

/// Discriminant of [`NodeState`], for reporting.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum NodeStatus {
    Building,
    Canonical,
    Merged,
    Recycled,
}

impl NodeState {
    pub fn status(&self) -> NodeStatus {
        match self {
            NodeState::Building { .. } => NodeStatus::Building,
            NodeState::Canonical { .. } => NodeStatus::Canonical,
            NodeState::Merged { .. } => NodeStatus::Merged,
            NodeState::Recycled { .. } => NodeStatus::Recycled,
        }
    }
}

/// Find the element at `(row, column)`.
pub fn find(rows: &[Row], row: u32, column: u32) -> Option<&Element> {
    let r = rows.binary_search_by_key(&row, |r| r.index).ok()?;
    let elements = &rows[r].elements;
    let e = elements.binary_search_by_key(&column, |e| e.column).ok()?;
    Some(&elements[e])
}

/// Mutable access to the element at `(row, column)`.
pub fn find_mut(rows: &mut [Row], row: u32, column: u32) -> Option<&mut Element> {
    let r = rows.binary_search_by_key(&row, |r| r.index).ok()?;
    let elements = &mut rows[r].elements;
    let e = elements.binary_search_by_key(&column, |e| e.column).ok()?;
    Some(&mut elements[e])
}

/// Insert an element into `row`, keeping rows and columns sorted.
///
/// # Panics
///
/// Panics if the column is already present in the row.
pub fn insert(rows: &mut Vec<Row>, row: u32, element: Element) {
    let r = match rows.binary_search_by_key(&row, |r| r.index) {
        Ok(r) => r,
        Err(r) => {
            rows.insert(
                r,
                Row {
                    index: row,
                    elements: Vec::new(),
                },
            );
            r
        }
    };
    let elements = &mut rows[r].elements;
    match elements.binary_search_by_key(&element.column, |e| e.column) {
        Ok(_) => panic!("Column {} already present in row {}", element.column, row),
        Err(e) => elements.insert(e, element),
    }
}

/// Iterate over all elements of a node.
pub fn elements(rows: &[Row]) -> impl Iterator<Item = &Element> + '_ {
    rows.iter().flat_map(|r| r.elements.iter())
}

/// Number of elements of a node.
pub fn element_count(rows: &[Row]) -> usize {
    rows.iter().map(|r| r.elements.len()).sum()
}

/// Structural signature of a node.
///
/// Covers the level and every `(row, column, down)` triple but never the weights,
/// so structurally equal nodes (equal up to the weight tolerance) always agree.
pub fn signature(level: Level, rows: &[Row]) -> u64 {
    let mut hasher = DefaultHasher::new();
    level.hash(&mut hasher);
    rows.len().hash(&mut hasher);
    for row in rows {
        row.index.hash(&mut hasher);
        row.elements.len().hash(&mut hasher);
        for e in &row.elements {
            e.column.hash(&mut hasher);
            e.down.packed().hash(&mut hasher);
        }
    }
    hasher.finish()
}

/// Whether two weights agree within the relative tolerance.
pub fn weights_close(a: f64, b: f64, tolerance: f64) -> bool {
    a == b || (a - b).abs() <= tolerance * a.abs().max(b.abs())
}

/// Row-by-row structural equality with tolerant weight comparison.
pub fn rows_equal(a: &[Row], b: &[Row], tolerance: f64) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(ra, rb)| {
            ra.index == rb.index
                && ra.elements.len() == rb.elements.len()
                && ra.elements.iter().zip(&rb.elements).all(|(ea, eb)| {
                    ea.column == eb.column
                        && ea.down == eb.down
                        && weights_close(ea.weight, eb.weight, tolerance)
                })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(column: u32, weight: f64) -> Element {
        Element {
            column,
            weight,
            down: NodeRef::TERMINAL,
        }
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut rows = Vec::new();
        insert(&mut rows, 2, el(5, 1.0));
        insert(&mut rows, 0, el(1, 1.0));
        insert(&mut rows, 2, el(3, 1.0));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].index, 0);
        assert_eq!(rows[1].index, 2);
        let columns: Vec<_> = rows[1].elements.iter().map(|e| e.column).collect();
        assert_eq!(columns, vec![3, 5]);
        assert_eq!(element_count(&rows), 3);
        assert_eq!(find(&rows, 2, 5).map(|e| e.column), Some(5));
        assert!(find(&rows, 1, 5).is_none());
    }

    #[test]
    #[should_panic(expected = "already present")]
    fn test_insert_duplicate_column() {
        let mut rows = Vec::new();
        insert(&mut rows, 0, el(1, 1.0));
        insert(&mut rows, 0, el(1, 2.0));
    }

    #[test]
    fn test_signature_ignores_weights() {
        let mut a = Vec::new();
        insert(&mut a, 1, el(2, 0.5));
        let mut b = Vec::new();
        insert(&mut b, 1, el(2, 0.25));

        assert_eq!(signature(Level::new(1), &a), signature(Level::new(1), &b));
        assert!(!rows_equal(&a, &b, 1e-7));
        find_mut(&mut b, 1, 2).unwrap().weight = 0.5 + 1e-12;
        assert!(rows_equal(&a, &b, 1e-7));
    }

    #[test]
    fn test_weights_close() {
        assert!(weights_close(1.0, 1.0 + 1e-9, 1e-7));
        assert!(!weights_close(1.0, 1.001, 1e-7));
        assert!(weights_close(0.0, 0.0, 1e-7));
    }
}
