use std::collections::BTreeMap;

use test_log::test;

use ssgen_rs::node::NodeStatus;
use ssgen_rs::relation::{RelationBuilder, RelationConfig};

type Edge = (Vec<u32>, Vec<u32>);

fn encode(values: &[u32]) -> Vec<u32> {
    let mut slots = vec![0];
    slots.extend_from_slice(values);
    slots
}

/// Edges of the current root, keyed by `(from, to)`.
fn edge_map(builder: &RelationBuilder) -> BTreeMap<Edge, f64> {
    builder
        .root()
        .map(|root| builder.edges(root).map(|(from, to, w)| ((from, to), w)).collect())
        .unwrap_or_default()
}

fn sample_edges() -> Vec<(Vec<u32>, Vec<u32>, f64)> {
    let mut edges = Vec::new();
    for a in 0..3u32 {
        for b in 0..3u32 {
            let from = encode(&[a, b, (a + b) % 2]);
            let to = encode(&[(a + 1) % 3, b, (a * b) % 2]);
            edges.push((from.clone(), to, 1.0 + (a * 3 + b) as f64 / 4.0));
            let to = encode(&[a, (b + 2) % 3, 1]);
            edges.push((from, to, 0.5));
        }
    }
    edges
}

#[test]
fn test_single_edge_scenario() {
    let mut builder = RelationBuilder::new(RelationConfig::new(2).weighted(true));
    builder.add_weighted_edge(&[0, 1, 0], &[0, 0, 1], 2.0).unwrap();
    builder.flush_batch();

    let root = builder.root().unwrap();
    assert_eq!(builder.status(root), NodeStatus::Canonical);
    assert_eq!(builder.stats().canonical_nodes, 2);
    assert_eq!(builder.edge_count(root), 1u32.into());

    let edges = edge_map(&builder);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[&(vec![0, 1, 0], vec![0, 0, 1])], 2.0);
}

#[test]
fn test_empty_flush_is_noop() {
    let mut builder = RelationBuilder::new(RelationConfig::new(2));
    builder.add_edge(&[0, 1, 1], &[0, 0, 0]).unwrap();
    builder.flush_batch();
    let root = builder.root();
    let stats = builder.stats();

    builder.flush_batch();
    assert_eq!(builder.root(), root);
    assert_eq!(builder.stats(), stats);
}

#[test]
fn test_order_independence() {
    let edges = sample_edges();

    let mut forward = RelationBuilder::new(RelationConfig::new(3).weighted(true));
    for (from, to, w) in &edges {
        forward.add_weighted_edge(from, to, *w).unwrap();
    }
    forward.flush_batch();

    let mut backward = RelationBuilder::new(RelationConfig::new(3).weighted(true).batch_size(5));
    for (from, to, w) in edges.iter().rev() {
        backward.add_weighted_edge(from, to, *w).unwrap();
    }
    backward.flush_batch();

    let a = edge_map(&forward);
    let b = edge_map(&backward);
    assert_eq!(a.len(), b.len());
    for (edge, wa) in &a {
        let wb = b[edge];
        assert!((wa - wb).abs() <= 1e-7 * wa.abs().max(wb.abs()), "{:?}: {} vs {}", edge, wa, wb);
    }
    assert_eq!(forward.stats().canonical_nodes, backward.stats().canonical_nodes);
    forward.check_invariants().unwrap();
    backward.check_invariants().unwrap();
}

#[test]
fn test_round_trip() {
    let edges = sample_edges();
    let mut builder = RelationBuilder::new(RelationConfig::new(3).weighted(true).batch_size(4));
    let mut expected: BTreeMap<Edge, f64> = BTreeMap::new();
    for (from, to, w) in &edges {
        builder.add_weighted_edge(from, to, *w).unwrap();
        if from != to {
            *expected.entry((from.clone(), to.clone())).or_default() += w;
        }
    }
    builder.flush_batch();

    let actual = edge_map(&builder);
    assert_eq!(actual.len(), expected.len());
    for (edge, w) in &expected {
        let got = actual[edge];
        assert!((got - w).abs() <= 1e-7 * w.abs(), "{:?}: {} vs {}", edge, got, w);
    }
}

#[test]
fn test_refcounts_after_root_replacement() {
    let mut builder = RelationBuilder::new(RelationConfig::new(3).batch_size(3));
    for (from, to, _) in sample_edges() {
        builder.add_edge(&from, &to).unwrap();
        builder.check_invariants().unwrap();
    }
    builder.flush_batch();
    builder.check_invariants().unwrap();

    let root = builder.root().unwrap();
    assert_eq!(builder.refcount(root), 1);
    assert_eq!(builder.stats().building_nodes, 0);
    assert!(builder.stats().batches > 1);
}

#[test]
fn test_weighted_self_loops_filtered() {
    let mut builder = RelationBuilder::new(RelationConfig::new(2).weighted(true));
    builder.add_weighted_edge(&[0, 1, 1], &[0, 1, 1], 3.0).unwrap();
    builder.add_weighted_edge(&[0, 1, 1], &[0, 1, 2], 3.0).unwrap();
    builder.flush_batch();

    let edges = edge_map(&builder);
    assert_eq!(edges.len(), 1);
    assert!(edges.contains_key(&(vec![0, 1, 1], vec![0, 1, 2])));
}
