//! # ssgen-rs: explicit state-space and Markov chain generation
//!
//! **`ssgen-rs`** explores the reachable state space of a discrete-event model and
//! encodes the discovered transition relation as a **canonical, hash-consed decision
//! diagram**. It is designed as the generation back-end of model checkers and
//! numerical Markov chain solvers.
//!
//! ## Key Features
//!
//! - **Explicit exploration**: the [`Explorer`][crate::explorer::Explorer] drives any
//!   [`Model`][crate::model::Model] from its initial states, deduplicating states in
//!   tangible and vanishing partitions.
//! - **Vanishing elimination**: zero-duration states are either kept (structural mode) or
//!   eliminated, their probability mass redistributed to the tangible states they reach.
//! - **Canonical relation**: edges are collected in batches and merged into a
//!   reference-counted, reduced diagram by the
//!   [`RelationBuilder`][crate::relation::RelationBuilder]. Equal subdiagrams are stored
//!   once; weighted (rate) diagrams are normalized so that proportional rows are shared.
//! - **Safe handles**: nodes are addressed by generation-checked
//!   [`NodeRef`][crate::reference::NodeRef]s, so stale references are detected.
//! - **1-Based Indexing**: variables are 1-indexed (slot 0 of every encoding is reserved),
//!   which is also the level numbering of the diagram.
//!
//! ## Basic Usage
//!
//! ```rust
//! use ssgen_rs::relation::{RelationBuilder, RelationConfig};
//!
//! // A weighted relation over 2 state variables.
//! let mut builder = RelationBuilder::new(RelationConfig::new(2).weighted(true));
//!
//! // Encodings are minterm-shaped: slot 0 is reserved.
//! builder.add_weighted_edge(&[0, 1, 0], &[0, 0, 1], 2.0).unwrap();
//! builder.add_weighted_edge(&[0, 0, 1], &[0, 1, 0], 3.0).unwrap();
//! builder.flush_batch();
//!
//! let root = builder.root().unwrap();
//! assert_eq!(builder.edge_count(root), 2u32.into());
//! assert_eq!(builder.total_weight(root), 5.0);
//! ```
//!
//! ## Core Components
//!
//! - **[`explorer`]**: The exploration driver and its configuration.
//! - **[`relation`]**: The canonical relation builder (see also [`normalize`], [`paths`] and [`debug`]).
//! - **[`partition`]**: State tables and exploration order strategies.
//! - **[`minterm`]**: The pool of state encodings.

pub mod cancel;
pub mod count;
pub mod debug;
pub mod eliminate;
pub mod error;
pub mod explorer;
pub mod minterm;
pub mod model;
pub mod node;
pub mod normalize;
pub mod partition;
pub mod paths;
pub mod reference;
pub mod relation;
pub mod sink;
pub mod stats;
pub mod storage;
pub mod subtable;
pub mod types;
