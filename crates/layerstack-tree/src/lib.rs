#![forbid(unsafe_code)]

//! Ordered, nested layer-tree model and mutation primitives.
//!
//! A layer tree is a `Vec<LayerNode>` of root-level layers, each carrying
//! an ordered `children` list (order is stacking order and caller-visible).
//! This crate is the index-and-mutation half of the engine:
//!
//! - Deterministic node identifiers suitable for replay/diff.
//! - Pre-order lookup, parent resolution, and depth measurement.
//! - In-place structural edits: detach, placement-directed insert, partial
//!   field updates, selection clearing.
//! - Structural diagnostics for the caller-enforced invariants
//!   (id uniqueness, parent-hint consistency).
//!
//! Every operation borrows the tree; nothing is retained across calls.
//! Drop legality and the interactive drag lifecycle live in
//! `layerstack-drag`.

pub mod edit;
pub mod invariant;
pub mod node;
pub mod query;

pub use edit::{
    InsertError, LayerPatch, LayerPlacement, UpdateError, clear_selection, insert, remove, update,
};
pub use invariant::{
    LayerInvariantCode, LayerInvariantIssue, LayerInvariantReport, invariant_report,
};
pub use node::{LayerFlags, LayerId, LayerNode};
pub use query::{
    ParentLookup, collect_selected, depth_of, find, find_mut, find_parent, node_count,
    subtree_height,
};
