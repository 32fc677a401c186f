//! Read-only lookups over a layer tree.
//!
//! All searches are pre-order depth-first: a node is checked before its
//! children, children in stacking order. With unique ids the first match
//! is the only match. A miss is a normal outcome, never an error.

use crate::node::{LayerFlags, LayerId, LayerNode};

/// Find the node with `id`, pre-order.
#[must_use]
pub fn find(tree: &[LayerNode], id: LayerId) -> Option<&LayerNode> {
    for node in tree {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find(&node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Mutable variant of [`find`].
#[must_use]
pub fn find_mut(tree: &mut [LayerNode], id: LayerId) -> Option<&mut LayerNode> {
    for node in tree {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Result of a parent lookup.
///
/// Distinguishes "the id names a root-level node" from "the id is absent",
/// which a plain `Option` cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLookup<'a> {
    /// The id was found as a direct child of this node.
    Found(&'a LayerNode),
    /// The id names a root-level node; it has no parent.
    Root,
    /// The id does not occur in the tree.
    NotFound,
}

impl<'a> ParentLookup<'a> {
    /// The located parent, if any.
    #[must_use]
    pub const fn parent(self) -> Option<&'a LayerNode> {
        match self {
            Self::Found(node) => Some(node),
            Self::Root | Self::NotFound => None,
        }
    }
}

/// Locate the direct parent of `child_id`.
///
/// Derived from `children` lists only; `parent` hints are never consulted.
#[must_use]
pub fn find_parent(tree: &[LayerNode], child_id: LayerId) -> ParentLookup<'_> {
    if tree.iter().any(|node| node.id == child_id) {
        return ParentLookup::Root;
    }

    fn walk(nodes: &[LayerNode], child_id: LayerId) -> Option<&LayerNode> {
        for node in nodes {
            if node.children.iter().any(|child| child.id == child_id) {
                return Some(node);
            }
            if let Some(found) = walk(&node.children, child_id) {
                return Some(found);
            }
        }
        None
    }

    match walk(tree, child_id) {
        Some(parent) => ParentLookup::Found(parent),
        None => ParentLookup::NotFound,
    }
}

/// Depth of the node with `id`; root-level nodes are depth 0.
///
/// `None` when the id is absent.
#[must_use]
pub fn depth_of(tree: &[LayerNode], id: LayerId) -> Option<usize> {
    fn walk(nodes: &[LayerNode], id: LayerId, level: usize) -> Option<usize> {
        for node in nodes {
            if node.id == id {
                return Some(level);
            }
            if let Some(found) = walk(&node.children, id, level + 1) {
                return Some(found);
            }
        }
        None
    }
    walk(tree, id, 0)
}

/// Levels of nesting below `node`: a leaf is 0, a node whose deepest
/// descendant is a grandchild is 2.
#[must_use]
pub fn subtree_height(node: &LayerNode) -> usize {
    node.children
        .iter()
        .map(|child| subtree_height(child) + 1)
        .max()
        .unwrap_or(0)
}

/// Collect every selected node, in pre-order traversal order.
#[must_use]
pub fn collect_selected(tree: &[LayerNode]) -> Vec<&LayerNode> {
    fn walk<'a>(nodes: &'a [LayerNode], out: &mut Vec<&'a LayerNode>) {
        for node in nodes {
            if node.flags.contains(LayerFlags::SELECTED) {
                out.push(node);
            }
            walk(&node.children, out);
        }
    }

    let mut out = Vec::new();
    walk(tree, &mut out);
    out
}

/// Total number of nodes, including nested ones.
#[must_use]
pub fn node_count(tree: &[LayerNode]) -> usize {
    tree.iter()
        .map(|node| 1 + node_count(&node.children))
        .sum()
}
