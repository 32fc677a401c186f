//! In-place structural edits over a layer tree.
//!
//! Every operation borrows the tree mutably, so the borrowed value is the
//! single canonical copy while an edit runs; there is no mutate-vs-copy
//! split in this API. Unresolved targets are reported as errors, never
//! swallowed as silent no-ops.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::{LayerFlags, LayerId, LayerNode};
use crate::query::find_mut;

/// Where [`insert`] places a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "placement", rename_all = "snake_case")]
pub enum LayerPlacement {
    /// Append at the end of the root sequence.
    AtEnd,
    /// Splice immediately before this sibling.
    Before { target: LayerId },
    /// Splice immediately after this sibling.
    After { target: LayerId },
    /// Append to this node's children.
    Inside { target: LayerId },
}

impl LayerPlacement {
    /// The placement's target id, if it has one.
    #[must_use]
    pub const fn target(self) -> Option<LayerId> {
        match self {
            Self::AtEnd => None,
            Self::Before { target } | Self::After { target } | Self::Inside { target } => {
                Some(target)
            }
        }
    }
}

/// Rejected [`insert`]: the placement target does not occur in the tree.
///
/// Carries the node back so the caller keeps ownership of the subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertError {
    /// The target id that could not be resolved.
    pub target: LayerId,
    /// The node that was not inserted, returned to the caller.
    pub node: LayerNode,
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "insert target {} not found for node {}",
            self.target, self.node.id
        )
    }
}

impl std::error::Error for InsertError {}

/// Rejected [`update`]: the id does not occur in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateError {
    /// The id that could not be resolved.
    pub id: LayerId,
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "update target {} not found", self.id)
    }
}

impl std::error::Error for UpdateError {}

#[cfg(feature = "tracing")]
fn log_edit(op: &str, id: LayerId) {
    tracing::debug!(message = "layer_tree.edit", op, id = id.get());
}

/// Detach the node with `id`, returning it together with its subtree.
///
/// Descendants leave the tree along with the detached node. Its `parent`
/// hint is cleared; it has no owner until re-inserted. `None` when the id
/// is absent.
pub fn remove(tree: &mut Vec<LayerNode>, id: LayerId) -> Option<LayerNode> {
    if let Some(index) = tree.iter().position(|node| node.id == id) {
        let mut node = tree.remove(index);
        node.parent = None;
        #[cfg(feature = "tracing")]
        log_edit("remove", id);
        return Some(node);
    }
    for node in tree {
        if let Some(found) = remove(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Resolved non-root placement slot.
#[derive(Clone, Copy)]
enum Slot {
    Before,
    After,
    Inside,
}

/// Insert `node` at `placement`.
///
/// The node's `parent` hint is rewritten to its actual owner in every arm
/// (cleared at root level). An unresolved target leaves the tree untouched
/// and hands the node back through [`InsertError`].
pub fn insert(
    tree: &mut Vec<LayerNode>,
    mut node: LayerNode,
    placement: LayerPlacement,
) -> Result<(), InsertError> {
    let (target, slot) = match placement {
        LayerPlacement::AtEnd => {
            node.parent = None;
            #[cfg(feature = "tracing")]
            log_edit("insert", node.id);
            tree.push(node);
            return Ok(());
        }
        LayerPlacement::Before { target } => (target, Slot::Before),
        LayerPlacement::After { target } => (target, Slot::After),
        LayerPlacement::Inside { target } => (target, Slot::Inside),
    };

    #[cfg(feature = "tracing")]
    let inserted = node.id;
    match place(tree, None, node, target, slot) {
        None => {
            #[cfg(feature = "tracing")]
            log_edit("insert", inserted);
            Ok(())
        }
        Some(node) => Err(InsertError { target, node }),
    }
}

/// Depth-first placement; hands `node` back when `target` was not found
/// anywhere under `nodes`.
fn place(
    nodes: &mut Vec<LayerNode>,
    owner: Option<LayerId>,
    mut node: LayerNode,
    target: LayerId,
    slot: Slot,
) -> Option<LayerNode> {
    if let Some(index) = nodes.iter().position(|candidate| candidate.id == target) {
        match slot {
            Slot::Before => {
                node.parent = owner;
                nodes.insert(index, node);
            }
            Slot::After => {
                node.parent = owner;
                nodes.insert(index + 1, node);
            }
            Slot::Inside => {
                node.parent = Some(target);
                nodes[index].children.push(node);
            }
        }
        return None;
    }
    for candidate in nodes.iter_mut() {
        let owner_id = candidate.id;
        match place(&mut candidate.children, Some(owner_id), node, target, slot) {
            None => return None,
            Some(returned) => node = returned,
        }
    }
    Some(node)
}

/// Partial field update for [`update`]; present fields win, absent fields
/// are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerPatch {
    /// New display label.
    #[serde(default)]
    pub title: Option<String>,
    /// New `VISIBLE` flag value.
    #[serde(default)]
    pub visible: Option<bool>,
    /// New `LOCKED` flag value.
    #[serde(default)]
    pub locked: Option<bool>,
    /// New `SELECTED` flag value.
    #[serde(default)]
    pub selected: Option<bool>,
    /// New `COLLAPSED` flag value.
    #[serde(default)]
    pub collapsed: Option<bool>,
    /// Replacement payload bag.
    #[serde(default)]
    pub data: Option<BTreeMap<String, String>>,
}

impl LayerPatch {
    /// Patch the display label.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Patch the `VISIBLE` flag.
    #[must_use]
    pub const fn visible(mut self, on: bool) -> Self {
        self.visible = Some(on);
        self
    }

    /// Patch the `LOCKED` flag.
    #[must_use]
    pub const fn locked(mut self, on: bool) -> Self {
        self.locked = Some(on);
        self
    }

    /// Patch the `SELECTED` flag.
    #[must_use]
    pub const fn selected(mut self, on: bool) -> Self {
        self.selected = Some(on);
        self
    }

    /// Patch the `COLLAPSED` flag.
    #[must_use]
    pub const fn collapsed(mut self, on: bool) -> Self {
        self.collapsed = Some(on);
        self
    }

    /// Replace the payload bag.
    #[must_use]
    pub fn data(mut self, data: BTreeMap<String, String>) -> Self {
        self.data = Some(data);
        self
    }

    fn apply(self, node: &mut LayerNode) {
        if let Some(title) = self.title {
            node.title = title;
        }
        if let Some(on) = self.visible {
            node.flags.set(LayerFlags::VISIBLE, on);
        }
        if let Some(on) = self.locked {
            node.flags.set(LayerFlags::LOCKED, on);
        }
        if let Some(on) = self.selected {
            node.flags.set(LayerFlags::SELECTED, on);
        }
        if let Some(on) = self.collapsed {
            node.flags.set(LayerFlags::COLLAPSED, on);
        }
        if let Some(data) = self.data {
            node.data = data;
        }
    }
}

/// Apply `patch` to the node with `id`; the tree shape is unchanged.
pub fn update(tree: &mut [LayerNode], id: LayerId, patch: LayerPatch) -> Result<(), UpdateError> {
    match find_mut(tree, id) {
        Some(node) => {
            patch.apply(node);
            #[cfg(feature = "tracing")]
            log_edit("update", id);
            Ok(())
        }
        None => Err(UpdateError { id }),
    }
}

/// Clear the `SELECTED` flag everywhere; other flags are untouched.
/// Idempotent.
pub fn clear_selection(tree: &mut [LayerNode]) {
    for node in tree {
        node.flags.remove(LayerFlags::SELECTED);
        clear_selection(&mut node.children);
    }
}
