#![forbid(unsafe_code)]

//! Drop legality and drag lifecycle for layer trees.
//!
//! The decision half of the engine: given a dragged layer, a candidate
//! target, and a position, [`drop_verdict`] answers whether the drop is
//! legal (cycle prevention plus a nesting-depth budget), and
//! [`apply_drop`] validates and performs the move atomically over a
//! `layerstack-tree` tree. [`machine::DragMachine`] tracks one interactive
//! drag for a host that feeds it pointer-derived events.

pub mod machine;

use std::fmt;

use serde::{Deserialize, Serialize};

use layerstack_tree::{
    LayerId, LayerNode, LayerPlacement, depth_of, find, insert, remove, subtree_height,
};

pub use machine::{DragEffect, DragEvent, DragMachine, DragNoopReason, DragState, DragTransition};

/// Relative placement of a dragged layer against a drop target.
///
/// "No position" is the absence of a value on the host side, not a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPosition {
    /// Splice before the target in its sibling list.
    Before,
    /// Splice after the target in its sibling list.
    After,
    /// Nest as the target's last child.
    Inside,
}

impl DropPosition {
    /// The tree placement this position resolves to against `target`.
    #[must_use]
    pub const fn placement(self, target: LayerId) -> LayerPlacement {
        match self {
            Self::Before => LayerPlacement::Before { target },
            Self::After => LayerPlacement::After { target },
            Self::Inside => LayerPlacement::Inside { target },
        }
    }
}

impl fmt::Display for DropPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Inside => "inside",
        };
        f.write_str(text)
    }
}

/// Host-facing drag configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragConfig {
    /// Whether `Inside` drops are allowed at all.
    pub allow_nesting: bool,
    /// Whether companion (multi-select) drags are allowed.
    pub allow_multi_select: bool,
    /// Maximum nesting depth; root level is depth 0.
    pub max_nesting_level: usize,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            allow_nesting: true,
            allow_multi_select: true,
            max_nesting_level: 3,
        }
    }
}

/// True iff `id` occurs anywhere below `ancestor`.
///
/// A node is not its own descendant: `ancestor`'s own id is never checked.
#[must_use]
pub fn is_descendant(ancestor: &LayerNode, id: LayerId) -> bool {
    ancestor
        .children
        .iter()
        .any(|child| child.id == id || is_descendant(child, id))
}

/// Whether dropping `dragged` inside `target` is legal under `max_depth`.
///
/// Legal iff the dragged subtree's own nesting still fits one level down
/// (`subtree_height(dragged) < max_depth`) and nesting would not create a
/// cycle: the target is neither the dragged node itself nor one of its
/// descendants. Short-circuits in that order.
#[must_use]
pub fn can_nest_inside(dragged: &LayerNode, target: &LayerNode, max_depth: usize) -> bool {
    subtree_height(dragged) < max_depth
        && dragged.id != target.id
        && !is_descendant(dragged, target.id)
}

/// Why a candidate drop was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropRejectReason {
    /// The dragged id does not occur in the tree.
    SourceNotFound,
    /// The target id does not occur in the tree.
    TargetNotFound,
    /// Source and target are the same node.
    SameNode,
    /// The target sits inside the dragged subtree and would vanish
    /// during the move.
    TargetInsideSource,
    /// `Inside` drops are disabled by configuration.
    NestingDisabled,
    /// The move would exceed the nesting budget.
    DepthExceeded,
}

impl fmt::Display for DropRejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::SourceNotFound => "dragged layer not found",
            Self::TargetNotFound => "target layer not found",
            Self::SameNode => "layer cannot be dropped onto itself",
            Self::TargetInsideSource => "target sits inside the dragged subtree",
            Self::NestingDisabled => "nesting is disabled",
            Self::DepthExceeded => "nesting depth budget exceeded",
        };
        f.write_str(text)
    }
}

/// Legality decision for one candidate drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum DropVerdict {
    /// The drop may be applied.
    Allowed,
    /// The drop must not be applied.
    Rejected {
        /// Why it was refused.
        reason: DropRejectReason,
    },
}

impl DropVerdict {
    /// True for [`DropVerdict::Allowed`].
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

const fn rejected(reason: DropRejectReason) -> DropVerdict {
    DropVerdict::Rejected { reason }
}

/// Decide whether dropping `source` at `position` relative to `target`
/// is legal in `tree`.
///
/// `Before`/`After` carry no cycle risk but are still charged against the
/// nesting budget: the insertion point's depth plus the dragged subtree's
/// own height must stay within `max_nesting_level`. The target is rejected
/// for every position when it sits inside the dragged subtree, since it
/// would leave the tree together with the source during the move.
#[must_use]
pub fn drop_verdict(
    tree: &[LayerNode],
    source: LayerId,
    target: LayerId,
    position: DropPosition,
    config: &DragConfig,
) -> DropVerdict {
    if source == target {
        return rejected(DropRejectReason::SameNode);
    }
    let Some(source_node) = find(tree, source) else {
        return rejected(DropRejectReason::SourceNotFound);
    };
    if find(tree, target).is_none() {
        return rejected(DropRejectReason::TargetNotFound);
    }
    if is_descendant(source_node, target) {
        return rejected(DropRejectReason::TargetInsideSource);
    }
    let Some(target_depth) = depth_of(tree, target) else {
        return rejected(DropRejectReason::TargetNotFound);
    };

    let height = subtree_height(source_node);
    match position {
        DropPosition::Inside => {
            if !config.allow_nesting {
                return rejected(DropRejectReason::NestingDisabled);
            }
            if target_depth + 1 + height > config.max_nesting_level {
                return rejected(DropRejectReason::DepthExceeded);
            }
        }
        DropPosition::Before | DropPosition::After => {
            if target_depth + height > config.max_nesting_level {
                return rejected(DropRejectReason::DepthExceeded);
            }
        }
    }
    DropVerdict::Allowed
}

/// Outcome of a performed drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropOutcome {
    /// The moved layer.
    pub source: LayerId,
    /// The layer it was placed relative to.
    pub target: LayerId,
    /// The resolved position.
    pub position: DropPosition,
}

/// Rejected [`apply_drop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropError {
    /// The dragged layer.
    pub source: LayerId,
    /// The candidate target.
    pub target: LayerId,
    /// The attempted position.
    pub position: DropPosition,
    /// Why the drop was refused.
    pub reason: DropRejectReason,
}

impl fmt::Display for DropError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "drop of {} {} {} rejected: {}",
            self.source, self.position, self.target, self.reason
        )
    }
}

impl std::error::Error for DropError {}

/// Validate and perform a drop: detach `source`, splice it back at
/// `position` relative to `target`.
///
/// Validation runs before any mutation, so a rejected drop leaves the tree
/// untouched and a permitted one cannot fail midway; callers never observe
/// partial state between the detach and the splice.
pub fn apply_drop(
    tree: &mut Vec<LayerNode>,
    source: LayerId,
    target: LayerId,
    position: DropPosition,
    config: &DragConfig,
) -> Result<DropOutcome, DropError> {
    match drop_verdict(tree, source, target, position, config) {
        DropVerdict::Allowed => {}
        DropVerdict::Rejected { reason } => {
            return Err(DropError {
                source,
                target,
                position,
                reason,
            });
        }
    }

    let Some(node) = remove(tree, source) else {
        // The verdict already resolved the source; kept as a guard.
        return Err(DropError {
            source,
            target,
            position,
            reason: DropRejectReason::SourceNotFound,
        });
    };
    if let Err(err) = insert(tree, node, position.placement(target)) {
        // The verdict pinned the target outside the dragged subtree, so it
        // survives the detach; restore at root level if that ever breaks.
        tree.push(err.node);
        return Err(DropError {
            source,
            target,
            position,
            reason: DropRejectReason::TargetNotFound,
        });
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        message = "layer_drag.drop",
        source = source.get(),
        target = target.get(),
        position = ?position,
    );
    Ok(DropOutcome {
        source,
        target,
        position,
    })
}
