//! Structural diagnostics over a layer tree.
//!
//! The mutation operations assume ids are unique and never validate them;
//! with duplicates, lookups resolve to the first pre-order match. This
//! report lets hosts and tests check the caller-enforced invariants
//! explicitly instead of debugging first-match surprises.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::node::{LayerId, LayerNode};

/// Stable code for one invariant finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerInvariantCode {
    /// An id occurs more than once in the tree.
    DuplicateId,
    /// A `parent` hint disagrees with the owner derived from `children`.
    ParentHintMismatch,
    /// A node names itself as its parent.
    SelfParentHint,
}

/// One actionable invariant finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInvariantIssue {
    /// Finding code.
    pub code: LayerInvariantCode,
    /// The node the finding is about.
    pub node: LayerId,
    /// Human-readable detail.
    pub detail: String,
}

/// Structured diagnostics over one tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInvariantReport {
    /// All findings, in pre-order discovery order.
    pub issues: Vec<LayerInvariantIssue>,
}

impl LayerInvariantReport {
    /// True when no issues were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Inspect a tree for duplicate ids and stale `parent` hints.
///
/// Hints are rewritten by the mutation operations and the node builders; a
/// mismatch means the tree was assembled by hand or mutated outside this
/// crate.
#[must_use]
pub fn invariant_report(tree: &[LayerNode]) -> LayerInvariantReport {
    let mut report = LayerInvariantReport::default();
    let mut seen = BTreeSet::new();
    walk(tree, None, &mut seen, &mut report);
    report
}

fn owner_label(owner: Option<LayerId>) -> String {
    owner.map_or_else(|| "root level".to_string(), |id| format!("node {id}"))
}

fn walk(
    nodes: &[LayerNode],
    owner: Option<LayerId>,
    seen: &mut BTreeSet<LayerId>,
    report: &mut LayerInvariantReport,
) {
    for node in nodes {
        if !seen.insert(node.id) {
            report.issues.push(LayerInvariantIssue {
                code: LayerInvariantCode::DuplicateId,
                node: node.id,
                detail: format!("id {} occurs more than once", node.id),
            });
        }
        if node.parent == Some(node.id) {
            report.issues.push(LayerInvariantIssue {
                code: LayerInvariantCode::SelfParentHint,
                node: node.id,
                detail: format!("node {} names itself as parent", node.id),
            });
        } else if node.parent != owner {
            report.issues.push(LayerInvariantIssue {
                code: LayerInvariantCode::ParentHintMismatch,
                node: node.id,
                detail: format!(
                    "hint points at {} but the node sits under {}",
                    owner_label(node.parent),
                    owner_label(owner)
                ),
            });
        }
        walk(&node.children, Some(node.id), seen, report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::{LayerPlacement, insert, remove};

    #[test]
    fn builder_trees_are_valid() {
        let tree = vec![
            LayerNode::new(1, "Background"),
            LayerNode::new(2, "Content")
                .child(LayerNode::new(3, "Text").child(LayerNode::new(4, "Caption"))),
        ];
        assert!(invariant_report(&tree).is_valid());
    }

    #[test]
    fn mutations_keep_hints_consistent() {
        let mut tree = vec![
            LayerNode::new(1, "Background"),
            LayerNode::new(2, "Content").child(LayerNode::new(3, "Text")),
        ];
        let detached = remove(&mut tree, LayerId::new(3)).expect("node 3");
        insert(
            &mut tree,
            detached,
            LayerPlacement::Inside {
                target: LayerId::new(1),
            },
        )
        .expect("insert");
        assert!(invariant_report(&tree).is_valid());
    }

    #[test]
    fn duplicate_ids_are_flagged() {
        let tree = vec![
            LayerNode::new(1, "a").child(LayerNode::new(2, "b")),
            LayerNode::new(2, "dup"),
        ];
        let report = invariant_report(&tree);
        assert!(!report.is_valid());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].code, LayerInvariantCode::DuplicateId);
        assert_eq!(report.issues[0].node, LayerId::new(2));
    }

    #[test]
    fn stale_parent_hint_is_flagged() {
        // Assembled by hand: the hint claims node 9, the node sits at root.
        let mut node = LayerNode::new(1, "a");
        node.parent = Some(LayerId::new(9));
        let report = invariant_report(&[node]);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].code, LayerInvariantCode::ParentHintMismatch);
    }

    #[test]
    fn self_parent_hint_is_flagged() {
        let mut node = LayerNode::new(1, "a");
        node.parent = Some(LayerId::new(1));
        let report = invariant_report(&[node]);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].code, LayerInvariantCode::SelfParentHint);
    }
}
