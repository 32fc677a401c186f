//! Layer node model: identifiers, flags, and the node value.

use std::collections::BTreeMap;
use std::fmt;

use bitflags::bitflags;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// Stable identifier for layer nodes.
///
/// Uniqueness across one tree is a caller-enforced invariant: lookups
/// return the first match in pre-order and the mutation operations do not
/// detect duplicates. [`crate::invariant::invariant_report`] diagnoses
/// violations explicitly.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct LayerId(u64);

impl LayerId {
    /// Create a layer ID from a raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LayerId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

bitflags! {
    /// Orthogonal per-layer state flags.
    ///
    /// No invariant links the flags; each defaults to unset.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LayerFlags: u8 {
        /// Layer content is rendered by the host.
        const VISIBLE = 1 << 0;
        /// Host-side edits to this layer are blocked.
        const LOCKED = 1 << 1;
        /// Layer participates in the current selection.
        const SELECTED = 1 << 2;
        /// Children are hidden in the host's panel.
        const COLLAPSED = 1 << 3;
    }
}

impl Serialize for LayerFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for LayerFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u8::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}

/// A node in the layer hierarchy.
///
/// Structure is always derived from `children`. The `parent` field is a
/// denormalized hint the mutation operations keep consistent so external
/// observers can read ownership without a tree walk; it is never trusted
/// for traversal or legality checks.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LayerNode {
    /// Identifier, unique across the whole tree (caller-enforced).
    pub id: LayerId,
    /// Display label; opaque to the engine.
    pub title: String,
    /// Orthogonal state flags.
    #[serde(default)]
    pub flags: LayerFlags,
    /// Ordered children; order reflects stacking (z-order).
    #[serde(default)]
    pub children: Vec<LayerNode>,
    /// Advisory back-reference to the owning node.
    #[serde(default)]
    pub parent: Option<LayerId>,
    /// Forward-compatible opaque payload; untouched by the engine.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl LayerNode {
    /// Create a leaf node with the given id and label.
    #[must_use]
    pub fn new(id: impl Into<LayerId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            flags: LayerFlags::empty(),
            children: Vec::new(),
            parent: None,
            data: BTreeMap::new(),
        }
    }

    /// Add a child node, rewriting its `parent` hint to this node.
    #[must_use]
    pub fn child(mut self, mut node: LayerNode) -> Self {
        node.parent = Some(self.id);
        self.children.push(node);
        self
    }

    /// Set children from a vec, rewriting their `parent` hints.
    #[must_use]
    pub fn with_children(mut self, nodes: Vec<LayerNode>) -> Self {
        self.children = nodes;
        for child in &mut self.children {
            child.parent = Some(self.id);
        }
        self
    }

    /// Set the flag set wholesale.
    #[must_use]
    pub fn with_flags(mut self, flags: LayerFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Attach one payload entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Whether this node has children.
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Whether the `VISIBLE` flag is set.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.flags.contains(LayerFlags::VISIBLE)
    }

    /// Whether the `LOCKED` flag is set.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.flags.contains(LayerFlags::LOCKED)
    }

    /// Whether the `SELECTED` flag is set.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.flags.contains(LayerFlags::SELECTED)
    }

    /// Whether the `COLLAPSED` flag is set.
    #[must_use]
    pub const fn is_collapsed(&self) -> bool {
        self.flags.contains(LayerFlags::COLLAPSED)
    }
}
