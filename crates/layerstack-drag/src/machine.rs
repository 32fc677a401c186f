//! Interactive drag lifecycle for a layer panel.
//!
//! The machine is pure over the tree: it decides, the host mutates (via
//! [`crate::apply_drop`]) and owns pointer capture. At most one drag is
//! active per machine; a second `Begin` while dragging is an explicit
//! no-op, not an error.

use serde::{Deserialize, Serialize};

use layerstack_tree::{LayerId, LayerNode, find};

use crate::{DragConfig, DropPosition, DropRejectReason, DropVerdict, drop_verdict};

/// Lifecycle state of one interactive drag.
///
/// ```text
/// Idle -> Dragging -> Idle (drop or cancel)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DragState {
    /// No drag in flight.
    Idle,
    /// One layer (plus companions) is being dragged.
    Dragging {
        /// The dragged layer.
        source: LayerId,
        /// Additional selected layers travelling with the drag.
        companions: Vec<LayerId>,
        /// Current legal drop target, if any.
        target: Option<LayerId>,
        /// Position against the current target.
        position: Option<DropPosition>,
    },
}

/// Input events driving the machine; the host translates pointer input
/// into these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DragEvent {
    /// Pointer-down started a drag on a layer row.
    Begin {
        /// The grabbed layer.
        source: LayerId,
        /// Other selected layers grabbed with it.
        companions: Vec<LayerId>,
    },
    /// Pointer moved over a candidate row.
    Hover {
        /// The candidate layer.
        target: LayerId,
        /// Position derived from the pointer's offset within the row.
        position: DropPosition,
    },
    /// Pointer left every candidate row.
    LeaveTarget,
    /// Pointer-up.
    Release,
    /// Host-side cancel (Escape, window blur, ...).
    Cancel,
}

/// Explicit no-op diagnostics for events that are safely ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragNoopReason {
    /// Hover/release/cancel arrived with no drag in flight.
    IdleWithoutActiveDrag,
    /// A second `Begin` arrived while dragging.
    DragAlreadyInProgress,
    /// The dragged id does not occur in the tree.
    UnknownSource,
    /// Hover repeated the current target and position.
    HoverUnchanged,
}

/// Effect emitted by one lifecycle step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum DragEffect {
    /// A drag started.
    Started {
        /// The grabbed layer.
        source: LayerId,
        /// Companion layers after the multi-select policy was applied.
        companions: Vec<LayerId>,
    },
    /// Hover moved onto a legal target.
    HoverChanged {
        /// The new target.
        target: LayerId,
        /// The new position.
        position: DropPosition,
    },
    /// Hover moved onto an illegal target; the stored target was cleared
    /// so the host un-highlights.
    HoverRejected {
        /// The refused candidate.
        target: LayerId,
        /// The attempted position.
        position: DropPosition,
        /// Why it was refused.
        reason: DropRejectReason,
    },
    /// Hover left every candidate; the stored target was cleared.
    HoverCleared,
    /// Release over a legal target. The machine does not mutate the tree;
    /// the host applies the move with [`crate::apply_drop`].
    Dropped {
        /// The dragged layer.
        source: LayerId,
        /// The resolved target.
        target: LayerId,
        /// The resolved position.
        position: DropPosition,
        /// Companions the host should move along, in selection order.
        companions: Vec<LayerId>,
    },
    /// The drag ended without a drop; nothing mutates.
    Canceled {
        /// The layer that was being dragged, if a drag was in flight.
        source: Option<LayerId>,
    },
    /// The event was ignored.
    Noop {
        /// Why it was ignored.
        reason: DragNoopReason,
    },
}

/// One machine transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragTransition {
    /// Monotonic counter across the machine's lifetime.
    pub transition_id: u64,
    /// State before the event.
    pub from: DragState,
    /// State after the event.
    pub to: DragState,
    /// What happened.
    pub effect: DragEffect,
}

/// Runtime lifecycle machine for layer drag-and-drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragMachine {
    state: DragState,
    config: DragConfig,
    transition_counter: u64,
}

impl Default for DragMachine {
    fn default() -> Self {
        Self::new(DragConfig::default())
    }
}

impl DragMachine {
    /// Construct a machine with the given configuration.
    #[must_use]
    pub const fn new(config: DragConfig) -> Self {
        Self {
            state: DragState::Idle,
            config,
            transition_counter: 0,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> &DragState {
        &self.state
    }

    /// The machine's configuration.
    #[must_use]
    pub const fn config(&self) -> DragConfig {
        self.config
    }

    /// Whether a drag is in flight.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    /// Unconditionally reset to Idle, returning a diagnostic transition if
    /// a drag was in flight.
    ///
    /// Safety valve for host cleanup paths (panic guards, teardown) where
    /// synthesizing a `Cancel` event is not possible.
    pub fn force_cancel(&mut self) -> Option<DragTransition> {
        match &self.state {
            DragState::Idle => None,
            DragState::Dragging { source, .. } => {
                let source = *source;
                let from = std::mem::replace(&mut self.state, DragState::Idle);
                Some(self.transition(
                    from,
                    DragState::Idle,
                    DragEffect::Canceled {
                        source: Some(source),
                    },
                ))
            }
        }
    }

    /// Apply one drag event against the current tree and emit the
    /// resulting transition.
    ///
    /// Hover legality is recomputed on every call, and release legality is
    /// re-checked against the tree as it is *now*, so a tree edited
    /// mid-drag cannot smuggle an illegal drop through a stale hover.
    pub fn apply_event(&mut self, tree: &[LayerNode], event: DragEvent) -> DragTransition {
        let from = self.state.clone();
        let (to, effect) = self.step(tree, event);
        self.state = to.clone();
        self.transition(from, to, effect)
    }

    fn transition(&mut self, from: DragState, to: DragState, effect: DragEffect) -> DragTransition {
        self.transition_counter = self.transition_counter.saturating_add(1);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            message = "layer_drag.transition",
            transition_id = self.transition_counter,
            effect = ?effect,
        );
        DragTransition {
            transition_id: self.transition_counter,
            from,
            to,
            effect,
        }
    }

    fn step(&self, tree: &[LayerNode], event: DragEvent) -> (DragState, DragEffect) {
        match (self.state.clone(), event) {
            (DragState::Idle, DragEvent::Begin { source, companions }) => {
                if find(tree, source).is_none() {
                    return (
                        DragState::Idle,
                        DragEffect::Noop {
                            reason: DragNoopReason::UnknownSource,
                        },
                    );
                }
                let companions = if self.config.allow_multi_select {
                    companions
                } else {
                    Vec::new()
                };
                (
                    DragState::Dragging {
                        source,
                        companions: companions.clone(),
                        target: None,
                        position: None,
                    },
                    DragEffect::Started { source, companions },
                )
            }
            (DragState::Idle, _) => (
                DragState::Idle,
                DragEffect::Noop {
                    reason: DragNoopReason::IdleWithoutActiveDrag,
                },
            ),
            (state @ DragState::Dragging { .. }, DragEvent::Begin { .. }) => (
                state,
                DragEffect::Noop {
                    reason: DragNoopReason::DragAlreadyInProgress,
                },
            ),
            (
                DragState::Dragging {
                    source,
                    companions,
                    target,
                    position,
                },
                DragEvent::Hover {
                    target: candidate,
                    position: candidate_position,
                },
            ) => {
                if target == Some(candidate) && position == Some(candidate_position) {
                    return (
                        DragState::Dragging {
                            source,
                            companions,
                            target,
                            position,
                        },
                        DragEffect::Noop {
                            reason: DragNoopReason::HoverUnchanged,
                        },
                    );
                }
                match drop_verdict(tree, source, candidate, candidate_position, &self.config) {
                    DropVerdict::Allowed => (
                        DragState::Dragging {
                            source,
                            companions,
                            target: Some(candidate),
                            position: Some(candidate_position),
                        },
                        DragEffect::HoverChanged {
                            target: candidate,
                            position: candidate_position,
                        },
                    ),
                    DropVerdict::Rejected { reason } => (
                        DragState::Dragging {
                            source,
                            companions,
                            target: None,
                            position: None,
                        },
                        DragEffect::HoverRejected {
                            target: candidate,
                            position: candidate_position,
                            reason,
                        },
                    ),
                }
            }
            (
                DragState::Dragging {
                    source,
                    companions,
                    target,
                    position,
                },
                DragEvent::LeaveTarget,
            ) => {
                if target.is_none() && position.is_none() {
                    (
                        DragState::Dragging {
                            source,
                            companions,
                            target,
                            position,
                        },
                        DragEffect::Noop {
                            reason: DragNoopReason::HoverUnchanged,
                        },
                    )
                } else {
                    (
                        DragState::Dragging {
                            source,
                            companions,
                            target: None,
                            position: None,
                        },
                        DragEffect::HoverCleared,
                    )
                }
            }
            (
                DragState::Dragging {
                    source,
                    companions,
                    target: Some(target),
                    position: Some(position),
                },
                DragEvent::Release,
            ) => match drop_verdict(tree, source, target, position, &self.config) {
                DropVerdict::Allowed => (
                    DragState::Idle,
                    DragEffect::Dropped {
                        source,
                        target,
                        position,
                        companions,
                    },
                ),
                DropVerdict::Rejected { .. } => (
                    DragState::Idle,
                    DragEffect::Canceled {
                        source: Some(source),
                    },
                ),
            },
            (DragState::Dragging { source, .. }, DragEvent::Release | DragEvent::Cancel) => (
                DragState::Idle,
                DragEffect::Canceled {
                    source: Some(source),
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply_drop;
    use layerstack_tree::LayerNode;

    fn sample() -> Vec<LayerNode> {
        vec![
            LayerNode::new(1, "Background"),
            LayerNode::new(2, "Content").child(LayerNode::new(4, "Text")),
            LayerNode::new(3, "Overlay"),
        ]
    }

    fn begin(source: u64) -> DragEvent {
        DragEvent::Begin {
            source: LayerId::new(source),
            companions: Vec::new(),
        }
    }

    fn hover(target: u64, position: DropPosition) -> DragEvent {
        DragEvent::Hover {
            target: LayerId::new(target),
            position,
        }
    }

    #[test]
    fn happy_path_drag_and_drop() {
        let tree = sample();
        let mut machine = DragMachine::default();

        let t = machine.apply_event(&tree, begin(3));
        assert!(matches!(t.effect, DragEffect::Started { source, .. } if source == LayerId::new(3)));
        assert!(machine.is_active());

        let t = machine.apply_event(&tree, hover(2, DropPosition::Inside));
        assert!(matches!(t.effect, DragEffect::HoverChanged { .. }));

        let t = machine.apply_event(&tree, DragEvent::Release);
        let DragEffect::Dropped {
            source,
            target,
            position,
            ..
        } = t.effect
        else {
            panic!("expected Dropped, got {:?}", t.effect);
        };
        assert_eq!((source, target, position), (
            LayerId::new(3),
            LayerId::new(2),
            DropPosition::Inside
        ));
        assert!(!machine.is_active());

        // The host materializes the move.
        let mut tree = tree;
        apply_drop(&mut tree, source, target, position, &machine.config()).expect("legal drop");
        assert_eq!(
            layerstack_tree::find(&tree, LayerId::new(3)).and_then(|n| n.parent),
            Some(LayerId::new(2))
        );
    }

    #[test]
    fn transition_ids_are_monotonic() {
        let tree = sample();
        let mut machine = DragMachine::default();
        let a = machine.apply_event(&tree, begin(1));
        let b = machine.apply_event(&tree, hover(3, DropPosition::After));
        let c = machine.apply_event(&tree, DragEvent::Cancel);
        assert!(a.transition_id < b.transition_id && b.transition_id < c.transition_id);
    }

    #[test]
    fn repeated_hover_is_noop() {
        let tree = sample();
        let mut machine = DragMachine::default();
        machine.apply_event(&tree, begin(1));
        machine.apply_event(&tree, hover(3, DropPosition::Before));
        let t = machine.apply_event(&tree, hover(3, DropPosition::Before));
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: DragNoopReason::HoverUnchanged
            }
        );
        // Same target, different position: a real change.
        let t = machine.apply_event(&tree, hover(3, DropPosition::After));
        assert!(matches!(t.effect, DragEffect::HoverChanged { .. }));
    }

    #[test]
    fn illegal_hover_clears_target_and_release_cancels() {
        let tree = sample();
        let mut machine = DragMachine::default();
        machine.apply_event(&tree, begin(2));
        machine.apply_event(&tree, hover(3, DropPosition::Inside));

        // Hovering into the dragged subtree is refused and clears the target.
        let t = machine.apply_event(&tree, hover(4, DropPosition::Inside));
        assert!(matches!(
            t.effect,
            DragEffect::HoverRejected {
                reason: DropRejectReason::TargetInsideSource,
                ..
            }
        ));
        assert!(matches!(
            machine.state(),
            DragState::Dragging { target: None, position: None, .. }
        ));

        let t = machine.apply_event(&tree, DragEvent::Release);
        assert_eq!(
            t.effect,
            DragEffect::Canceled {
                source: Some(LayerId::new(2))
            }
        );
    }

    #[test]
    fn release_legality_is_rechecked_against_current_tree() {
        let mut tree = sample();
        let mut machine = DragMachine::default();
        machine.apply_event(&tree, begin(1));
        machine.apply_event(&tree, hover(4, DropPosition::After));

        // The target disappears between hover and release.
        layerstack_tree::remove(&mut tree, LayerId::new(4)).expect("node 4");
        let t = machine.apply_event(&tree, DragEvent::Release);
        assert_eq!(
            t.effect,
            DragEffect::Canceled {
                source: Some(LayerId::new(1))
            }
        );
    }

    #[test]
    fn leave_target_clears_hover() {
        let tree = sample();
        let mut machine = DragMachine::default();
        machine.apply_event(&tree, begin(1));
        let t = machine.apply_event(&tree, DragEvent::LeaveTarget);
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: DragNoopReason::HoverUnchanged
            }
        );
        machine.apply_event(&tree, hover(3, DropPosition::Before));
        let t = machine.apply_event(&tree, DragEvent::LeaveTarget);
        assert_eq!(t.effect, DragEffect::HoverCleared);
    }

    #[test]
    fn events_outside_a_drag_are_noops() {
        let tree = sample();
        let mut machine = DragMachine::default();
        let t = machine.apply_event(&tree, DragEvent::Release);
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: DragNoopReason::IdleWithoutActiveDrag
            }
        );

        machine.apply_event(&tree, begin(1));
        let t = machine.apply_event(&tree, begin(2));
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: DragNoopReason::DragAlreadyInProgress
            }
        );
    }

    #[test]
    fn unknown_source_does_not_start_a_drag() {
        let tree = sample();
        let mut machine = DragMachine::default();
        let t = machine.apply_event(&tree, begin(99));
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: DragNoopReason::UnknownSource
            }
        );
        assert!(!machine.is_active());
    }

    #[test]
    fn multi_select_policy_strips_companions() {
        let tree = sample();
        let mut machine = DragMachine::new(DragConfig {
            allow_multi_select: false,
            ..DragConfig::default()
        });
        let t = machine.apply_event(
            &tree,
            DragEvent::Begin {
                source: LayerId::new(1),
                companions: vec![LayerId::new(3)],
            },
        );
        assert_eq!(
            t.effect,
            DragEffect::Started {
                source: LayerId::new(1),
                companions: Vec::new()
            }
        );
    }

    #[test]
    fn force_cancel_is_a_safety_valve() {
        let tree = sample();
        let mut machine = DragMachine::default();
        assert!(machine.force_cancel().is_none());

        machine.apply_event(&tree, begin(1));
        let t = machine.force_cancel().expect("active drag");
        assert_eq!(
            t.effect,
            DragEffect::Canceled {
                source: Some(LayerId::new(1))
            }
        );
        assert!(!machine.is_active());
    }

    #[test]
    fn machine_serde_round_trip() {
        let tree = sample();
        let mut machine = DragMachine::default();
        machine.apply_event(&tree, begin(1));
        machine.apply_event(&tree, hover(3, DropPosition::Inside));

        let json = serde_json::to_string(&machine).expect("serialize");
        let back: DragMachine = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, machine);
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn transitions_emit_debug_events() {
        use std::sync::{Arc, Mutex};
        use tracing_subscriber::layer::SubscriberExt;

        #[derive(Default)]
        struct CaptureState {
            transition_events: usize,
        }

        struct Capture {
            state: Arc<Mutex<CaptureState>>,
        }

        impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Capture {
            fn on_event(
                &self,
                event: &tracing::Event<'_>,
                _ctx: tracing_subscriber::layer::Context<'_, S>,
            ) {
                struct MessageVisitor {
                    message: Option<String>,
                }
                impl tracing::field::Visit for MessageVisitor {
                    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                        if field.name() == "message" {
                            self.message = Some(value.to_owned());
                        }
                    }

                    fn record_debug(
                        &mut self,
                        field: &tracing::field::Field,
                        value: &dyn std::fmt::Debug,
                    ) {
                        if field.name() == "message" {
                            self.message = Some(format!("{value:?}").trim_matches('"').to_owned());
                        }
                    }
                }

                let mut visitor = MessageVisitor { message: None };
                event.record(&mut visitor);
                if visitor.message.as_deref() == Some("layer_drag.transition") {
                    self.state.lock().expect("capture lock").transition_events += 1;
                }
            }
        }

        let state = Arc::new(Mutex::new(CaptureState::default()));
        let subscriber = tracing_subscriber::registry().with(Capture {
            state: Arc::clone(&state),
        });
        let _guard = tracing::subscriber::set_default(subscriber);

        let tree = sample();
        let mut machine = DragMachine::default();
        machine.apply_event(&tree, begin(1));
        machine.apply_event(&tree, DragEvent::Cancel);

        assert!(
            state.lock().expect("capture lock").transition_events >= 2,
            "expected layer_drag.transition debug events"
        );
    }
}
