//! Pointer-gesture state and its translation into graph mutations.
//!
//! A gesture owns at most one [`Drag`] at a time; pointer-up ends it and
//! runs the maintenance pass over every node the gesture touched.

use egui::{Pos2, Vec2};

use crate::app::App;
use crate::graph::{Element, ElementId, WireId};

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy)]
pub enum Drag {
    /// Moving a single element under the pointer.
    Element { id: ElementId, offset: Vec2 },
    /// Moving a whole wire by its body: both endpoint nodes follow.
    WireBody {
        id: WireId,
        grab: Pos2,
        start_was: Pos2,
        end_was: Pos2,
    },
    /// A freshly created (or re-grabbed) wire end node chasing the pointer.
    Lead { wire: WireId, node: ElementId },
}

impl App {
    pub(crate) fn set_drag(&mut self, drag: Drag) {
        if self.drag.is_none() {
            self.drag = Some(drag);
        }
    }

    /// Start a new wire out of `from` (an existing node or a gate port) or
    /// out of thin air, and chase the pointer with its end node.
    pub(crate) fn start_lead(&mut self, at: Pos2, from: Option<ElementId>, from_port: u32) {
        let lead = self.graph.add_wire(at, from, from_port);
        self.set_drag(Drag::Lead {
            wire: lead.id,
            node: lead.end,
        });
    }

    /// Split a wire under the pointer: a new node takes over the middle,
    /// the original wire is shortened onto it, a second wire covers the
    /// rest, and a fresh lead continues from the split point.
    pub(crate) fn split_wire(&mut self, id: WireId, at: Pos2) {
        let Some(wire) = self.graph.wire(id).copied() else {
            return;
        };
        let mid = self.graph.new_node(at);
        self.graph
            .edit_wire(id, wire.start, mid, wire.start_port, 0);
        self.graph.connect(mid, wire.end, 0, wire.end_port);
        self.start_lead(at, Some(mid), 0);
    }

    pub(crate) fn drag_update(&mut self, mouse_world: Pos2) {
        match self.drag {
            Some(Drag::Element { id, offset }) => {
                self.graph.move_element(id, mouse_world + offset);
            }
            Some(Drag::WireBody {
                id,
                grab,
                start_was,
                end_was,
            }) => {
                let delta = mouse_world - grab;
                let Some(wire) = self.graph.wire(id).copied() else {
                    return;
                };
                // Only free nodes follow a body drag; gate and label
                // endpoints stay anchored.
                if self.node_endpoint(wire.start).is_some() {
                    self.graph.move_element(wire.start, start_was + delta);
                }
                if self.node_endpoint(wire.end).is_some() {
                    self.graph.move_element(wire.end, end_was + delta);
                }
            }
            Some(Drag::Lead { node, .. }) => {
                self.graph.move_element(node, mouse_world);
            }
            None => {}
        }
    }

    /// Pointer-up: finish the gesture and reconcile every touched node.
    pub(crate) fn drag_end(&mut self) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        match drag {
            Drag::Element { id, .. } => {
                if self.node_endpoint(id).is_some() {
                    let outcome = self.graph.reconcile(id);
                    if outcome.changed() {
                        log::debug!("reconcile after node move: {outcome:?}");
                    }
                }
            }
            Drag::WireBody { id, .. } => {
                if let Some(wire) = self.graph.wire(id).copied() {
                    for end in [wire.end, wire.start] {
                        if self.node_endpoint(end).is_some() {
                            self.graph.reconcile(end);
                        }
                    }
                }
            }
            Drag::Lead { wire, node } => {
                let start = self.graph.wire(wire).map(|w| w.start);
                self.graph.reconcile(node);
                if let Some(start) = start
                    && self.node_endpoint(start).is_some()
                {
                    self.graph.reconcile(start);
                }
            }
        }
    }

    fn node_endpoint(&self, id: ElementId) -> Option<ElementId> {
        match self.graph.element(id) {
            Some(Element::Node { .. }) => Some(id),
            _ => None,
        }
    }
}
