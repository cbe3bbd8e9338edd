//! The canonical mutable schematic state: elements (nodes, gates, labels)
//! and the wires connecting them.
//!
//! Every mutation goes through this store so the maintenance passes in
//! [`crate::reconcile`] see a consistent picture. Operations are total:
//! an id that no longer resolves is a silent no-op, because interactive
//! dragging routinely races with orphan pruning.

use std::fmt::Display;

use egui::{Pos2, Rect, pos2};
use slotmap::SlotMap;

use crate::catalog::GateKind;
use crate::geometry::snap;

slotmap::new_key_type! {
    pub struct ElementId;
}

impl Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!("{:?}", self.0))
    }
}

slotmap::new_key_type! {
    pub struct WireId;
}

impl Display for WireId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!("{:?}", self.0))
    }
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub enum Element {
    /// Free junction point, no ports.
    Node { pos: Pos2 },
    /// Placed symbol; `pos` is the top-left corner of the catalog box.
    Gate { kind: GateKind, pos: Pos2 },
    /// Free-floating annotation text.
    Label { text: String, pos: Pos2 },
}

impl Element {
    pub fn pos(&self) -> Pos2 {
        match self {
            Self::Node { pos } | Self::Gate { pos, .. } | Self::Label { pos, .. } => *pos,
        }
    }

    fn pos_mut(&mut self) -> &mut Pos2 {
        match self {
            Self::Node { pos } | Self::Gate { pos, .. } | Self::Label { pos, .. } => pos,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node { .. })
    }
}

/// A wire between two endpoints. Ports index the gate's output list at the
/// `start` side and the input list at the `end` side; node and label
/// endpoints always carry port 0.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wire {
    pub start: ElementId,
    pub start_port: u32,
    pub end: ElementId,
    pub end_port: u32,
}

/// Descriptor handed back by [`Graph::add_wire`] so the gesture code can
/// keep dragging the freshly created end node.
#[derive(Debug, Clone, Copy)]
pub struct WireLead {
    pub id: WireId,
    pub start: ElementId,
    pub start_port: u32,
    pub end: ElementId,
}

#[derive(Default, serde::Deserialize, serde::Serialize, Debug, Clone)]
pub struct Graph {
    pub elements: SlotMap<ElementId, Element>,
    pub wires: SlotMap<WireId, Wire>,
}

impl Graph {
    pub fn new_node(&mut self, pos: Pos2) -> ElementId {
        self.elements.insert(Element::Node { pos: snap(pos) })
    }

    /// Insert a gate centered on the world origin, like the palette buttons
    /// in the source tool.
    pub fn new_gate(&mut self, kind: GateKind) -> ElementId {
        let sym = kind.symbol();
        let pos = snap(pos2(-sym.width / 2.0, -sym.height / 2.0));
        self.elements.insert(Element::Gate { kind, pos })
    }

    pub fn new_gate_at(&mut self, kind: GateKind, pos: Pos2) -> ElementId {
        self.elements.insert(Element::Gate {
            kind,
            pos: snap(pos),
        })
    }

    pub fn new_label_at(&mut self, text: String, pos: Pos2) -> ElementId {
        self.elements.insert(Element::Label {
            text,
            pos: snap(pos),
        })
    }

    pub fn new_label(&mut self, text: String) -> ElementId {
        self.elements.insert(Element::Label {
            text,
            pos: Pos2::ZERO,
        })
    }

    /// Snap and overwrite an element's position. Missing ids are tolerated:
    /// the element may have been pruned mid-drag.
    pub fn move_element(&mut self, id: ElementId, pos: Pos2) {
        if let Some(element) = self.elements.get_mut(id) {
            *element.pos_mut() = snap(pos);
        }
    }

    /// Start a wire at `point` (or at `from` when given) and create a fresh
    /// node at `point` as the end, which the caller is expected to drag.
    pub fn add_wire(&mut self, point: Pos2, from: Option<ElementId>, from_port: u32) -> WireLead {
        let start = from.unwrap_or_else(|| self.new_node(point));
        let start_port = if from.is_some() { from_port } else { 0 };
        let end = self.new_node(point);
        let id = self.wires.insert(Wire {
            start,
            start_port,
            end,
            end_port: 0,
        });
        WireLead {
            id,
            start,
            start_port,
            end,
        }
    }

    /// Wire two existing endpoints directly, no new nodes.
    pub fn connect(
        &mut self,
        start: ElementId,
        end: ElementId,
        start_port: u32,
        end_port: u32,
    ) -> WireId {
        self.wires.insert(Wire {
            start,
            start_port,
            end,
            end_port,
        })
    }

    /// Overwrite a wire's endpoints in place (wire splits, absorption
    /// reroutes). No-op when the wire is gone.
    pub fn edit_wire(
        &mut self,
        id: WireId,
        start: ElementId,
        end: ElementId,
        start_port: u32,
        end_port: u32,
    ) {
        if let Some(wire) = self.wires.get_mut(id) {
            *wire = Wire {
                start,
                start_port,
                end,
                end_port,
            };
        }
    }

    /// Remove an element and cascade to every wire referencing it.
    pub fn remove_element(&mut self, id: ElementId) {
        if self.elements.remove(id).is_none() {
            return;
        }
        let doomed: Vec<WireId> = self
            .wires
            .iter()
            .filter(|(_, w)| w.start == id || w.end == id)
            .map(|(wid, _)| wid)
            .collect();
        for wid in doomed {
            self.wires.remove(wid);
        }
        self.prune_orphans();
    }

    /// Remove a wire, then collect any nodes it was the last tether for.
    pub fn remove_wire(&mut self, id: WireId) {
        if self.wires.remove(id).is_some() {
            self.prune_orphans();
        }
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(id)
    }

    /// Wires incident on an element, in key order.
    pub fn wires_at(&self, id: ElementId) -> Vec<WireId> {
        self.wires
            .iter()
            .filter(|(_, w)| w.start == id || w.end == id)
            .map(|(wid, _)| wid)
            .collect()
    }

    pub fn incidence(&self, id: ElementId) -> usize {
        self.wires
            .values()
            .filter(|w| w.start == id || w.end == id)
            .count()
    }

    /// Bounding box of a gate element; `None` for nodes and labels.
    pub fn gate_rect(&self, id: ElementId) -> Option<Rect> {
        match self.elements.get(id)? {
            Element::Gate { kind, pos } => {
                Some(Rect::from_min_size(*pos, kind.symbol().size()))
            }
            Element::Node { .. } | Element::Label { .. } => None,
        }
    }

    /// World position of a wire's start endpoint. A gate start resolves to
    /// the indexed output port.
    pub fn wire_start_pos(&self, id: WireId) -> Option<Pos2> {
        let wire = self.wires.get(id)?;
        match self.elements.get(wire.start)? {
            Element::Node { pos } | Element::Label { pos, .. } => Some(*pos),
            Element::Gate { kind, pos } => {
                kind.symbol().output_pos(*pos, wire.start_port as usize)
            }
        }
    }

    /// World position of a wire's end endpoint. A gate end resolves to the
    /// indexed input port; gates without declared inputs fan incoming wires
    /// out around the middle of their left edge, matching the source tool.
    pub fn wire_end_pos(&self, id: WireId) -> Option<Pos2> {
        let wire = self.wires.get(id)?;
        match self.elements.get(wire.end)? {
            Element::Node { pos } | Element::Label { pos, .. } => Some(*pos),
            Element::Gate { kind, pos } => {
                let sym = kind.symbol();
                if !sym.inputs.is_empty() {
                    return sym.input_pos(*pos, wire.end_port as usize);
                }
                let incoming: Vec<WireId> = self
                    .wires
                    .iter()
                    .filter(|(_, w)| w.end == wire.end)
                    .map(|(wid, _)| wid)
                    .collect();
                if incoming.len() <= 1 {
                    return Some(sym.synthetic_input_pos(*pos));
                }
                let index = incoming.iter().position(|&w| w == id)?;
                let first = sym.height / 2.0 - 10.0 * (incoming.len() - 1) as f32;
                Some(pos2(pos.x, pos.y + first + 20.0 * index as f32))
            }
        }
    }

    pub fn node_ids(&self) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|(_, e)| e.is_node())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn gate_ids(&self) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|(_, e)| matches!(e, Element::Gate { .. }))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn label_ids(&self) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|(_, e)| matches!(e, Element::Label { .. }))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn wire_ids(&self) -> Vec<WireId> {
        self.wires.keys().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    #[test]
    fn new_node_snaps_its_position() {
        let mut graph = Graph::default();
        let id = graph.new_node(pos2(13.0, 27.0));
        assert_eq!(
            graph.element(id).expect("node exists").pos(),
            pos2(10.0, 30.0)
        );
    }

    #[test]
    fn new_gate_is_centered_on_the_origin() {
        let mut graph = Graph::default();
        let id = graph.new_gate(GateKind::And);
        // 50x100 box: top-left (-25, -50), -25 snaps to the even multiple.
        let pos = graph.element(id).expect("gate exists").pos();
        assert_eq!(pos, pos2(-20.0, -50.0));
        let rect = graph.gate_rect(id).expect("gate has a rect");
        assert_eq!(rect.size(), egui::vec2(50.0, 100.0));
    }

    #[test]
    fn move_element_tolerates_pruned_ids() {
        let mut graph = Graph::default();
        let id = graph.new_node(pos2(0.0, 0.0));
        graph.remove_element(id);
        // Must not panic; the drag may still be in flight.
        graph.move_element(id, pos2(50.0, 50.0));
        assert!(graph.element(id).is_none());
    }

    #[test]
    fn add_wire_creates_a_fresh_end_node_at_the_point() {
        let mut graph = Graph::default();
        let lead = graph.add_wire(pos2(100.0, 50.0), None, 0);
        assert_ne!(lead.start, lead.end);
        assert_eq!(graph.elements.len(), 2);
        assert_eq!(
            graph.element(lead.end).expect("end node").pos(),
            pos2(100.0, 50.0)
        );
        let wire = graph.wire(lead.id).expect("wire exists");
        assert_eq!(wire.start, lead.start);
        assert_eq!(wire.end, lead.end);
        assert_eq!((wire.start_port, wire.end_port), (0, 0));
    }

    #[test]
    fn add_wire_from_a_gate_keeps_the_port() {
        let mut graph = Graph::default();
        let gate = graph.new_gate_at(GateKind::DTrigger, pos2(0.0, 0.0));
        let lead = graph.add_wire(pos2(200.0, 40.0), Some(gate), 1);
        let wire = graph.wire(lead.id).expect("wire exists");
        assert_eq!(wire.start, gate);
        assert_eq!(wire.start_port, 1);
        // Only the end node is new.
        assert_eq!(graph.elements.len(), 2);
    }

    #[test]
    fn removing_an_element_cascades_to_its_wires() {
        let mut graph = Graph::default();
        let a = graph.new_node(pos2(0.0, 0.0));
        let b = graph.new_node(pos2(100.0, 0.0));
        let c = graph.new_node(pos2(200.0, 0.0));
        let ab = graph.connect(a, b, 0, 0);
        let bc = graph.connect(b, c, 0, 0);
        graph.remove_element(b);

        assert!(graph.wire(ab).is_none());
        assert!(graph.wire(bc).is_none());
        for (_, wire) in &graph.wires {
            assert!(graph.element(wire.start).is_some());
            assert!(graph.element(wire.end).is_some());
        }
    }

    #[test]
    fn wire_endpoints_resolve_gate_ports() {
        let mut graph = Graph::default();
        let trigger = graph.new_gate_at(GateKind::DTrigger, pos2(0.0, 0.0));
        let node = graph.new_node(pos2(300.0, 40.0));
        let out = graph.connect(trigger, node, 1, 0);
        // Output port 1 of the D-trigger sits at (width, 110).
        assert_eq!(graph.wire_start_pos(out), Some(pos2(100.0, 110.0)));
        assert_eq!(graph.wire_end_pos(out), Some(pos2(300.0, 40.0)));

        let into = graph.connect(node, trigger, 0, 2);
        assert_eq!(graph.wire_end_pos(into), Some(pos2(0.0, 90.0)));
    }

    #[test]
    fn inputless_gates_fan_incoming_wires_around_their_left_edge() {
        let mut graph = Graph::default();
        let and = graph.new_gate_at(GateKind::And, pos2(0.0, 0.0));
        let a = graph.new_node(pos2(-100.0, 0.0));
        let b = graph.new_node(pos2(-100.0, 100.0));

        let first = graph.connect(a, and, 0, 0);
        assert_eq!(graph.wire_end_pos(first), Some(pos2(0.0, 50.0)));

        let second = graph.connect(b, and, 0, 0);
        // Two incoming wires spread 20 apart around y = height/2.
        assert_eq!(graph.wire_end_pos(first), Some(pos2(0.0, 40.0)));
        assert_eq!(graph.wire_end_pos(second), Some(pos2(0.0, 60.0)));
    }
}
