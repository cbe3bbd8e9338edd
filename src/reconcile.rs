//! Maintenance passes that keep the wire/node graph consistent after a
//! gesture edits an endpoint.
//!
//! [`Graph::reconcile`] runs, in order: a sweep for wires whose endpoint
//! element is gone, a coincidence merge around the touched element, orphan
//! pruning, and gate absorption of the touched node. Each pass is
//! single-shot; a gesture that needs full convergence opts into
//! [`Graph::reconcile_to_fixpoint`].

use egui::Pos2;

use crate::catalog::PortKind;
use crate::geometry::{dist_sq, rect_contains};
use crate::graph::{Element, ElementId, Graph, WireId};

/// What a single [`Graph::reconcile`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub dropped_wires: usize,
    pub merged: bool,
    pub pruned: usize,
    pub absorbed: bool,
}

impl ReconcileOutcome {
    pub fn changed(&self) -> bool {
        self.dropped_wires > 0 || self.merged || self.pruned > 0 || self.absorbed
    }

    fn accumulate(&mut self, other: Self) {
        self.dropped_wires += other.dropped_wires;
        self.merged |= other.merged;
        self.pruned += other.pruned;
        self.absorbed |= other.absorbed;
    }
}

impl Graph {
    /// Remove wires whose start or end element no longer exists. The source
    /// tool did this lazily at draw time; here it opens every maintenance
    /// pass instead.
    pub fn drop_dangling_wires(&mut self) -> usize {
        let doomed: Vec<WireId> = self
            .wires
            .iter()
            .filter(|(_, w)| {
                self.elements.get(w.start).is_none() || self.elements.get(w.end).is_none()
            })
            .map(|(id, _)| id)
            .collect();
        for id in &doomed {
            self.wires.remove(*id);
            log::debug!("dropped dangling wire {id}");
        }
        doomed.len()
    }

    /// Delete every node with zero incident wires. One pass over a snapshot
    /// of the incidence counts; nodes orphaned by this pass's own deletions
    /// wait for the next call.
    pub fn prune_orphans(&mut self) -> usize {
        let orphans: Vec<ElementId> = self
            .elements
            .iter()
            .filter(|(id, e)| e.is_node() && self.incidence(*id) == 0)
            .map(|(id, _)| id)
            .collect();
        for id in &orphans {
            self.elements.remove(*id);
            log::debug!("pruned orphan node {id}");
        }
        orphans.len()
    }

    /// Fold the first node found at `touched`'s exact position into
    /// `touched`: its wires are rewritten to the survivor with port 0. The
    /// loser is left for the orphan pass that follows. Only one merge per
    /// call; callers loop via [`Self::reconcile_to_fixpoint`] when they need
    /// full convergence.
    pub fn merge_coincident(&mut self, touched: ElementId) -> bool {
        let Some(pos) = self.elements.get(touched).map(Element::pos) else {
            return false;
        };
        let loser = self.elements.iter().find_map(|(id, e)| {
            (id != touched && e.is_node() && e.pos() == pos).then_some(id)
        });
        let Some(loser) = loser else {
            return false;
        };
        for wire in self.wires.values_mut() {
            if wire.start == loser {
                wire.start = touched;
                wire.start_port = 0;
            }
            if wire.end == loser {
                wire.end = touched;
                wire.end_port = 0;
            }
        }
        log::debug!("merged coincident node {loser} into {touched}");
        true
    }

    /// If `touched` is a node sitting inside some gate's bounding box,
    /// reroute every wire incident on it to the gate's nearest compatible
    /// port. The node itself stays put; a later orphan pass collects it once
    /// nothing references it.
    pub fn absorb_into_gate(&mut self, touched: ElementId) -> bool {
        let node_pos = match self.elements.get(touched) {
            Some(e @ Element::Node { .. }) => e.pos(),
            _ => return false,
        };
        let incident = self.wires_at(touched);

        for gate_id in self.gate_ids() {
            let Some(Element::Gate { kind, pos }) = self.elements.get(gate_id).cloned() else {
                continue;
            };
            let Some(rect) = self.gate_rect(gate_id) else {
                continue;
            };
            if !rect_contains(rect, node_pos) {
                continue;
            }

            let Some((port, port_kind)) = nearest_port(kind, pos, node_pos) else {
                continue;
            };

            for wid in &incident {
                let Some(wire) = self.wires.get(*wid).copied() else {
                    continue;
                };
                match port_kind {
                    PortKind::Input => {
                        if wire.end == touched {
                            self.edit_wire(*wid, wire.start, gate_id, wire.start_port, port);
                        } else if wire.start == touched {
                            // The node fed this wire; flip it so the gate
                            // input stays on the end side.
                            self.edit_wire(*wid, wire.end, gate_id, wire.end_port, port);
                        }
                    }
                    PortKind::Output => {
                        if wire.start == touched {
                            self.edit_wire(*wid, gate_id, wire.end, port, wire.end_port);
                        } else if wire.end == touched {
                            self.edit_wire(*wid, gate_id, wire.start, port, wire.start_port);
                        }
                    }
                }
            }
            log::debug!("absorbed node {touched} into gate {gate_id} port {port} ({port_kind:?})");
            return true;
        }
        false
    }

    /// Single maintenance pass around the element a gesture just touched.
    pub fn reconcile(&mut self, touched: ElementId) -> ReconcileOutcome {
        let dropped_wires = self.drop_dangling_wires();
        let merged = self.merge_coincident(touched);
        let pruned = self.prune_orphans();
        let absorbed = self.absorb_into_gate(touched);
        ReconcileOutcome {
            dropped_wires,
            merged,
            pruned,
            absorbed,
        }
    }

    /// Loop [`Self::reconcile`] until a pass changes nothing. Opt-in; the
    /// single pass stays the default behavior for gestures.
    pub fn reconcile_to_fixpoint(&mut self, touched: ElementId) -> ReconcileOutcome {
        let mut total = ReconcileOutcome::default();
        // Every productive pass removes or rewrites something, so the graph
        // size bounds the iteration count.
        let budget = self.elements.len() + self.wires.len() + 1;
        for _ in 0..budget {
            let outcome = self.reconcile(touched);
            if !outcome.changed() {
                break;
            }
            total.accumulate(outcome);
        }
        total
    }
}

/// Candidate ports for absorption: declared inputs first (or one synthetic
/// centered input when the gate declares none), then declared outputs.
/// Nearest by squared distance wins; ties keep the earlier candidate.
fn nearest_port(
    kind: crate::catalog::GateKind,
    gate_pos: Pos2,
    node_pos: Pos2,
) -> Option<(u32, PortKind)> {
    let sym = kind.symbol();
    let mut best: Option<(f32, u32, PortKind)> = None;
    let mut consider = |pos: Pos2, port: u32, port_kind: PortKind| {
        let d = dist_sq(pos, node_pos);
        if best.is_none_or(|(bd, _, _)| d < bd) {
            best = Some((d, port, port_kind));
        }
    };

    if sym.inputs.is_empty() {
        consider(sym.synthetic_input_pos(gate_pos), 0, PortKind::Input);
    } else {
        for (i, _) in sym.inputs.iter().enumerate() {
            if let Some(pos) = sym.input_pos(gate_pos, i) {
                consider(pos, i as u32, PortKind::Input);
            }
        }
    }
    for (i, _) in sym.outputs.iter().enumerate() {
        if let Some(pos) = sym.output_pos(gate_pos, i) {
            consider(pos, i as u32, PortKind::Output);
        }
    }

    best.map(|(_, port, port_kind)| (port, port_kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::GateKind;
    use egui::pos2;

    #[test]
    fn coincident_wired_nodes_collapse_in_one_pass() {
        let mut graph = Graph::default();
        let anchor_a = graph.new_node(pos2(0.0, 0.0));
        let anchor_b = graph.new_node(pos2(200.0, 0.0));
        let survivor = graph.new_node(pos2(100.0, 0.0));
        let loser = graph.new_node(pos2(100.0, 0.0));
        let wa = graph.connect(anchor_a, survivor, 0, 0);
        let wb = graph.connect(loser, anchor_b, 0, 0);

        let outcome = graph.reconcile(survivor);
        assert!(outcome.merged);
        // The loser lost its wires and fell to the orphan pass.
        assert!(graph.element(loser).is_none());
        assert!(graph.element(survivor).is_some());
        assert_eq!(graph.wire(wa).expect("wire a").end, survivor);
        let rewired = graph.wire(wb).expect("wire b");
        assert_eq!(rewired.start, survivor);
        assert_eq!(rewired.start_port, 0);
    }

    #[test]
    fn merge_handles_one_coincident_node_per_pass() {
        let mut graph = Graph::default();
        let far_a = graph.new_node(pos2(0.0, 0.0));
        let far_b = graph.new_node(pos2(200.0, 0.0));
        let far_c = graph.new_node(pos2(300.0, 0.0));
        let touched = graph.new_node(pos2(100.0, 0.0));
        let twin_a = graph.new_node(pos2(100.0, 0.0));
        let twin_b = graph.new_node(pos2(100.0, 0.0));
        graph.connect(far_a, touched, 0, 0);
        graph.connect(far_b, twin_a, 0, 0);
        graph.connect(far_c, twin_b, 0, 0);

        graph.reconcile(touched);
        let coincident_left: Vec<ElementId> = graph
            .node_ids()
            .into_iter()
            .filter(|id| {
                *id != touched
                    && graph.element(*id).map(Element::pos) == Some(pos2(100.0, 0.0))
            })
            .collect();
        assert_eq!(coincident_left.len(), 1, "one twin survives a single pass");

        graph.reconcile_to_fixpoint(touched);
        assert!(graph.element(twin_a).is_none());
        assert!(graph.element(twin_b).is_none());
        assert_eq!(graph.incidence(touched), 3);
    }

    #[test]
    fn removing_the_last_wire_prunes_its_nodes_immediately() {
        let mut graph = Graph::default();
        let lead = graph.add_wire(pos2(50.0, 50.0), None, 0);
        graph.remove_wire(lead.id);
        assert!(graph.element(lead.start).is_none());
        assert!(graph.element(lead.end).is_none());
        assert!(graph.elements.is_empty());
    }

    #[test]
    fn dangling_wires_are_swept_on_reconcile() {
        let mut graph = Graph::default();
        let a = graph.new_node(pos2(0.0, 0.0));
        let b = graph.new_node(pos2(100.0, 0.0));
        let wire = graph.connect(a, b, 0, 0);
        // Bypass the cascading remove to fabricate a stale reference.
        graph.elements.remove(b);

        let outcome = graph.reconcile(a);
        assert_eq!(outcome.dropped_wires, 1);
        assert!(graph.wire(wire).is_none());
        // With its wire gone the touched node is an orphan too.
        assert!(graph.element(a).is_none());
    }

    #[test]
    fn absorption_picks_the_nearest_input_port() {
        let mut graph = Graph::default();
        let trigger = graph.new_gate_at(GateKind::DTrigger, pos2(0.0, 0.0));
        let outside = graph.new_node(pos2(-200.0, 80.0));
        let node = graph.new_node(pos2(0.0, 80.0));
        let wire = graph.connect(outside, node, 0, 0);

        assert!(graph.absorb_into_gate(node));
        let rerouted = graph.wire(wire).expect("wire survives");
        // Inputs sit at y = 20/60/90/130; y=90 (port 2) is nearest to 80.
        assert_eq!(rerouted.end, trigger);
        assert_eq!(rerouted.end_port, 2);
        assert_eq!(rerouted.start, outside);
    }

    #[test]
    fn absorption_tie_breaks_to_the_lower_port_index() {
        let mut graph = Graph::default();
        graph.new_gate_at(GateKind::Inverter, pos2(0.0, 0.0));
        let outside = graph.new_node(pos2(-200.0, 0.0));
        // y=70 sits exactly between the Inverter inputs at y=60 (port 1)
        // and y=80 (port 2): squared distance 100 either way.
        let node = graph.new_node(pos2(0.0, 70.0));
        let wire = graph.connect(outside, node, 0, 0);

        assert!(graph.absorb_into_gate(node));
        assert_eq!(graph.wire(wire).expect("wire").end_port, 1);
    }

    #[test]
    fn absorption_flips_a_wire_that_started_at_the_node() {
        let mut graph = Graph::default();
        let trigger = graph.new_gate_at(GateKind::DTrigger, pos2(0.0, 0.0));
        let outside = graph.new_node(pos2(-200.0, 20.0));
        let node = graph.new_node(pos2(0.0, 20.0));
        // The node sources this wire, but the nearest port is an input.
        let wire = graph.connect(node, outside, 0, 0);

        assert!(graph.absorb_into_gate(node));
        let flipped = graph.wire(wire).expect("wire");
        assert_eq!(flipped.start, outside);
        assert_eq!(flipped.end, trigger);
        assert_eq!(flipped.end_port, 0);
    }

    #[test]
    fn absorption_flips_a_wire_that_ended_at_the_node_near_an_output() {
        let mut graph = Graph::default();
        let trigger = graph.new_gate_at(GateKind::DTrigger, pos2(0.0, 0.0));
        let outside = graph.new_node(pos2(300.0, 110.0));
        // Right next to output port 1 at (100, 110).
        let node = graph.new_node(pos2(90.0, 110.0));
        let wire = graph.connect(outside, node, 0, 0);

        assert!(graph.absorb_into_gate(node));
        let flipped = graph.wire(wire).expect("wire");
        assert_eq!(flipped.start, trigger);
        assert_eq!(flipped.start_port, 1);
        assert_eq!(flipped.end, outside);
    }

    #[test]
    fn absorbed_node_lingers_until_the_next_pass() {
        let mut graph = Graph::default();
        graph.new_gate_at(GateKind::DTrigger, pos2(0.0, 0.0));
        let outside = graph.new_node(pos2(-200.0, 20.0));
        let node = graph.new_node(pos2(0.0, 20.0));
        graph.connect(outside, node, 0, 0);

        let outcome = graph.reconcile(node);
        assert!(outcome.absorbed);
        // Absorption runs after pruning, so the now-unreferenced node is
        // still present here.
        assert!(graph.element(node).is_some());

        let second = graph.reconcile(node);
        assert_eq!(second.pruned, 1);
        assert!(graph.element(node).is_none());
    }

    #[test]
    fn dragging_a_gate_output_lead_back_onto_its_input_side() {
        // The end-to-end gesture: pull a wire out of an AND gate's output,
        // then drop its free end inside the gate near the input edge.
        let mut graph = Graph::default();
        let and = graph.new_gate_at(GateKind::And, pos2(0.0, 0.0));
        let lead = graph.add_wire(pos2(103.0, 47.0), Some(and), 0);

        assert_eq!(
            graph.element(lead.end).expect("lead node").pos(),
            pos2(100.0, 50.0)
        );
        let wire = graph.wire(lead.id).expect("wire");
        assert_eq!((wire.start, wire.start_port), (and, 0));
        assert_eq!((wire.end, wire.end_port), (lead.end, 0));

        graph.move_element(lead.end, pos2(0.0, 50.0));
        let outcome = graph.reconcile(lead.end);
        assert!(outcome.absorbed);

        // The AND declares no inputs, so the synthetic centered input at
        // (0, 50) wins over the output at (50, 50).
        let wire = graph.wire(lead.id).expect("wire");
        assert_eq!((wire.start, wire.start_port), (and, 0));
        assert_eq!((wire.end, wire.end_port), (and, 0));
    }
}
