//! Static layout catalog for every placeable gate symbol.
//!
//! Each [`GateKind`] maps to one [`GateSymbol`]: the bounding box, the port
//! offsets down the left (inputs) and right (outputs) edges, decorative text
//! and divider lines. Pure data; geometry and port-resolution code read it,
//! nothing mutates it.

use std::fmt::Display;

use egui::{Pos2, Vec2, pos2, vec2};

#[derive(serde::Deserialize, serde::Serialize, PartialEq, Eq, Copy, Debug, Clone, Hash)]
pub enum GateKind {
    #[serde(rename = "and")]
    And,
    #[serde(rename = "or")]
    Or,
    #[serde(rename = "not")]
    Not,
    #[serde(rename = "nand")]
    Nand,
    #[serde(rename = "nor")]
    Nor,
    #[serde(rename = "D-trigger")]
    DTrigger,
    #[serde(rename = "JK-trigger")]
    JkTrigger,
    #[serde(rename = "SP")]
    Sp,
    #[serde(rename = "Inverter")]
    Inverter,
    #[serde(rename = "Overflow")]
    Overflow,
    #[serde(rename = "DC")]
    Dc,
    #[serde(rename = "CORR")]
    Corr,
}

pub const ALL_GATE_KINDS: [GateKind; 12] = [
    GateKind::And,
    GateKind::Or,
    GateKind::Not,
    GateKind::Nand,
    GateKind::Nor,
    GateKind::DTrigger,
    GateKind::JkTrigger,
    GateKind::Sp,
    GateKind::Inverter,
    GateKind::Overflow,
    GateKind::Dc,
    GateKind::Corr,
];

impl Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Nand => "NAND",
            Self::Nor => "NOR",
            Self::DTrigger => "D-trigger",
            Self::JkTrigger => "JK-trigger",
            Self::Sp => "SP",
            Self::Inverter => "Inverter",
            Self::Overflow => "Overflow",
            Self::Dc => "DC",
            Self::Corr => "CORR",
        };
        f.write_str(name)
    }
}

/// Which side of a gate a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Input,
    Output,
}

/// One attachment point on a gate edge. `y` is the offset from the gate's
/// top-left corner; inputs sit on the left edge, outputs on the right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortSpec {
    pub inverted: bool,
    pub y: f32,
}

const fn port(y: f32) -> PortSpec {
    PortSpec { inverted: false, y }
}

const fn inv_port(y: f32) -> PortSpec {
    PortSpec { inverted: true, y }
}

/// Decorative text inside the symbol body.
#[derive(Debug, Clone, Copy)]
pub struct SymbolText {
    pub text: &'static str,
    pub pos: Pos2,
    /// 0..=1 per axis, `(1, 0)` anchors the text's top-right corner at `pos`.
    pub anchor: Vec2,
}

/// Divider line inside the symbol body (trigger section separators etc).
#[derive(Debug, Clone, Copy)]
pub struct SymbolLine {
    pub start: Pos2,
    pub end: Pos2,
}

#[derive(Debug, Clone, Copy)]
pub struct GateSymbol {
    pub width: f32,
    pub height: f32,
    pub inputs: &'static [PortSpec],
    pub outputs: &'static [PortSpec],
    pub texts: &'static [SymbolText],
    pub lines: &'static [SymbolLine],
}

impl GateSymbol {
    pub fn size(&self) -> Vec2 {
        vec2(self.width, self.height)
    }

    /// Absolute position of input port `index` for a gate whose top-left
    /// corner is `origin`. Inputs sit flush on the left edge.
    pub fn input_pos(&self, origin: Pos2, index: usize) -> Option<Pos2> {
        self.inputs
            .get(index)
            .map(|p| pos2(origin.x, origin.y + p.y))
    }

    /// Absolute position of output port `index`, on the right edge.
    pub fn output_pos(&self, origin: Pos2, index: usize) -> Option<Pos2> {
        self.outputs
            .get(index)
            .map(|p| pos2(origin.x + self.width, origin.y + p.y))
    }

    /// Where wires land on a gate that declares no input ports: the middle
    /// of the left edge.
    pub fn synthetic_input_pos(&self, origin: Pos2) -> Pos2 {
        pos2(origin.x, origin.y + self.height / 2.0)
    }
}

impl GateKind {
    pub fn symbol(&self) -> &'static GateSymbol {
        match self {
            Self::And => &AND_SYMBOL,
            Self::Or => &OR_SYMBOL,
            Self::Not => &NOT_SYMBOL,
            Self::Nand => &NAND_SYMBOL,
            Self::Nor => &NOR_SYMBOL,
            Self::DTrigger => &D_TRIGGER_SYMBOL,
            Self::JkTrigger => &JK_TRIGGER_SYMBOL,
            Self::Sp => &SP_SYMBOL,
            Self::Inverter => &INVERTER_SYMBOL,
            Self::Overflow => &OVERFLOW_SYMBOL,
            Self::Dc => &DC_SYMBOL,
            Self::Corr => &CORR_SYMBOL,
        }
    }
}

pub static AND_SYMBOL: GateSymbol = GateSymbol {
    width: 50.0,
    height: 100.0,
    inputs: &[],
    outputs: &[port(50.0)],
    texts: &[SymbolText {
        text: "&",
        pos: Pos2::new(45.0, 5.0),
        anchor: Vec2::new(1.0, 0.0),
    }],
    lines: &[],
};

pub static OR_SYMBOL: GateSymbol = GateSymbol {
    width: 50.0,
    height: 100.0,
    inputs: &[],
    outputs: &[port(50.0)],
    texts: &[SymbolText {
        text: "1",
        pos: Pos2::new(45.0, 5.0),
        anchor: Vec2::new(1.0, 0.0),
    }],
    lines: &[],
};

pub static NOT_SYMBOL: GateSymbol = GateSymbol {
    width: 50.0,
    height: 100.0,
    inputs: &[],
    outputs: &[inv_port(50.0)],
    texts: &[SymbolText {
        text: "1",
        pos: Pos2::new(45.0, 5.0),
        anchor: Vec2::new(1.0, 0.0),
    }],
    lines: &[],
};

pub static NAND_SYMBOL: GateSymbol = GateSymbol {
    width: 50.0,
    height: 100.0,
    inputs: &[],
    outputs: &[inv_port(50.0)],
    texts: &[SymbolText {
        text: "&",
        pos: Pos2::new(45.0, 5.0),
        anchor: Vec2::new(1.0, 0.0),
    }],
    lines: &[],
};

pub static NOR_SYMBOL: GateSymbol = GateSymbol {
    width: 50.0,
    height: 100.0,
    inputs: &[],
    outputs: &[inv_port(50.0)],
    texts: &[SymbolText {
        text: "1",
        pos: Pos2::new(45.0, 5.0),
        anchor: Vec2::new(1.0, 0.0),
    }],
    lines: &[],
};

pub static D_TRIGGER_SYMBOL: GateSymbol = GateSymbol {
    width: 100.0,
    height: 150.0,
    inputs: &[inv_port(20.0), port(60.0), port(90.0), inv_port(130.0)],
    outputs: &[port(40.0), inv_port(110.0)],
    texts: &[
        SymbolText {
            text: "TT",
            pos: Pos2::new(95.0, 5.0),
            anchor: Vec2::new(1.0, 0.0),
        },
        SymbolText {
            text: "S",
            pos: Pos2::new(15.0, 20.0),
            anchor: Vec2::new(0.5, 0.5),
        },
        SymbolText {
            text: "D",
            pos: Pos2::new(15.0, 60.0),
            anchor: Vec2::new(0.5, 0.5),
        },
        SymbolText {
            text: "C",
            pos: Pos2::new(15.0, 90.0),
            anchor: Vec2::new(0.5, 0.5),
        },
        SymbolText {
            text: "R",
            pos: Pos2::new(15.0, 130.0),
            anchor: Vec2::new(0.5, 0.5),
        },
    ],
    lines: &[
        SymbolLine {
            start: Pos2::new(30.0, 0.0),
            end: Pos2::new(30.0, 150.0),
        },
        SymbolLine {
            start: Pos2::new(0.0, 40.0),
            end: Pos2::new(30.0, 40.0),
        },
        SymbolLine {
            start: Pos2::new(0.0, 110.0),
            end: Pos2::new(30.0, 110.0),
        },
    ],
};

pub static JK_TRIGGER_SYMBOL: GateSymbol = GateSymbol {
    width: 100.0,
    height: 200.0,
    inputs: &[],
    outputs: &[port(50.0)],
    texts: &[
        SymbolText {
            text: "TT",
            pos: Pos2::new(95.0, 5.0),
            anchor: Vec2::new(1.0, 0.0),
        },
        SymbolText {
            text: "S",
            pos: Pos2::new(15.0, 20.0),
            anchor: Vec2::new(0.5, 0.5),
        },
        SymbolText {
            text: "J",
            pos: Pos2::new(15.0, 60.0),
            anchor: Vec2::new(0.5, 0.5),
        },
        SymbolText {
            text: "C",
            pos: Pos2::new(15.0, 100.0),
            anchor: Vec2::new(0.5, 0.5),
        },
        SymbolText {
            text: "K",
            pos: Pos2::new(15.0, 140.0),
            anchor: Vec2::new(0.5, 0.5),
        },
        SymbolText {
            text: "R",
            pos: Pos2::new(15.0, 180.0),
            anchor: Vec2::new(0.5, 0.5),
        },
    ],
    lines: &[
        SymbolLine {
            start: Pos2::new(30.0, 0.0),
            end: Pos2::new(30.0, 200.0),
        },
        SymbolLine {
            start: Pos2::new(0.0, 40.0),
            end: Pos2::new(30.0, 40.0),
        },
        SymbolLine {
            start: Pos2::new(0.0, 80.0),
            end: Pos2::new(30.0, 80.0),
        },
        SymbolLine {
            start: Pos2::new(0.0, 120.0),
            end: Pos2::new(30.0, 120.0),
        },
        SymbolLine {
            start: Pos2::new(0.0, 160.0),
            end: Pos2::new(30.0, 160.0),
        },
    ],
};

pub static SP_SYMBOL: GateSymbol = GateSymbol {
    width: 100.0,
    height: 150.0,
    inputs: &[port(20.0), port(70.0), port(130.0)],
    outputs: &[port(20.0), port(130.0)],
    texts: &[
        SymbolText {
            text: "P",
            pos: Pos2::new(95.0, 5.0),
            anchor: Vec2::new(1.0, 0.0),
        },
        SymbolText {
            text: "S",
            pos: Pos2::new(95.0, 145.0),
            anchor: Vec2::new(1.0, 1.0),
        },
        SymbolText {
            text: "SM",
            pos: Pos2::new(40.0, 5.0),
            anchor: Vec2::new(0.5, 0.0),
        },
    ],
    lines: &[SymbolLine {
        start: Pos2::new(75.0, 0.0),
        end: Pos2::new(75.0, 150.0),
    }],
};

pub static INVERTER_SYMBOL: GateSymbol = GateSymbol {
    width: 100.0,
    height: 150.0,
    inputs: &[
        port(30.0),
        port(60.0),
        port(80.0),
        port(100.0),
        port(120.0),
    ],
    outputs: &[port(60.0), port(80.0), port(100.0), port(120.0)],
    texts: &[SymbolText {
        text: "Пр",
        pos: Pos2::new(50.0, 5.0),
        anchor: Vec2::new(0.5, 0.0),
    }],
    lines: &[],
};

pub static OVERFLOW_SYMBOL: GateSymbol = GateSymbol {
    width: 50.0,
    height: 100.0,
    inputs: &[port(20.0), port(50.0), port(80.0)],
    outputs: &[port(50.0)],
    texts: &[SymbolText {
        text: "Пер",
        pos: Pos2::new(25.0, 5.0),
        anchor: Vec2::new(0.5, 0.0),
    }],
    lines: &[],
};

pub static DC_SYMBOL: GateSymbol = GateSymbol {
    width: 150.0,
    height: 250.0,
    inputs: &[
        port(20.0),
        port(40.0),
        port(60.0),
        port(80.0),
        port(120.0),
        port(140.0),
        port(160.0),
        port(180.0),
        port(230.0),
    ],
    outputs: &[
        port(20.0),
        port(170.0),
        port(190.0),
        port(210.0),
        port(230.0),
    ],
    texts: &[SymbolText {
        text: "DC",
        pos: Pos2::new(75.0, 5.0),
        anchor: Vec2::new(0.5, 0.0),
    }],
    lines: &[],
};

pub static CORR_SYMBOL: GateSymbol = GateSymbol {
    width: 100.0,
    height: 140.0,
    inputs: &[
        port(10.0),
        port(40.0),
        port(70.0),
        port(100.0),
        port(130.0),
    ],
    outputs: &[port(10.0), port(70.0), port(130.0)],
    texts: &[SymbolText {
        text: "Кор",
        pos: Pos2::new(50.0, 5.0),
        anchor: Vec2::new(0.5, 0.0),
    }],
    lines: &[],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_symbol() {
        for kind in ALL_GATE_KINDS {
            let sym = kind.symbol();
            assert!(sym.width > 0.0 && sym.height > 0.0, "{kind} has no box");
            assert!(
                !sym.outputs.is_empty() || !sym.inputs.is_empty(),
                "{kind} has no ports at all"
            );
        }
    }

    #[test]
    fn port_offsets_stay_inside_the_body() {
        for kind in ALL_GATE_KINDS {
            let sym = kind.symbol();
            for p in sym.inputs.iter().chain(sym.outputs) {
                assert!(
                    p.y >= 0.0 && p.y <= sym.height,
                    "{kind} port at y={} outside 0..={}",
                    p.y,
                    sym.height
                );
            }
        }
    }

    #[test]
    fn port_positions_resolve_against_the_gate_edges() {
        let origin = pos2(100.0, 200.0);
        let sym = GateKind::DTrigger.symbol();
        assert_eq!(sym.input_pos(origin, 0), Some(pos2(100.0, 220.0)));
        assert_eq!(sym.output_pos(origin, 1), Some(pos2(200.0, 310.0)));
        assert_eq!(sym.input_pos(origin, 99), None);

        let and = GateKind::And.symbol();
        assert_eq!(and.synthetic_input_pos(origin), pos2(100.0, 250.0));
    }

    #[test]
    fn gate_type_names_round_trip_their_catalog_spelling() {
        for (kind, name) in [
            (GateKind::And, "\"and\""),
            (GateKind::DTrigger, "\"D-trigger\""),
            (GateKind::JkTrigger, "\"JK-trigger\""),
            (GateKind::Sp, "\"SP\""),
            (GateKind::Dc, "\"DC\""),
            (GateKind::Corr, "\"CORR\""),
        ] {
            let json = serde_json::to_string(&kind).expect("serialize");
            assert_eq!(json, name);
            let back: GateKind = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(back, kind);
        }
    }
}
