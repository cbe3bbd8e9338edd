use std::collections::BTreeMap;
use std::fmt;

use egui::pos2;
use slotmap::Key as _;

use crate::App;
use crate::catalog::GateKind;
use crate::graph::{Element, ElementId, Graph, Wire, WireId};

/// On-disk point. Kept separate from `egui::Pos2` so the file format does
/// not depend on egui's serde representation.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SavedPoint {
    pub x: f32,
    pub y: f32,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SavedElementKind {
    Gate,
    Node,
    Label,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct SavedElement {
    pub position: SavedPoint,
    #[serde(rename = "type")]
    pub kind: SavedElementKind,
    #[serde(rename = "gateType", skip_serializing_if = "Option::is_none")]
    pub gate_type: Option<GateKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub id: String,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct SavedWire {
    pub start: String,
    #[serde(rename = "startPort")]
    pub start_port: u32,
    pub end: String,
    #[serde(rename = "endPort")]
    pub end_port: u32,
    pub id: String,
}

/// The complete diagram file. Element and wire ids are opaque strings,
/// remapped to fresh slotmap keys on load.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default)]
pub struct Document {
    pub elements: BTreeMap<String, SavedElement>,
    pub wires: BTreeMap<String, SavedWire>,
}

#[derive(Debug)]
pub enum LoadError {
    Parse(serde_json::Error),
    MissingGateType { id: String },
    DanglingWire { wire: String, element: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "malformed diagram file: {e}"),
            Self::MissingGateType { id } => {
                write!(f, "element {id} is a gate but has no gateType")
            }
            Self::DanglingWire { wire, element } => {
                write!(f, "wire {wire} references unknown element {element}")
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

impl Document {
    pub fn from_graph(graph: &Graph) -> Self {
        let mut doc = Self::default();
        for (id, element) in &graph.elements {
            let key = element_key(id);
            let p = element.pos();
            let position = SavedPoint { x: p.x, y: p.y };
            let saved = match element {
                Element::Node { .. } => SavedElement {
                    position,
                    kind: SavedElementKind::Node,
                    gate_type: None,
                    label: None,
                    id: key.clone(),
                },
                Element::Gate { kind, .. } => SavedElement {
                    position,
                    kind: SavedElementKind::Gate,
                    gate_type: Some(*kind),
                    label: None,
                    id: key.clone(),
                },
                Element::Label { text, .. } => SavedElement {
                    position,
                    kind: SavedElementKind::Label,
                    gate_type: None,
                    label: Some(text.clone()),
                    id: key.clone(),
                },
            };
            doc.elements.insert(key, saved);
        }
        for (id, wire) in &graph.wires {
            let key = wire_key(id);
            doc.wires.insert(
                key.clone(),
                SavedWire {
                    start: element_key(wire.start),
                    start_port: wire.start_port,
                    end: element_key(wire.end),
                    end_port: wire.end_port,
                    id: key,
                },
            );
        }
        doc
    }

    /// Rebuild a graph from the document, assigning fresh ids. Fails on
    /// structural problems without producing a partial graph.
    pub fn into_graph(self) -> Result<Graph, LoadError> {
        let mut graph = Graph::default();
        let mut ids: BTreeMap<String, ElementId> = BTreeMap::new();

        for (key, saved) in self.elements {
            let pos = pos2(saved.position.x, saved.position.y);
            let element = match saved.kind {
                SavedElementKind::Node => Element::Node { pos },
                SavedElementKind::Gate => {
                    let kind = saved
                        .gate_type
                        .ok_or(LoadError::MissingGateType { id: key.clone() })?;
                    Element::Gate { kind, pos }
                }
                SavedElementKind::Label => Element::Label {
                    text: saved.label.unwrap_or_default(),
                    pos,
                },
            };
            let id = graph.elements.insert(element);
            ids.insert(key, id);
        }

        for (key, saved) in self.wires {
            let lookup = |name: &String| {
                ids.get(name).copied().ok_or_else(|| LoadError::DanglingWire {
                    wire: key.clone(),
                    element: name.clone(),
                })
            };
            graph.wires.insert(Wire {
                start: lookup(&saved.start)?,
                start_port: saved.start_port,
                end: lookup(&saved.end)?,
                end_port: saved.end_port,
            });
        }

        Ok(graph)
    }

    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn element_key(id: ElementId) -> String {
    id.data().as_ffi().to_string()
}

fn wire_key(id: WireId) -> String {
    id.data().as_ffi().to_string()
}

impl App {
    /// Replace the current graph from a JSON document. The graph is only
    /// swapped once the whole file validated.
    pub fn load_from_json(&mut self, json: &str) -> Result<(), LoadError> {
        let graph = Document::from_json(json)?.into_graph()?;
        self.graph = graph;
        self.drag = None;
        self.hovered = None;
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        use std::fs;

        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON files", &["json"])
            .set_file_name("diagram.json")
            .save_file()
        else {
            return Ok(());
        };

        let json = Document::from_graph(&self.graph).to_json()?;
        fs::write(&path, json)?;
        log::info!("Saved diagram to: {}", path.display());
        self.status = Some(format!("Saved {}", path.display()));
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    pub fn save_to_file(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let json = Document::from_graph(&self.graph).to_json()?;
        crate::export::download_bytes(json.as_bytes(), "diagram.json", "application/json");
        log::info!("Diagram saved as download");
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        use std::fs;

        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON files", &["json"])
            .pick_file()
        else {
            return Ok(());
        };

        let json = fs::read_to_string(&path)?;
        self.load_from_json(&json)?;
        log::info!("Loaded diagram from: {}", path.display());
        self.status = Some(format!("Loaded {}", path.display()));
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    pub fn load_from_file(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        use wasm_bindgen::JsCast;
        use web_sys::HtmlInputElement;

        let Some(window) = web_sys::window() else {
            return Ok(());
        };
        let Ok(document) = window.document().ok_or("No document") else {
            return Ok(());
        };
        let Ok(element) = document.create_element("input") else {
            return Ok(());
        };
        let Ok(input) = element.dyn_into::<HtmlInputElement>() else {
            return Ok(());
        };

        input.set_type("file");
        input.set_accept("application/json,.json");

        let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |event: web_sys::Event| {
            let Some(target) = event.target() else {
                return;
            };
            let Ok(input) = target.dyn_into::<HtmlInputElement>() else {
                return;
            };
            let Some(file_list) = input.files() else {
                return;
            };
            let Some(file) = file_list.get(0) else {
                return;
            };

            let Ok(file_reader) = web_sys::FileReader::new() else {
                return;
            };
            let file_reader_clone = file_reader.clone();

            let onload_closure =
                wasm_bindgen::closure::Closure::wrap(Box::new(move |_event: web_sys::Event| {
                    let Ok(result) = file_reader_clone.result() else {
                        return;
                    };
                    let Some(text) = result.as_string() else {
                        return;
                    };

                    // Park the JSON in localStorage for pickup on the next
                    // update, since this callback has no access to the app.
                    if let Some(win) = web_sys::window() {
                        if let Ok(Some(storage)) = win.local_storage() {
                            if storage.set_item("logigram_pending_load", &text).is_ok() {
                                log::info!("File read, applying on next frame");
                            }
                        }
                    }
                }) as Box<dyn FnMut(_)>);

            file_reader.set_onload(Some(onload_closure.as_ref().unchecked_ref()));
            onload_closure.forget();
            file_reader.read_as_text(&file).ok();
        }) as Box<dyn FnMut(_)>);

        input.set_onchange(Some(closure.as_ref().unchecked_ref()));
        closure.forget();
        input.click();

        Ok(())
    }

    pub fn process_pending_load(&mut self) {
        if let Some(json) = self.pending_load_json.take() {
            match self.load_from_json(&json) {
                Ok(()) => log::info!("Diagram loaded from JSON"),
                Err(e) => {
                    log::error!("Failed to load diagram: {e}");
                    self.status = Some(format!("Load failed: {e}"));
                }
            }
        } else {
            #[cfg(target_arch = "wasm32")]
            {
                use web_sys::window;
                if let Some(window) = window() {
                    if let Ok(Some(storage)) = window.local_storage() {
                        if let Ok(Some(json)) = storage.get_item("logigram_pending_load") {
                            // Clear immediately so the file is applied once.
                            storage.remove_item("logigram_pending_load").ok();
                            match self.load_from_json(&json) {
                                Ok(()) => log::info!("Diagram loaded from web storage"),
                                Err(e) => {
                                    log::error!("Failed to load diagram: {e}");
                                    self.status = Some(format!("Load failed: {e}"));
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn sample_graph() -> Graph {
        let mut graph = Graph::default();
        let gate = graph.new_gate_at(GateKind::Nand, pos2(0.0, 0.0));
        let node = graph.new_node(pos2(200.0, 50.0));
        graph.connect(gate, node, 0, 0);
        graph.new_label_at("clock".into(), pos2(40.0, -30.0));
        graph
    }

    #[test]
    fn round_trip_preserves_structure() {
        let graph = sample_graph();
        let json = Document::from_graph(&graph).to_json().expect("serialize");
        let restored = Document::from_json(&json)
            .expect("parse")
            .into_graph()
            .expect("rebuild");

        assert_eq!(restored.elements.len(), graph.elements.len());
        assert_eq!(restored.wires.len(), graph.wires.len());
        let wire = restored.wires.values().next().expect("wire");
        assert!(matches!(
            restored.element(wire.start),
            Some(Element::Gate {
                kind: GateKind::Nand,
                ..
            })
        ));
        assert!(matches!(restored.element(wire.end), Some(Element::Node { .. })));
        assert!(
            restored
                .elements
                .values()
                .any(|e| matches!(e, Element::Label { text, .. } if text == "clock"))
        );
    }

    #[test]
    fn dangling_wire_is_rejected() {
        let graph = sample_graph();
        let mut doc = Document::from_graph(&graph);
        let wire_key = doc.wires.keys().next().expect("wire").clone();
        doc.wires.get_mut(&wire_key).expect("wire").end = "999".into();

        assert!(matches!(
            doc.into_graph(),
            Err(LoadError::DanglingWire { .. })
        ));
    }

    #[test]
    fn gate_without_kind_is_rejected() {
        let json = r#"{
            "elements": {
                "1": {"position": {"x": 0, "y": 0}, "type": "gate", "id": "1"}
            },
            "wires": {}
        }"#;
        let doc = Document::from_json(json).expect("parse");
        assert!(matches!(
            doc.into_graph(),
            Err(LoadError::MissingGateType { .. })
        ));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            Document::from_json("{not json"),
            Err(LoadError::Parse(_))
        ));
    }

    #[test]
    fn load_replaces_graph_only_on_success() {
        let mut app = App::default();
        app.graph = sample_graph();
        let before = app.graph.elements.len();

        assert!(app.load_from_json("{broken").is_err());
        assert_eq!(app.graph.elements.len(), before);

        let json = Document::from_graph(&sample_graph())
            .to_json()
            .expect("serialize");
        app.load_from_json(&json).expect("load");
        assert_eq!(app.graph.elements.len(), before);
    }
}
