use std::fmt::Write as _;

use egui::{
    Align, Align2, Button, Color32, CornerRadius, FontId, Layout, Pos2, Rect, Sense, Stroke,
    StrokeKind, Ui, Vec2, Widget as _, pos2, vec2,
};

use crate::catalog::{ALL_GATE_KINDS, PortKind, PortSpec};
use crate::config::CanvasConfig;
use crate::drag::Drag;
use crate::geometry::{GRID_STEP, segment_dist};
use crate::graph::{Element, ElementId, Graph, WireId};

pub const COLOR_GRID_LIGHT: Color32 = Color32::from_rgb(230, 230, 230);
pub const COLOR_GRID_DARK: Color32 = Color32::from_rgb(40, 40, 40);

pub const COLOR_WIRE: Color32 = Color32::from_rgb(30, 30, 30);
pub const COLOR_WIRE_DARK_MODE: Color32 = Color32::from_rgb(220, 220, 220);
pub const COLOR_HOVER: Color32 = Color32::from_rgb(120, 160, 255);

pub const WIRE_HIT_DISTANCE: f32 = 8.0;
pub const NODE_HOVER_THRESHOLD: f32 = 10.0;
pub const PORT_HOVER_THRESHOLD: f32 = 8.0;

pub const LABEL_EDIT_TEXT_SIZE: f32 = 16.0;
pub const LABEL_DISPLAY_TEXT_SIZE: f32 = 19.0;

#[derive(serde::Deserialize, serde::Serialize, Eq, PartialEq, Copy, Debug, Clone)]
pub enum Hover {
    Element(ElementId),
    Wire(WireId),
}

#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct App {
    pub canvas_config: CanvasConfig,
    pub graph: Graph,
    pub drag: Option<Drag>,
    pub hovered: Option<Hover>,
    // Where are we in the world
    pub viewport_offset: Vec2,
    pub show_grid: bool,
    pub show_debug: bool,
    // For web load functionality - stores pending JSON to load
    #[serde(skip)]
    pub pending_load_json: Option<String>,
    #[serde(skip)]
    pub panning: bool,
    // Label editing state
    #[serde(skip)]
    pub editing_label: Option<ElementId>,
    #[serde(skip)]
    pub label_edit_buffer: String,
    // Text staged in the palette's label field
    #[serde(skip)]
    pub label_buffer: String,
    // Last save/load/export result, shown in the menu bar
    #[serde(skip)]
    pub status: Option<String>,
    #[serde(skip)]
    pub export_pending: bool,
    #[serde(skip, default = "empty_rect")]
    pub canvas_rect: Rect,
}

fn empty_rect() -> Rect {
    Rect::NOTHING
}

impl Default for App {
    fn default() -> Self {
        Self {
            canvas_config: CanvasConfig::default(),
            graph: Graph::default(),
            drag: None,
            hovered: None,
            viewport_offset: Vec2::ZERO,
            show_grid: true,
            show_debug: false,
            pending_load_json: None,
            panning: false,
            editing_label: None,
            label_edit_buffer: String::new(),
            label_buffer: String::new(),
            status: None,
            export_pending: false,
            canvas_rect: Rect::NOTHING,
        }
    }
}

impl eframe::App for App {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_screenshot_events(ctx);

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                let is_web = cfg!(target_arch = "wasm32");

                ui.menu_button("File", |ui| {
                    if ui.button("Save Diagram").clicked()
                        && let Err(e) = self.save_to_file()
                    {
                        log::error!("Failed to save diagram: {e}");
                        self.status = Some(format!("Save failed: {e}"));
                    }
                    if ui.button("Load Diagram").clicked()
                        && let Err(e) = self.load_from_file()
                    {
                        log::error!("Failed to load diagram: {e}");
                        self.status = Some(format!("Load failed: {e}"));
                    }
                    if ui.button("Export PNG").clicked() {
                        self.request_png_export(ui.ctx());
                    }
                    if !is_web {
                        ui.separator();
                        if ui.button("Quit").clicked() {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    }
                });
                ui.add_space(16.0);

                ui.menu_button("View", |ui| {
                    ui.checkbox(&mut self.show_grid, "Grid");
                    ui.checkbox(&mut self.show_debug, "Debug logs");
                });
                ui.add_space(16.0);

                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    egui::widgets::global_theme_preference_buttons(ui);
                    ui.add_space(16.0);
                    if let Some(status) = &self.status {
                        ui.label(status.clone());
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_main(ui);
        });
    }
}

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        if let Some(storage) = cc.storage {
            eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default()
        } else {
            Default::default()
        }
    }

    pub fn draw_main(&mut self, ui: &mut Ui) {
        self.process_pending_load();

        if self.show_debug {
            egui::Window::new("Debug logs").show(ui.ctx(), |ui| {
                egui_logger::logger_ui().show(ui);
            });
        }

        ui.with_layout(Layout::left_to_right(Align::Min), |ui| {
            ui.vertical(|ui| {
                ui.heading("Parts");
                self.draw_panel(ui);
            });
            ui.separator();
            ui.vertical(|ui| {
                ui.label("shift-drag to draw wires");
                ui.label("press backspace/d to remove object");
                ui.label("right click on canvas to pan");
                self.draw_canvas(ui);
            });
        });
    }

    fn draw_panel(&mut self, ui: &mut Ui) {
        let button_size = self.canvas_config.panel_button_size;
        egui::ScrollArea::vertical()
            .auto_shrink([true, false])
            .show(ui, |ui| {
                for kind in ALL_GATE_KINDS {
                    if Button::new(kind.to_string())
                        .min_size(button_size)
                        .ui(ui)
                        .clicked()
                    {
                        let id = self.graph.new_gate(kind);
                        log::info!("placed {kind} as {id}");
                    }
                    ui.add_space(4.0);
                }

                ui.add_space(8.0);
                ui.text_edit_singleline(&mut self.label_buffer);
                if Button::new("Label").min_size(button_size).ui(ui).clicked() {
                    let text = if self.label_buffer.trim().is_empty() {
                        String::from("Label")
                    } else {
                        self.label_buffer.trim().to_owned()
                    };
                    self.graph.new_label(text);
                    self.label_buffer.clear();
                }

                ui.add_space(8.0);
                if Button::new("Clear").min_size(button_size).ui(ui).clicked() {
                    self.graph = Graph::default();
                    self.hovered = None;
                    self.drag = None;
                    self.editing_label = None;
                }

                if self.show_debug {
                    ui.add_space(8.0);
                    let mut dbg = self.debug_string(ui);
                    ui.add_sized(
                        vec2(button_size.x * 2.0, ui.available_height()),
                        egui::TextEdit::multiline(&mut dbg),
                    );
                }
            });
    }

    fn draw_canvas(&mut self, ui: &mut Ui) {
        let (resp, _painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let canvas_rect = resp.rect;
        self.canvas_rect = canvas_rect;

        // Keep canvas objects from painting over the panels.
        ui.set_clip_rect(canvas_rect);

        if self.show_grid {
            Self::draw_grid(ui, canvas_rect, self.viewport_offset);
        }

        let mouse_is_visible = resp.contains_pointer();
        let mouse_pos_world = self.mouse_pos_world(ui);
        let shift_held = ui.input(|i| i.modifiers.shift);
        let mouse_up = ui.input(|i| i.pointer.any_released());
        let double_clicked = ui.input(|i| {
            i.pointer
                .button_double_clicked(egui::PointerButton::Primary)
        });

        let right_released = ui.input(|i| i.pointer.secondary_released());
        let right_down = ui.input(|i| i.pointer.secondary_down());
        let right_clicked = ui.input(|i| i.pointer.secondary_clicked());

        if right_clicked
            && let Some(hovered) = self.hovered.take()
        {
            self.drag = None;
            match hovered {
                Hover::Element(id) => self.graph.remove_element(id),
                Hover::Wire(id) => self.graph.remove_wire(id),
            }
        }

        if right_down && mouse_is_visible && self.hovered.is_none() {
            self.panning = true;
        }
        if right_released || !mouse_is_visible {
            self.panning = false;
        }
        if self.panning {
            self.viewport_offset -= ui.input(|i| i.pointer.delta());
        }

        self.handle_deletion(ui);
        self.handle_label_editing(ui, mouse_up);

        if double_clicked
            && self.hovered.is_none()
            && let Some(mouse) = mouse_pos_world
        {
            let id = self.graph.new_label_at(String::from("Label"), mouse);
            self.editing_label = Some(id);
            self.label_edit_buffer = String::from("Label");
        }

        if let Some(mouse) = mouse_pos_world {
            // Starting a wire from empty canvas. Hover state is from the
            // previous frame, the same trick the object responses rely on.
            if resp.drag_started() && shift_held && self.hovered.is_none() {
                self.start_lead(mouse, None, 0);
            }

            if self.drag.is_some() {
                self.drag_update(mouse);
            }
            if mouse_up {
                self.drag_end();
            }
        } else if mouse_up {
            self.drag_end();
        }

        // Draw world
        self.hovered = None;
        for id in self.graph.gate_ids() {
            self.draw_gate(ui, id, shift_held);
        }
        for id in self.graph.wire_ids() {
            self.draw_wire(ui, id, shift_held);
        }
        for id in self.graph.node_ids() {
            self.draw_node(ui, id, shift_held);
        }
        for id in self.graph.label_ids() {
            self.draw_label(ui, id);
        }

        if self.drag.is_none() {
            self.highlight_hovered(ui);
        }
    }

    fn highlight_hovered(&self, ui: &Ui) {
        let Some(hovered) = self.hovered else {
            return;
        };
        match hovered {
            Hover::Element(id) => {
                if let Some(rect) = self.graph.gate_rect(id) {
                    let outer = rect.translate(-self.viewport_offset).expand(4.0);
                    ui.painter().rect_stroke(
                        outer,
                        CornerRadius::default(),
                        Stroke::new(2.0, COLOR_HOVER),
                        StrokeKind::Middle,
                    );
                } else if let Some(element) = self.graph.element(id) {
                    ui.painter().circle_stroke(
                        self.adjusted_pos(element.pos()),
                        NODE_HOVER_THRESHOLD,
                        Stroke::new(2.0, COLOR_HOVER),
                    );
                }
            }
            // Wires recolor themselves on hit while drawing.
            Hover::Wire(_) => {}
        }
    }

    fn handle_deletion(&mut self, ui: &Ui) {
        if self.editing_label.is_some() {
            return;
        }
        let bs_pressed = ui.input(|i| i.key_pressed(egui::Key::Backspace));
        let d_pressed = ui.input(|i| i.key_pressed(egui::Key::D));
        if (bs_pressed || d_pressed)
            && let Some(hovered) = self.hovered.take()
        {
            self.drag = None;
            match hovered {
                Hover::Element(id) => self.graph.remove_element(id),
                Hover::Wire(id) => self.graph.remove_wire(id),
            }
        }
    }

    fn handle_label_editing(&mut self, ui: &Ui, mouse_up: bool) {
        let Some(editing_id) = self.editing_label else {
            return;
        };
        if let Some(Element::Label { text, .. }) = self.graph.elements.get_mut(editing_id) {
            *text = self.label_edit_buffer.clone();
        } else {
            // Label got deleted out from under the editor.
            self.editing_label = None;
            self.label_edit_buffer.clear();
            return;
        }
        let enter_pressed = ui.input(|i| i.key_pressed(egui::Key::Enter));
        let esc_pressed = ui.input(|i| i.key_released(egui::Key::Escape));
        if mouse_up || enter_pressed || esc_pressed {
            self.editing_label = None;
            self.label_edit_buffer.clear();
        }
    }

    fn draw_grid(ui: &Ui, canvas_rect: Rect, viewport_offset: Vec2) {
        let grid_color = if ui.visuals().dark_mode {
            COLOR_GRID_DARK
        } else {
            COLOR_GRID_LIGHT
        };

        let painter = ui.painter();

        let start_x =
            (canvas_rect.left() / GRID_STEP).floor() * GRID_STEP - viewport_offset.x % GRID_STEP;
        let mut x = start_x;
        while x <= canvas_rect.right() {
            if x >= canvas_rect.left() {
                painter.line_segment(
                    [pos2(x, canvas_rect.top()), pos2(x, canvas_rect.bottom())],
                    Stroke::new(1.0, grid_color),
                );
            }
            x += GRID_STEP;
        }

        let start_y =
            (canvas_rect.top() / GRID_STEP).floor() * GRID_STEP - viewport_offset.y % GRID_STEP;
        let mut y = start_y;
        while y <= canvas_rect.bottom() {
            if y >= canvas_rect.top() {
                painter.line_segment(
                    [pos2(canvas_rect.left(), y), pos2(canvas_rect.right(), y)],
                    Stroke::new(1.0, grid_color),
                );
            }
            y += GRID_STEP;
        }
    }

    fn draw_gate(&mut self, ui: &mut Ui, id: ElementId, shift_held: bool) {
        let Some(Element::Gate { kind, pos }) = self.graph.element(id).cloned() else {
            return;
        };
        let sym = kind.symbol();
        let origin = self.adjusted_pos(pos);
        let rect = Rect::from_min_size(origin, sym.size());
        let cfg = &self.canvas_config;

        let painter = ui.painter();
        painter.rect_filled(rect, CornerRadius::default(), cfg.symbol_fill);
        painter.rect_stroke(
            rect,
            CornerRadius::default(),
            Stroke::new(cfg.symbol_stroke, cfg.symbol_stroke_color),
            StrokeKind::Middle,
        );

        for line in sym.lines {
            painter.line_segment(
                [origin + line.start.to_vec2(), origin + line.end.to_vec2()],
                Stroke::new(cfg.symbol_stroke, cfg.symbol_stroke_color),
            );
        }
        for text in sym.texts {
            painter.text(
                origin + text.pos.to_vec2(),
                anchor_to_align2(text.anchor),
                text.text,
                FontId::monospace(14.0),
                cfg.symbol_stroke_color,
            );
        }

        let response = ui.allocate_rect(rect, Sense::click_and_drag());
        if response.hovered() {
            self.hovered = Some(Hover::Element(id));
        }
        if response.dragged()
            && !shift_held
            && let Some(mouse) = self.mouse_pos_world(ui)
        {
            self.set_drag(Drag::Element {
                id,
                offset: pos - mouse,
            });
        }

        // Ports go after the body so their hover rects win.
        for (i, spec) in sym.inputs.iter().enumerate() {
            let p = pos2(rect.left(), rect.top() + spec.y);
            self.draw_port(ui, id, p, i as u32, PortKind::Input, *spec);
        }
        for (i, spec) in sym.outputs.iter().enumerate() {
            let p = pos2(rect.right(), rect.top() + spec.y);
            self.draw_port(ui, id, p, i as u32, PortKind::Output, *spec);
        }
    }

    /// One port dot, plus the inversion bubble and the drag response that
    /// starts a wire out of an output.
    fn draw_port(
        &mut self,
        ui: &mut Ui,
        gate: ElementId,
        screen_pos: Pos2,
        index: u32,
        kind: PortKind,
        spec: PortSpec,
    ) {
        let cfg = &self.canvas_config;
        ui.painter()
            .circle_filled(screen_pos, cfg.port_radius, cfg.symbol_stroke_color);
        if spec.inverted {
            // Bubble sits just outside the gate edge.
            let dx = match kind {
                PortKind::Input => -cfg.bubble_radius,
                PortKind::Output => cfg.bubble_radius,
            };
            ui.painter().circle(
                screen_pos + vec2(dx, 0.0),
                cfg.bubble_radius,
                cfg.symbol_fill,
                Stroke::new(cfg.symbol_stroke, cfg.symbol_stroke_color),
            );
        }

        if kind == PortKind::Output {
            let rect = Rect::from_center_size(
                screen_pos,
                Vec2::splat(cfg.port_radius + PORT_HOVER_THRESHOLD),
            );
            let resp = ui.allocate_rect(rect, Sense::drag());
            if resp.hovered() {
                ui.painter()
                    .circle_stroke(screen_pos, cfg.port_radius + 3.0, Stroke::new(2.0, COLOR_HOVER));
            }
            if resp.drag_started()
                && let Some(mouse) = self.mouse_pos_world(ui)
            {
                self.start_lead(mouse, Some(gate), index);
            }
        }
    }

    fn draw_node(&mut self, ui: &mut Ui, id: ElementId, shift_held: bool) {
        let Some(Element::Node { pos }) = self.graph.element(id).cloned() else {
            return;
        };
        let screen_pos = self.adjusted_pos(pos);
        let incidence = self.graph.incidence(id);
        let cfg = &self.canvas_config;
        let color = wire_color(ui);

        // A node shared by exactly two wires is a plain bend and draws
        // nothing; more than two make a junction dot.
        if incidence > 2 {
            ui.painter()
                .circle_filled(screen_pos, cfg.junction_radius, color);
        } else if incidence != 2 {
            let rect = Rect::from_center_size(screen_pos, Vec2::splat(cfg.node_half_size * 2.0));
            ui.painter().rect_filled(rect, CornerRadius::default(), color);
        }

        let rect = Rect::from_center_size(screen_pos, Vec2::splat(NODE_HOVER_THRESHOLD * 2.0));
        let resp = ui.allocate_rect(rect, Sense::click_and_drag());
        if resp.hovered() {
            self.hovered = Some(Hover::Element(id));
        }
        if resp.drag_started()
            && shift_held
            && let Some(mouse) = self.mouse_pos_world(ui)
        {
            self.start_lead(mouse, Some(id), 0);
        } else if resp.dragged()
            && let Some(mouse) = self.mouse_pos_world(ui)
        {
            self.set_drag(Drag::Element {
                id,
                offset: pos - mouse,
            });
        }
    }

    fn draw_wire(&mut self, ui: &mut Ui, id: WireId, shift_held: bool) {
        let (Some(start), Some(end)) = (self.graph.wire_start_pos(id), self.graph.wire_end_pos(id))
        else {
            return;
        };
        let screen_start = self.adjusted_pos(start);
        let screen_end = self.adjusted_pos(end);

        let hit = if let Some(mouse) = self.mouse_pos_world(ui) {
            segment_dist(start, end, mouse) < WIRE_HIT_DISTANCE
        } else {
            false
        };

        let color = if hit { COLOR_HOVER } else { wire_color(ui) };

        if hit {
            self.hovered = Some(Hover::Wire(id));

            if ui.input(|i| i.pointer.primary_down())
                && self.drag.is_none()
                && let Some(mouse) = self.mouse_pos_world(ui)
            {
                if shift_held {
                    self.split_wire(id, mouse);
                } else {
                    self.set_drag(Drag::WireBody {
                        id,
                        grab: mouse,
                        start_was: start,
                        end_was: end,
                    });
                }
            }
        }

        ui.painter().line_segment(
            [screen_start, screen_end],
            Stroke::new(self.canvas_config.wire_thickness, color),
        );
    }

    fn draw_label(&mut self, ui: &mut Ui, id: ElementId) {
        let Some(Element::Label { text, pos }) = self.graph.element(id).cloned() else {
            return;
        };
        let screen_pos = self.adjusted_pos(pos);
        let is_editing = self.editing_label == Some(id);

        let text_color = if ui.visuals().dark_mode {
            Color32::WHITE
        } else {
            Color32::BLACK
        };

        if is_editing {
            let text_size = ui
                .painter()
                .layout_no_wrap(
                    self.label_edit_buffer.clone(),
                    FontId::proportional(LABEL_EDIT_TEXT_SIZE),
                    text_color,
                )
                .size();

            let text_edit_size = vec2(text_size.x.max(100.0), text_size.y);
            let rect = Rect::from_center_size(screen_pos, text_edit_size + vec2(8.0, 4.0));

            let text_edit = egui::TextEdit::singleline(&mut self.label_edit_buffer)
                .desired_width(text_edit_size.x)
                .font(FontId::proportional(LABEL_EDIT_TEXT_SIZE));

            ui.put(rect, text_edit).request_focus();
        } else {
            let text_size = ui
                .painter()
                .layout_no_wrap(
                    text.clone(),
                    FontId::proportional(LABEL_DISPLAY_TEXT_SIZE),
                    text_color,
                )
                .size();

            let rect = Rect::from_center_size(screen_pos, text_size + vec2(8.0, 4.0));
            let response = ui.allocate_rect(rect, Sense::click_and_drag());

            ui.painter().text(
                screen_pos,
                Align2::CENTER_CENTER,
                &text,
                FontId::proportional(LABEL_DISPLAY_TEXT_SIZE),
                text_color,
            );

            if response.hovered() {
                self.hovered = Some(Hover::Element(id));
            }
            if response.double_clicked() {
                self.editing_label = Some(id);
                self.label_edit_buffer = text;
            }
            if response.dragged()
                && let Some(mouse) = self.mouse_pos_world(ui)
            {
                self.set_drag(Drag::Element {
                    id,
                    offset: pos - mouse,
                });
            }
        }
    }

    fn debug_string(&self, ui: &Ui) -> String {
        let mut out = String::new();
        writeln!(out, "mouse: {:?}", self.mouse_pos_world(ui)).ok();
        writeln!(out, "hovered: {:?}", self.hovered).ok();
        writeln!(out, "drag: {:?}", self.drag).ok();
        writeln!(out, "viewport_offset: {:?}", self.viewport_offset).ok();
        writeln!(out, "editing_label: {:?}", self.editing_label).ok();
        writeln!(
            out,
            "elements: {} wires: {}",
            self.graph.elements.len(),
            self.graph.wires.len()
        )
        .ok();
        for (id, wire) in &self.graph.wires {
            writeln!(
                out,
                "  {id}: {}:{} -> {}:{}",
                wire.start, wire.start_port, wire.end, wire.end_port
            )
            .ok();
        }
        out
    }

    // Adjust position of an object to this screen
    fn adjusted_pos(&self, pos: Pos2) -> Pos2 {
        pos - self.viewport_offset
    }

    fn mouse_pos_world(&self, ui: &Ui) -> Option<Pos2> {
        ui.ctx()
            .pointer_interact_pos()
            .map(|p| p + self.viewport_offset)
    }
}

fn wire_color(ui: &Ui) -> Color32 {
    if ui.visuals().dark_mode {
        COLOR_WIRE_DARK_MODE
    } else {
        COLOR_WIRE
    }
}

/// Map a catalog text anchor (0..=1 per axis) to the nearest egui align.
fn anchor_to_align2(anchor: Vec2) -> Align2 {
    let axis = |v: f32| {
        if v < 0.25 {
            Align::Min
        } else if v > 0.75 {
            Align::Max
        } else {
            Align::Center
        }
    };
    Align2([axis(anchor.x), axis(anchor.y)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_map_to_the_expected_aligns() {
        assert_eq!(anchor_to_align2(vec2(1.0, 0.0)), Align2::RIGHT_TOP);
        assert_eq!(anchor_to_align2(vec2(0.5, 0.5)), Align2::CENTER_CENTER);
        assert_eq!(anchor_to_align2(vec2(0.5, 0.0)), Align2::CENTER_TOP);
        assert_eq!(anchor_to_align2(vec2(1.0, 1.0)), Align2::RIGHT_BOTTOM);
        assert_eq!(anchor_to_align2(vec2(0.0, 0.0)), Align2::LEFT_TOP);
    }
}
