use egui::{Color32, Vec2, vec2};

#[derive(Clone, serde::Deserialize, serde::Serialize)]
pub struct CanvasConfig {
    pub wire_thickness: f32,
    pub symbol_stroke: f32,
    pub node_half_size: f32,
    pub junction_radius: f32,
    pub port_radius: f32,
    pub bubble_radius: f32,
    pub panel_button_size: Vec2,
    pub symbol_fill: Color32,
    pub symbol_stroke_color: Color32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            wire_thickness: 2.0,
            symbol_stroke: 2.0,
            node_half_size: 2.0,
            junction_radius: 5.0,
            port_radius: 3.5,
            bubble_radius: 5.0,
            panel_button_size: vec2(80.0, 30.0),
            symbol_fill: Color32::WHITE,
            symbol_stroke_color: Color32::BLACK,
        }
    }
}
