//! Draw contract between the simulation and a renderer
//!
//! The simulation never renders. Entities describe what they look like by
//! issuing commands to a [`DrawTarget`]; `sub_frame_time` lets them draw a
//! position blended one partial step ahead without touching the
//! authoritative simulation state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Linear RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgba(1.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `rrggbb` or `rrggbbaa`, with or without a leading `#`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 && hex.len() != 8 {
            return None;
        }
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .map(|v| v as f32 / 255.0)
        };
        let a = if hex.len() == 8 { channel(6)? } else { 1.0 };
        Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }

    /// Component-wise product
    pub fn tinted(self, tint: Color) -> Self {
        Self::rgba(self.r * tint.r, self.g * tint.g, self.b * tint.b, self.a * tint.a)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Blend mode a sprite is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BlendingMode {
    #[default]
    Alpha,
    Add,
    Subtract,
    Multiply,
}

impl BlendingMode {
    /// Lenient name lookup; unknown names fall back to alpha blending
    pub fn for_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "ADD" | "ADDITIVE" => Self::Add,
            "SUBTRACT" => Self::Subtract,
            "MULTIPLY" => Self::Multiply,
            "ALPHA" => Self::Alpha,
            other => {
                log::warn!("Unknown blending mode \"{other}\", using ALPHA");
                Self::Alpha
            }
        }
    }
}

/// A textured quad to draw
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite<'a> {
    /// Atlas region name
    pub region: &'a str,
    /// Animation frame within the region
    pub frame: u32,
    /// Draw position (already interpolated)
    pub pos: Vec2,
    /// Pivot relative to the region's bottom-left corner
    pub origin: Vec2,
    pub size: Vec2,
    pub scale: Vec2,
    /// Radians
    pub rotation: f32,
    pub color: Color,
    pub blending: BlendingMode,
}

/// Renderer-side sink for draw commands
pub trait DrawTarget {
    fn sprite(&mut self, sprite: &Sprite<'_>);
    /// Polyline of the given width (laser chains)
    fn path(&mut self, points: &[Vec2], width: f32, color: Color);
    /// Thin line (laser warnings)
    fn line(&mut self, from: Vec2, to: Vec2, color: Color);
}

/// Captures draw commands; useful for headless runs and tests
#[derive(Debug, Default)]
pub struct DrawLog {
    pub sprites: Vec<(String, Vec2, Color)>,
    pub paths: Vec<(Vec<Vec2>, f32)>,
    pub lines: Vec<(Vec2, Vec2)>,
}

impl DrawTarget for DrawLog {
    fn sprite(&mut self, sprite: &Sprite<'_>) {
        self.sprites
            .push((sprite.region.to_string(), sprite.pos, sprite.color));
    }

    fn path(&mut self, points: &[Vec2], width: f32, _color: Color) {
        self.paths.push((points.to_vec(), width));
    }

    fn line(&mut self, from: Vec2, to: Vec2, _color: Color) {
        self.lines.push((from, to));
    }
}
