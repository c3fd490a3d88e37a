//! Simulation settings
//!
//! Tuning knobs the simulation reads every frame. Loaded from JSON; missing
//! fields fall back to defaults.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Collision ===
    /// Use the cheaper per-axis test for circle-vs-circle collisions
    pub ortho_circle_collision: bool,
    /// Panic instead of logging when an unsupported shape pair is hit-tested
    pub strict_collision: bool,

    // === Playfield ===
    /// Playfield width
    pub world_width: f32,
    /// Playfield height
    pub world_height: f32,
    /// Offset of world (0, 0) from the playfield's bottom-left corner
    pub world_origin: Vec2,
    /// Bullets further than this outside the playfield are removed
    pub delete_distance: f32,

    // === Player ===
    /// Player ignores all hits
    pub invulnerable: bool,
    /// Radius of the player's hit circle
    pub player_hit_radius: f32,
    /// Radius of the player's graze circle
    pub player_graze_radius: f32,
    /// Frames spent respawning after a hit
    pub respawn_frames: u32,
    /// Invulnerability frames granted after respawning
    pub respawn_invulnerable_frames: u32,
    /// Starting lives
    pub starting_lives: u32,
    /// Starting bombs
    pub starting_bombs: u32,

    // === Scoring ===
    /// Initial point-item value
    pub base_point_value: u64,
    /// Ceiling for the point-item value
    pub max_point_value: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ortho_circle_collision: true,
            strict_collision: cfg!(debug_assertions),

            world_width: 384.0,
            world_height: 448.0,
            world_origin: Vec2::new(192.0, 448.0),
            delete_distance: 1024.0,

            invulnerable: false,
            player_hit_radius: 2.0,
            player_graze_radius: 24.0,
            respawn_frames: 60,
            respawn_invulnerable_frames: 180,
            starting_lives: 3,
            starting_bombs: 3,

            base_point_value: 10_000,
            max_point_value: 999_990,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Malformed settings in {}: {e}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Playfield bounds as (min, max) corners in world coordinates
    pub fn world_bounds(&self) -> (Vec2, Vec2) {
        let min = -self.world_origin;
        let max = min + Vec2::new(self.world_width, self.world_height);
        (min, max)
    }

    /// Whether a point lies so far outside the playfield it should be removed
    pub fn out_of_world(&self, pos: Vec2) -> bool {
        let (min, max) = self.world_bounds();
        let margin = Vec2::splat(self.delete_distance);
        pos.cmplt(min - margin).any() || pos.cmpgt(max + margin).any()
    }
}
