//! Danmaku Core - simulation core of a scrolling shoot-em-up
//!
//! Core modules:
//! - `sim`: Deterministic frame-stepped simulation (tasks, bullets, lasers, bosses, collisions)
//! - `pattern`: Scripting helpers that stage and spell content is written against
//! - `settings`: Tunable simulation settings

pub mod pattern;
pub mod settings;
pub mod sim;

pub use settings::Settings;

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Frames per second of the fixed simulation step
    pub const FRAME_RATE: u32 = 60;

    /// Default bullet delay phase (frames before a bullet moves)
    pub const DEFAULT_BULLET_DELAY: u32 = 8;

    /// Frames before a freshly spawned laser node counts for collision
    pub const LASER_PROTECTION_FRAMES: u32 = 20;
    /// Default fraction of laser width that is hit-active
    pub const LASER_HIT_RATIO: f32 = 0.8;
    /// Chain-laser nodes re-graze on this cadence
    pub const LASER_GRAZE_INTERVAL: u32 = 20;
    /// Static lasers re-graze on this cadence
    pub const STATIC_LASER_GRAZE_INTERVAL: u32 = 5;

    /// Default static laser hitbox fractions
    pub const STATIC_LASER_HEAD_HIT: f32 = 0.6;
    pub const STATIC_LASER_WIDTH_HIT: f32 = 0.7;

    /// Player bomb expansion
    pub const BOMB_START_RADIUS: f32 = 10.0;
    pub const BOMB_MAX_RADIUS: f32 = 250.0;
    pub const BOMB_GROWTH: f32 = 5.0;
    pub const BOMB_DAMAGE: f32 = 16.0;

    /// Boss health below which damage uses the "heavy" hit cue
    pub const BOSS_LOW_HEALTH: f32 = 500.0;

    /// Score per point of player-shot damage
    pub const SCORE_PER_DAMAGE: f32 = 10.0;
}

/// Angle of the vector pointing from `from` to `to`
#[inline]
pub fn angle_to(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

/// Linear interpolation, `t` unclamped
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Hermite interpolation between `a` and `b`, `t` clamped to [0, 1]
#[inline]
pub fn smoothstep(a: f32, b: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    lerp(a, b, t * t * (3.0 - 2.0 * t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_smoothstep_endpoints_and_clamp() {
        assert_eq!(smoothstep(2.0, 0.8, 0.0), 2.0);
        assert!((smoothstep(2.0, 0.8, 1.0) - 0.8).abs() < 1e-6);
        assert_eq!(smoothstep(0.0, 10.0, 5.0), 10.0);
        assert!((smoothstep(0.0, 10.0, 0.5) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_angle_to() {
        let a = angle_to(Vec2::ZERO, Vec2::new(0.0, 5.0));
        assert!((a - PI / 2.0).abs() < 1e-6);
    }
}
