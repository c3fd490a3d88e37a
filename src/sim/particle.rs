//! Visual particles
//!
//! Particles never affect gameplay; they exist so the renderer has something
//! to draw for destroyed bullets, grazes, casts and explosions.

use glam::Vec2;

use super::draw::{BlendingMode, Color, DrawTarget, Sprite};
use super::entity::{Entity, EntityId};
use crate::lerp;

/// What a particle depicts
#[derive(Debug, Clone, PartialEq)]
pub enum ParticleKind {
    /// Fading copy of a destroyed bullet
    BulletDestroy { region: String, frame: u32, size: Vec2 },
    Graze,
    /// Charge-up particle drawn toward a point
    Cast,
    /// Expanding ring of a boss explosion
    Explosion { from_size: f32, to_size: f32 },
    Death,
}

/// A short-lived visual entity
#[derive(Debug, Clone)]
pub struct Particle {
    pub(crate) id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub kind: ParticleKind,
    pub color: Color,
    pub rotation: f32,
    pub scale: Vec2,
    /// Frames lived
    pub t: u32,
    pub duration: u32,
    alive: bool,
}

impl Particle {
    pub fn new(kind: ParticleKind, pos: Vec2, duration: u32) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            pos,
            vel: Vec2::ZERO,
            kind,
            color: Color::WHITE,
            rotation: 0.0,
            scale: Vec2::ONE,
            t: 0,
            duration,
            alive: true,
        }
    }

    pub fn graze(pos: Vec2, vel: Vec2) -> Self {
        Self {
            vel,
            ..Self::new(ParticleKind::Graze, pos, 20)
        }
    }

    /// Particle flying from `from` to `to` over `duration` frames
    pub fn cast(from: Vec2, to: Vec2, duration: u32) -> Self {
        Self {
            vel: (to - from) / duration.max(1) as f32,
            ..Self::new(ParticleKind::Cast, from, duration)
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Fraction of lifetime elapsed
    pub fn progress(&self) -> f32 {
        self.t as f32 / self.duration.max(1) as f32
    }

    pub fn tick(&mut self) {
        if !self.alive {
            return;
        }
        self.pos += self.vel;
        self.t += 1;
        if self.t >= self.duration {
            self.alive = false;
        }
    }

    pub fn draw(&self, target: &mut dyn DrawTarget, parent_alpha: f32, sub_frame_time: f32) {
        let progress = self.progress();
        let pos = self.pos + self.vel * sub_frame_time;
        let alpha = self.color.a * parent_alpha * (1.0 - progress);
        let (region, frame, size, scale, blending) = match &self.kind {
            ParticleKind::BulletDestroy { region, frame, size } => (
                region.as_str(),
                *frame,
                *size,
                self.scale * lerp(1.0, 1.5, progress),
                BlendingMode::Add,
            ),
            ParticleKind::Graze => ("particle/graze", 0, Vec2::splat(8.0), self.scale, BlendingMode::Add),
            ParticleKind::Cast => ("particle/cast", 0, Vec2::splat(12.0), self.scale, BlendingMode::Add),
            ParticleKind::Explosion { from_size, to_size } => (
                "particle/explosion",
                0,
                Vec2::splat(lerp(*from_size, *to_size, progress)),
                self.scale,
                BlendingMode::Add,
            ),
            ParticleKind::Death => ("particle/death", 0, Vec2::splat(24.0), self.scale, BlendingMode::Alpha),
        };
        target.sprite(&Sprite {
            region,
            frame,
            pos,
            origin: size / 2.0,
            size,
            scale,
            rotation: self.rotation,
            color: self.color.with_alpha(alpha),
            blending,
        });
    }
}

impl Entity for Particle {
    fn id(&self) -> EntityId {
        self.id
    }

    fn pos(&self) -> Vec2 {
        self.pos
    }

    fn set_pos(&mut self, pos: Vec2) {
        self.pos = pos;
    }

    fn alive(&self) -> bool {
        self.alive
    }

    fn kill(&mut self) -> bool {
        std::mem::replace(&mut self.alive, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::draw::DrawLog;

    #[test]
    fn test_particle_expires() {
        let mut p = Particle::graze(Vec2::ZERO, Vec2::new(1.0, 0.0));
        for _ in 0..19 {
            p.tick();
        }
        assert!(p.alive());
        p.tick();
        assert!(!p.alive());
        assert_eq!(p.pos, Vec2::new(20.0, 0.0));
    }

    #[test]
    fn test_cast_particle_reaches_target() {
        let mut p = Particle::cast(Vec2::new(-100.0, 0.0), Vec2::ZERO, 10);
        for _ in 0..10 {
            p.tick();
        }
        assert!(p.pos.length() < 1e-4);
    }

    #[test]
    fn test_draw_fades_out() {
        let mut p = Particle::new(ParticleKind::Death, Vec2::ZERO, 4);
        p.tick();
        p.tick();
        let mut log = DrawLog::default();
        p.draw(&mut log, 1.0, 0.0);
        assert!((log.sprites[0].2.a - 0.5).abs() < 1e-6);
    }
}
