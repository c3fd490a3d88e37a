//! Enemy bullets
//!
//! A bullet integrates a cached velocity delta once it leaves its delay phase.
//! The delta is recomputed only when speed or angle change. Laser chain nodes
//! and static lasers are bullets with extra state, see [`super::laser`].

use std::rc::Rc;

use glam::Vec2;

use super::collision::CollisionShape;
use super::draw::{Color, DrawTarget, Sprite};
use super::entity::{Entity, EntityId};
use super::laser::{LaserNode, StaticLaser};
use super::shot_sheet::BulletData;
use super::task::TaskList;
use crate::consts::*;
use crate::lerp;

pub(super) static NO_COLLISION: CollisionShape = CollisionShape::None;

/// What kind of bullet this is
#[derive(Debug)]
pub enum BulletKind {
    Basic,
    /// Node of a laser chain
    Laser(LaserNode),
    /// Straight beam with a fixed segment hitbox
    Static(StaticLaser),
}

/// A moving enemy projectile
#[derive(Debug)]
pub struct Bullet {
    pub(crate) id: EntityId,
    pub pos: Vec2,
    speed: f32,
    angle: f32,
    delta: Vec2,
    /// Radians, on top of the template's base rotation
    pub rotation: f32,
    pub scale: Vec2,
    pub tint: Color,
    /// Whether bombs and bullet clears remove this bullet
    pub destroyable: bool,
    /// Age in frames
    pub t: u32,
    /// Frames spent in the delay phase before moving
    pub delay: u32,
    pub data: Rc<BulletData>,
    graze_counter: u32,
    alive: bool,
    pub tasks: TaskList,
    pub(super) kind: BulletKind,
}

impl Bullet {
    pub fn new(data: Rc<BulletData>, pos: Vec2, speed: f32, angle: f32) -> Self {
        let mut bullet = Self {
            id: EntityId::UNASSIGNED,
            pos,
            speed,
            angle,
            delta: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            tint: Color::WHITE,
            destroyable: true,
            t: 0,
            delay: DEFAULT_BULLET_DELAY,
            data,
            graze_counter: 0,
            alive: true,
            tasks: TaskList::new(),
            kind: BulletKind::Basic,
        };
        bullet.calculate_delta();
        bullet
    }

    pub fn with_delay(mut self, delay: u32) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Survives bombs and bullet clears
    pub fn indestructible(mut self) -> Self {
        self.destroyable = false;
        self
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Radians
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Per-frame displacement while moving
    pub fn delta(&self) -> Vec2 {
        self.delta
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
        self.calculate_delta();
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
        self.calculate_delta();
        if let BulletKind::Static(laser) = &mut self.kind {
            laser.reshape(angle);
        }
    }

    pub fn set_velocity(&mut self, speed: f32, angle: f32) {
        self.speed = speed;
        self.set_angle(angle);
    }

    fn calculate_delta(&mut self) {
        self.delta = Vec2::new(self.angle.cos() * self.speed, self.angle.sin() * self.speed);
    }

    pub fn kind(&self) -> &BulletKind {
        &self.kind
    }

    pub fn laser(&self) -> Option<&LaserNode> {
        match &self.kind {
            BulletKind::Laser(node) => Some(node),
            _ => None,
        }
    }

    pub(super) fn laser_mut(&mut self) -> Option<&mut LaserNode> {
        match &mut self.kind {
            BulletKind::Laser(node) => Some(node),
            _ => None,
        }
    }

    pub fn static_laser(&self) -> Option<&StaticLaser> {
        match &self.kind {
            BulletKind::Static(laser) => Some(laser),
            _ => None,
        }
    }

    pub fn is_laser_node(&self) -> bool {
        matches!(self.kind, BulletKind::Laser(_))
    }

    /// Out of the delay phase
    pub fn moving(&self) -> bool {
        self.t >= self.delay
    }

    /// Hit shape at the current position
    ///
    /// Laser nodes are transparent on their own; their chain is hit-tested
    /// through the head.
    pub fn collision(&self) -> &CollisionShape {
        match &self.kind {
            BulletKind::Basic => &self.data.collision,
            BulletKind::Laser(_) => &NO_COLLISION,
            BulletKind::Static(laser) if self.moving() => laser.shape(),
            BulletKind::Static(_) => &NO_COLLISION,
        }
    }

    /// Advance motion and age by one frame. Attached tasks run separately.
    pub fn advance(&mut self) {
        if self.t >= self.delay {
            self.pos += self.delta;
        }
        self.rotation += self.data.spin_velocity;
        if let BulletKind::Laser(node) = &mut self.kind {
            node.tick_protection();
        }
        self.t += 1;
    }

    /// Register a graze; returns whether it counts
    pub fn on_graze(&mut self) -> bool {
        match self.kind {
            BulletKind::Laser(_) => self.t % LASER_GRAZE_INTERVAL == 0,
            BulletKind::Static(_) => self.t % STATIC_LASER_GRAZE_INTERVAL == 0,
            BulletKind::Basic => {
                if self.graze_counter == 0 {
                    self.graze_counter += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Allow an ordinary bullet to be grazed again
    pub fn reset_graze(&mut self) {
        self.graze_counter = 0;
    }

    /// Position blended `sub_frame_time` of a step ahead
    pub fn draw_pos(&self, sub_frame_time: f32) -> Vec2 {
        if self.moving() && sub_frame_time != 0.0 {
            self.pos + self.delta * sub_frame_time
        } else {
            self.pos
        }
    }

    /// Draw an ordinary bullet; lasers draw through [`super::laser`]
    pub fn draw(&self, target: &mut dyn DrawTarget, parent_alpha: f32, sub_frame_time: f32) {
        let data = &self.data;
        let pos = self.draw_pos(sub_frame_time);
        if self.moving() {
            let color = data.color.tinted(self.tint);
            target.sprite(&Sprite {
                region: &data.texture.region,
                frame: data.texture.frame_at(self.t),
                pos,
                origin: data.origin,
                size: data.size,
                scale: self.scale,
                rotation: self.rotation + data.rotation,
                color: color.with_alpha(color.a * parent_alpha),
                blending: data.blending,
            });
        } else {
            // Delay phase: shrink in and fade up
            let progress = self.t as f32 / self.delay as f32;
            let factor = lerp(2.0, 0.8, progress);
            let color = data.delay_color.tinted(self.tint);
            target.sprite(&Sprite {
                region: &data.delay_texture,
                frame: 0,
                pos,
                origin: data.origin,
                size: data.size,
                scale: self.scale * factor,
                rotation: self.rotation,
                color: color.with_alpha(color.a * parent_alpha * lerp(0.2, 1.0, progress)),
                blending: data.delay_blending,
            });
        }
    }
}

impl Entity for Bullet {
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
        if !self.alive {
            return false;
        }
        self.alive = false;
        self.tasks.kill_all();
        true
    }
}
