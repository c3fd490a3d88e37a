//! Player bomb: an expanding circle that wipes bullets

use glam::Vec2;

use super::collision::CollisionShape;
use super::draw::{BlendingMode, Color, DrawTarget, Sprite};
use super::entity::{Entity, EntityId};
use crate::consts::*;

const BOMB_COLOR: Color = Color::rgba(0.0, 1.0, 1.0, 1.0);

#[derive(Debug, Clone)]
pub struct Bomb {
    pub(crate) id: EntityId,
    pub pos: Vec2,
    pub radius: f32,
    pub alpha: f32,
    alive: bool,
}

impl Bomb {
    pub fn new(pos: Vec2) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            pos,
            radius: BOMB_START_RADIUS,
            alpha: 0.5,
            alive: true,
        }
    }

    /// Grow until full size, then fade out over 90 frames
    pub fn advance(&mut self) {
        if self.alpha <= 0.0 {
            self.alive = false;
            return;
        }
        if self.radius > BOMB_MAX_RADIUS {
            self.alpha = (self.alpha - 1.0 / 180.0).max(0.0);
        } else {
            self.radius += BOMB_GROWTH;
        }
    }

    pub fn collision(&self) -> CollisionShape {
        CollisionShape::circle(self.radius)
    }

    pub fn draw(&self, target: &mut dyn DrawTarget, parent_alpha: f32, _sub_frame_time: f32) {
        target.sprite(&Sprite {
            region: "bomb",
            frame: 0,
            pos: self.pos,
            origin: Vec2::splat(self.radius),
            size: Vec2::splat(self.radius * 2.0),
            scale: Vec2::ONE,
            rotation: 0.0,
            color: BOMB_COLOR.with_alpha(self.alpha * parent_alpha),
            blending: BlendingMode::Add,
        });
    }
}

impl Entity for Bomb {
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
