//! Lasers
//!
//! A laser chain is a run of bullet nodes linked by id. Links are weak: a node
//! whose neighbour died simply has no live neighbour on that side. The head is
//! the node without a live predecessor; it draws and hit-tests the whole chain
//! while every other node is collision-transparent on its own.
//!
//! Chain links live in private fields so only this module can rewire them.
//!
//! A static laser is a single bullet whose hitbox is a rotated slab.

use std::rc::Rc;

use glam::Vec2;

use super::bullet::{Bullet, BulletKind};
use super::collision::{CollisionShape, DirectionalSegment, LaserQuad, collide};
use super::draw::{DrawTarget, Sprite};
use super::entity::{EntityId, Pool};
use super::shot_sheet::BulletData;
use crate::consts::*;
use crate::smoothstep;

/// Chain state carried by a laser node
#[derive(Debug, Clone)]
pub struct LaserNode {
    prev: Option<EntityId>,
    next: Option<EntityId>,
    max_length: f32,
    width: f32,
    hit_ratio: f32,
    protection_frame: u32,
    activated: bool,
}

impl LaserNode {
    pub fn new(width: f32, max_length: f32) -> Self {
        Self {
            prev: None,
            next: None,
            max_length,
            width,
            hit_ratio: LASER_HIT_RATIO,
            protection_frame: LASER_PROTECTION_FRAMES,
            activated: false,
        }
    }

    pub fn with_hit_ratio(mut self, hit_ratio: f32) -> Self {
        self.hit_ratio = hit_ratio;
        self
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn max_length(&self) -> f32 {
        self.max_length
    }

    pub fn hit_ratio(&self) -> f32 {
        self.hit_ratio
    }

    pub fn protection_frame(&self) -> u32 {
        self.protection_frame
    }

    /// Linked behind another node
    pub fn activated(&self) -> bool {
        self.activated
    }

    pub(super) fn tick_protection(&mut self) {
        self.protection_frame = self.protection_frame.saturating_sub(1);
    }

    fn collidable(&self) -> bool {
        self.activated && self.protection_frame == 0
    }
}

/// How a static laser looks before it becomes active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaserStyle {
    /// Beam grows thicker over the delay
    #[default]
    Thicken,
    /// Thin warning line extends along the beam
    WarningLine,
}

/// Straight beam starting at the bullet position
#[derive(Debug, Clone)]
pub struct StaticLaser {
    length: f32,
    width: f32,
    head_hit: f32,
    width_hit: f32,
    pub style: LaserStyle,
    shape: CollisionShape,
}

impl StaticLaser {
    pub fn new(angle: f32, length: f32, width: f32) -> Self {
        let mut laser = Self {
            length,
            width,
            head_hit: STATIC_LASER_HEAD_HIT,
            width_hit: STATIC_LASER_WIDTH_HIT,
            style: LaserStyle::default(),
            shape: CollisionShape::None,
        };
        laser.reshape(angle);
        laser
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn head_hit(&self) -> f32 {
        self.head_hit
    }

    pub fn width_hit(&self) -> f32 {
        self.width_hit
    }

    /// Cached hitbox
    pub fn shape(&self) -> &CollisionShape {
        &self.shape
    }

    pub(super) fn reshape(&mut self, angle: f32) {
        self.shape = CollisionShape::Segment(DirectionalSegment::new(
            angle,
            self.length,
            self.width,
            self.head_hit,
            self.width_hit,
        ));
    }
}

impl Bullet {
    /// Turn this bullet into an unlinked laser node
    pub fn into_laser_node(mut self, node: LaserNode) -> Self {
        self.kind = BulletKind::Laser(node);
        self
    }

    /// Static beam from `pos` along `angle`; indestructible by default
    pub fn new_static_laser(
        data: Rc<BulletData>,
        pos: Vec2,
        angle: f32,
        length: f32,
        width: f32,
        delay: u32,
    ) -> Self {
        let mut bullet = Bullet::new(data, pos, 0.0, angle)
            .with_delay(delay)
            .indestructible();
        bullet.kind = BulletKind::Static(StaticLaser::new(angle, length, width));
        bullet
    }

    pub fn with_laser_style(mut self, style: LaserStyle) -> Self {
        if let BulletKind::Static(laser) = &mut self.kind {
            laser.style = style;
        }
        self
    }

    pub fn set_laser_length(&mut self, length: f32) {
        let angle = self.angle();
        if let BulletKind::Static(laser) = &mut self.kind {
            laser.length = length;
            laser.reshape(angle);
        }
    }

    pub fn set_laser_width(&mut self, width: f32) {
        let angle = self.angle();
        if let BulletKind::Static(laser) = &mut self.kind {
            laser.width = width;
            laser.reshape(angle);
        }
    }

    pub fn set_hit_fractions(&mut self, head_hit: f32, width_hit: f32) {
        let angle = self.angle();
        if let BulletKind::Static(laser) = &mut self.kind {
            laser.head_hit = head_hit;
            laser.width_hit = width_hit;
            laser.reshape(angle);
        }
    }

    /// Draw a static laser: the beam, or a warning line during the delay
    pub fn draw_static_laser(
        &self,
        target: &mut dyn DrawTarget,
        parent_alpha: f32,
        _sub_frame_time: f32,
    ) {
        let Some(laser) = self.static_laser() else {
            return;
        };
        let data = &self.data;
        let dir = Vec2::from_angle(self.angle());
        let color = data.color.tinted(self.tint);
        let color = color.with_alpha(color.a * parent_alpha);
        if self.moving() || laser.style == LaserStyle::Thicken {
            let progress = if self.delay == 0 {
                1.0
            } else {
                self.t as f32 / self.delay as f32
            };
            target.sprite(&Sprite {
                region: &data.texture.region,
                frame: data.texture.frame_at(self.t),
                pos: self.pos + dir * (laser.length / 2.0),
                origin: data.origin,
                size: data.size,
                scale: Vec2::new(
                    laser.length / data.size.x,
                    smoothstep(0.1, laser.width / data.size.y, progress),
                ),
                rotation: self.angle(),
                color,
                blending: data.blending,
            });
        } else {
            let lead = (self.delay as f32 - 20.0).max(1.0);
            let reach = smoothstep(0.0, laser.length, self.t as f32 / lead);
            target.line(self.pos, self.pos + dir * reach, color);
        }
    }
}

/// Link `next` behind `prev`; both must be live laser nodes
pub fn link(pool: &mut Pool<Bullet>, prev: EntityId, next: EntityId) -> bool {
    let is_node = |pool: &Pool<Bullet>, id| pool.get_live(id).is_some_and(Bullet::is_laser_node);
    if prev == next || !is_node(pool, prev) || !is_node(pool, next) {
        return false;
    }
    if let Some(node) = pool.get_mut(prev).and_then(Bullet::laser_mut) {
        node.next = Some(next);
    }
    if let Some(node) = pool.get_mut(next).and_then(Bullet::laser_mut) {
        node.prev = Some(prev);
        node.activated = true;
    }
    true
}

/// Predecessor, if it is still alive
pub fn live_prev(pool: &Pool<Bullet>, id: EntityId) -> Option<EntityId> {
    let prev = pool.get(id)?.laser()?.prev?;
    pool.is_alive(prev).then_some(prev)
}

/// Successor, if it is still alive
pub fn live_next(pool: &Pool<Bullet>, id: EntityId) -> Option<EntityId> {
    let next = pool.get(id)?.laser()?.next?;
    pool.is_alive(next).then_some(next)
}

/// Live laser node without a live predecessor
pub fn is_head(pool: &Pool<Bullet>, id: EntityId) -> bool {
    pool.get_live(id).is_some_and(Bullet::is_laser_node) && live_prev(pool, id).is_none()
}

/// Walk live `next` links from `start`, calling `visit(prev, node)` per link
/// until it returns false, the head's max length is exceeded, or the walk
/// has taken as many steps as there are pooled bullets. Returns the length
/// walked.
fn walk<'a>(
    pool: &'a Pool<Bullet>,
    start: EntityId,
    mut visit: impl FnMut(&'a Bullet, &'a Bullet) -> bool,
) -> f32 {
    let Some(mut current) = pool.get_live(start) else {
        return 0.0;
    };
    let Some(max_length) = current.laser().map(LaserNode::max_length) else {
        return 0.0;
    };
    let mut total = 0.0;
    for _ in 0..pool.len() {
        let Some(next) = live_next(pool, current.id).and_then(|id| pool.get_live(id)) else {
            break;
        };
        total += current.pos.distance(next.pos);
        if !visit(current, next) || total > max_length {
            break;
        }
        current = next;
    }
    total
}

/// Length of the chain from `head`, capped at its max length
pub fn chain_length(pool: &Pool<Bullet>, head: EntityId) -> f32 {
    let max_length = pool
        .get(head)
        .and_then(Bullet::laser)
        .map_or(0.0, LaserNode::max_length);
    walk(pool, head, |_, _| true).min(max_length)
}

/// Node positions from `head` to the end of the drawable chain
pub fn chain_points(pool: &Pool<Bullet>, head: EntityId) -> Vec<Vec2> {
    let Some(first) = pool.get_live(head) else {
        return Vec::new();
    };
    let mut points = vec![first.pos];
    walk(pool, head, |_, node| {
        points.push(node.pos);
        true
    });
    points
}

/// No node within the chain's length can collide any more
pub fn is_moribund(pool: &Pool<Bullet>, head: EntityId) -> bool {
    let Some(node) = pool.get_live(head).and_then(Bullet::laser) else {
        return true;
    };
    if node.activated {
        return false;
    }
    let mut active = false;
    walk(pool, head, |_, next| {
        active = next.laser().is_some_and(LaserNode::activated);
        !active
    });
    !active
}

/// Hit-test a positioned shape against every collidable link of a chain
pub fn chain_collide(
    pool: &Pool<Bullet>,
    head: EntityId,
    shape: &CollisionShape,
    pos: Vec2,
    ortho_circles: bool,
) -> Option<bool> {
    let mut result = Some(false);
    walk(pool, head, |prev, node| {
        let Some(laser) = node.laser().filter(|n| n.collidable()) else {
            return true;
        };
        let quad = CollisionShape::Laser(LaserQuad {
            from: prev.pos,
            width: laser.width,
            hit_ratio: laser.hit_ratio,
        });
        match collide(&quad, node.pos, shape, pos, ortho_circles) {
            Some(false) => true,
            hit => {
                result = hit;
                false
            }
        }
    });
    result
}

/// Draw a whole chain as a path from its head
pub fn draw_chain(pool: &Pool<Bullet>, head: EntityId, target: &mut dyn DrawTarget, parent_alpha: f32) {
    let Some(bullet) = pool.get_live(head) else {
        return;
    };
    let Some(node) = bullet.laser() else {
        return;
    };
    let points = chain_points(pool, head);
    if points.len() < 2 {
        return;
    }
    let color = bullet.data.color.tinted(bullet.tint);
    target.path(&points, node.width, color.with_alpha(color.a * parent_alpha));
}
