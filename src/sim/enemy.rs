//! Regular enemies

use glam::Vec2;

use super::collision::CollisionShape;
use super::draw::{BlendingMode, Color, DrawTarget, Sprite};
use super::entity::{Entity, EntityId};
use super::task::TaskList;

/// A stage enemy with hit points and scripted behavior
#[derive(Debug)]
pub struct Enemy {
    pub(crate) id: EntityId,
    pub pos: Vec2,
    pub hp: f32,
    /// Tested against player shots
    pub bullet_collision: CollisionShape,
    /// Tested against the player
    pub player_collision: CollisionShape,
    pub invulnerable: bool,
    pub region: String,
    pub color: Color,
    pub tasks: TaskList,
    alive: bool,
}

impl Enemy {
    pub fn new(region: impl Into<String>, pos: Vec2, hp: f32, radius: f32) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            pos,
            hp,
            bullet_collision: CollisionShape::circle(radius),
            player_collision: CollisionShape::circle(radius / 2.0),
            invulnerable: false,
            region: region.into(),
            color: Color::WHITE,
            tasks: TaskList::new(),
            alive: true,
        }
    }

    /// Apply damage; returns whether hit points ran out
    pub fn on_hit(&mut self, damage: f32) -> bool {
        if self.invulnerable || !self.alive {
            return false;
        }
        self.hp = (self.hp - damage).max(0.0);
        self.hp <= 0.0
    }

    pub fn draw(&self, target: &mut dyn DrawTarget, parent_alpha: f32, _sub_frame_time: f32) {
        target.sprite(&Sprite {
            region: &self.region,
            frame: 0,
            pos: self.pos,
            origin: Vec2::splat(16.0),
            size: Vec2::splat(32.0),
            scale: Vec2::ONE,
            rotation: 0.0,
            color: self.color.with_alpha(self.color.a * parent_alpha),
            blending: BlendingMode::Alpha,
        });
    }
}

impl Entity for Enemy {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_until_dead() {
        let mut enemy = Enemy::new("fairy", Vec2::ZERO, 30.0, 12.0);
        assert!(!enemy.on_hit(20.0));
        assert!(enemy.on_hit(20.0));
        assert_eq!(enemy.hp, 0.0);
        enemy.invulnerable = true;
        assert!(!enemy.on_hit(5.0));
    }
}
