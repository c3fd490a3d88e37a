//! Player and player shots

use glam::Vec2;

use super::collision::CollisionShape;
use super::draw::{BlendingMode, Color, DrawTarget, Sprite};
use super::entity::{Entity, EntityId};
use super::task::TaskList;
use crate::Settings;

/// Player hit-state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Can be hit
    Normal,
    /// Recovering from a hit; frames left
    Respawning(u32),
    /// Protected after respawning; frames left
    Invulnerable(u32),
}

/// The player ship
#[derive(Debug)]
pub struct Player {
    pub(crate) id: EntityId,
    pub pos: Vec2,
    /// Where the player reappears after a hit
    pub spawn_pos: Vec2,
    pub hit_shape: CollisionShape,
    pub graze_shape: CollisionShape,
    pub lives: u32,
    pub bombs: u32,
    pub state: PlayerState,
    /// Movement per frame
    pub speed: f32,
    /// Movement per frame while focused
    pub focus_speed: f32,
    /// Frames until the next volley
    pub shot_cooldown: u32,
    pub tasks: TaskList,
    alive: bool,
}

impl Player {
    pub fn new(settings: &Settings, pos: Vec2) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            pos,
            spawn_pos: pos,
            hit_shape: CollisionShape::circle(settings.player_hit_radius),
            graze_shape: CollisionShape::circle(settings.player_graze_radius),
            lives: settings.starting_lives,
            bombs: settings.starting_bombs,
            state: PlayerState::Normal,
            speed: 4.5,
            focus_speed: 2.0,
            shot_cooldown: 0,
            tasks: TaskList::new(),
            alive: true,
        }
    }

    /// Vulnerable to hits
    pub fn is_normal(&self) -> bool {
        self.state == PlayerState::Normal
    }

    pub fn can_bomb(&self) -> bool {
        self.bombs > 0 && !matches!(self.state, PlayerState::Respawning(_))
    }

    pub fn can_move(&self) -> bool {
        !matches!(self.state, PlayerState::Respawning(_))
    }

    /// Count down respawn and invulnerability timers
    pub fn advance_state(&mut self, invulnerable_frames: u32) {
        self.state = match self.state {
            PlayerState::Normal => PlayerState::Normal,
            PlayerState::Respawning(n) if n > 1 => PlayerState::Respawning(n - 1),
            PlayerState::Respawning(_) => {
                self.pos = self.spawn_pos;
                if invulnerable_frames > 0 {
                    PlayerState::Invulnerable(invulnerable_frames)
                } else {
                    PlayerState::Normal
                }
            }
            PlayerState::Invulnerable(n) if n > 1 => PlayerState::Invulnerable(n - 1),
            PlayerState::Invulnerable(_) => PlayerState::Normal,
        };
    }

    /// Move by `delta`, kept inside `bounds`
    pub fn move_by(&mut self, delta: Vec2, bounds: (Vec2, Vec2)) {
        if self.can_move() {
            self.pos = (self.pos + delta).clamp(bounds.0, bounds.1);
        }
    }

    /// Apply a hit; returns whether it counted
    pub(crate) fn on_hit(&mut self, settings: &Settings) -> bool {
        if settings.invulnerable || !self.is_normal() {
            return false;
        }
        self.lives = self.lives.saturating_sub(1);
        self.state = PlayerState::Respawning(settings.respawn_frames.max(1));
        true
    }

    pub fn draw(&self, target: &mut dyn DrawTarget, parent_alpha: f32, _sub_frame_time: f32) {
        let alpha = match self.state {
            PlayerState::Normal => 1.0,
            PlayerState::Respawning(_) => return,
            // Blink while protected
            PlayerState::Invulnerable(n) if (n / 4) % 2 == 0 => 0.4,
            PlayerState::Invulnerable(_) => 1.0,
        };
        target.sprite(&Sprite {
            region: "player",
            frame: 0,
            pos: self.pos,
            origin: Vec2::new(16.0, 24.0),
            size: Vec2::new(32.0, 48.0),
            scale: Vec2::ONE,
            rotation: 0.0,
            color: Color::WHITE.with_alpha(alpha * parent_alpha),
            blending: BlendingMode::Alpha,
        });
    }
}

impl Entity for Player {
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

/// A shot fired by the player
#[derive(Debug, Clone)]
pub struct PlayerBullet {
    pub(crate) id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub damage: f32,
    /// Hits left before the shot is used up
    pub penetration: u32,
    pub collision: CollisionShape,
    alive: bool,
}

impl PlayerBullet {
    pub fn new(pos: Vec2, vel: Vec2, damage: f32, penetration: u32, radius: f32) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            pos,
            vel,
            damage,
            penetration: penetration.max(1),
            collision: CollisionShape::circle(radius),
            alive: true,
        }
    }

    pub fn advance(&mut self) {
        self.pos += self.vel;
    }

    /// Consume one unit of penetration; returns the damage dealt
    pub fn hit(&mut self) -> f32 {
        if !self.alive {
            return 0.0;
        }
        self.penetration = self.penetration.saturating_sub(1);
        if self.penetration == 0 {
            self.alive = false;
        }
        self.damage
    }

    pub fn draw(&self, target: &mut dyn DrawTarget, parent_alpha: f32, sub_frame_time: f32) {
        target.sprite(&Sprite {
            region: "player/shot",
            frame: 0,
            pos: self.pos + self.vel * sub_frame_time,
            origin: Vec2::new(8.0, 8.0),
            size: Vec2::splat(16.0),
            scale: Vec2::ONE,
            rotation: self.vel.to_angle(),
            color: Color::WHITE.with_alpha(0.6 * parent_alpha),
            blending: BlendingMode::Alpha,
        });
    }
}

impl Entity for PlayerBullet {
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
