//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies; drawing goes through [`DrawTarget`]

pub mod bomb;
pub mod boss;
pub mod bullet;
pub mod collision;
pub mod draw;
pub mod enemy;
pub mod entity;
pub mod laser;
pub mod particle;
pub mod player;
pub mod shot_sheet;
pub mod spell;
pub mod task;
pub mod tick;
pub mod world;

pub use bomb::Bomb;
pub use boss::{Boss, EncounterPhase, HealthBar};
pub use bullet::{Bullet, BulletKind};
pub use collision::{CollisionShape, DirectionalSegment, LaserQuad, collide};
pub use draw::{BlendingMode, Color, DrawLog, DrawTarget, Sprite};
pub use enemy::Enemy;
pub use entity::{Category, Entity, EntityId, EntityRef, Pool};
pub use laser::{LaserNode, LaserStyle, StaticLaser};
pub use particle::{Particle, ParticleKind};
pub use player::{Player, PlayerBullet, PlayerState};
pub use shot_sheet::{BulletData, BulletTexture, ShotSheet, ShotSheetError};
pub use spell::{BonusFormula, Difficulty, Spell, SpellInfo, SpellOutcome};
pub use task::{Flow, Join, Task, TaskCtx, TaskError, TaskList};
pub use tick::{TickInput, tick};
pub use world::{GameEvent, World};
