//! World context: every entity collection plus the global game counters
//!
//! The world is the only thing tasks reach through. It owns the shot sheet
//! and the RNG explicitly, so a world can be built and stepped headlessly.

use std::rc::Rc;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::boss::{Boss, EncounterPhase};
use super::bullet::{Bullet, BulletKind};
use super::bomb::Bomb;
use super::collision::{CollisionShape, ShapeKind, collide};
use super::draw::DrawTarget;
use super::enemy::Enemy;
use super::entity::{Category, Entity, EntityId, EntityRef, Pool};
use super::laser;
use super::particle::{Particle, ParticleKind};
use super::player::{Player, PlayerBullet};
use super::shot_sheet::{BulletData, ShotSheet, ShotSheetError};
use super::spell::{Difficulty, SpellInfo, SpellOutcome};
use super::task::{Task, TaskList};
use crate::Settings;
use crate::consts::*;

/// Things that happened during a frame, for audio and UI layers
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Graze { pos: Vec2 },
    PlayerHit { player: EntityId, lives_left: u32 },
    BombUsed { player: EntityId },
    BulletsCleared { count: usize },
    /// `heavy` when the boss is low on health
    BossDamaged { boss: EntityId, damage: f32, heavy: bool },
    SpellDeclared { name: String },
    SpellEnded { name: String, outcome: SpellOutcome },
    BossDefeated { boss: EntityId },
    EnemyDestroyed { enemy: EntityId, pos: Vec2 },
    Cast { pos: Vec2 },
}

/// The simulation world
#[derive(Debug)]
pub struct World {
    pub settings: Settings,
    pub shot_sheet: Rc<ShotSheet>,
    pub difficulty: Difficulty,
    /// Frames simulated
    pub frame: u64,
    pub score: u64,
    pub graze: u64,
    pub point_value: u64,
    pub players: Pool<Player>,
    pub bombs: Pool<Bomb>,
    pub player_bullets: Pool<PlayerBullet>,
    pub bullets: Pool<Bullet>,
    pub enemies: Pool<Enemy>,
    pub bosses: Pool<Boss>,
    pub particles: Pool<Particle>,
    /// Stage-level tasks
    pub tasks: TaskList,
    /// Spell currently running, if any
    pub spell: Option<SpellInfo>,
    events: Vec<GameEvent>,
    rng: Pcg32,
    next_id: u64,
}

impl World {
    pub fn new(settings: Settings, shot_sheet: Rc<ShotSheet>, seed: u64) -> Self {
        Self {
            point_value: settings.base_point_value,
            settings,
            shot_sheet,
            difficulty: Difficulty::Normal,
            frame: 0,
            score: 0,
            graze: 0,
            players: Pool::new(),
            bombs: Pool::new(),
            player_bullets: Pool::new(),
            bullets: Pool::new(),
            enemies: Pool::new(),
            bosses: Pool::new(),
            particles: Pool::new(),
            tasks: TaskList::new(),
            spell: None,
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Default settings and an empty shot sheet
    pub fn with_seed(seed: u64) -> Self {
        Self::new(Settings::default(), Rc::new(ShotSheet::default()), seed)
    }

    /// Allocate a new entity id
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn rng(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }

    /// Uniform random value in `[low, high)`; `low` if the range is empty
    pub fn random_range(&mut self, low: f32, high: f32) -> f32 {
        if high > low {
            self.rng.random_range(low..high)
        } else {
            low
        }
    }

    /// Bullet template by name
    pub fn shot(&self, name: &str) -> Result<Rc<BulletData>, ShotSheetError> {
        self.shot_sheet.find_by_name(name)
    }

    // === Spawning ===

    pub fn add_player(&mut self, mut player: Player) -> EntityRef {
        player.id = self.next_entity_id();
        let r = EntityRef::new(Category::Player, player.id);
        self.players.push(player);
        r
    }

    pub fn add_bullet(&mut self, mut bullet: Bullet) -> EntityRef {
        bullet.id = self.next_entity_id();
        let r = EntityRef::new(Category::Bullet, bullet.id);
        self.bullets.push(bullet);
        r
    }

    pub fn add_player_bullet(&mut self, mut bullet: PlayerBullet) -> EntityRef {
        bullet.id = self.next_entity_id();
        let r = EntityRef::new(Category::PlayerBullet, bullet.id);
        self.player_bullets.push(bullet);
        r
    }

    pub fn add_enemy(&mut self, mut enemy: Enemy) -> EntityRef {
        enemy.id = self.next_entity_id();
        let r = EntityRef::new(Category::Enemy, enemy.id);
        self.enemies.push(enemy);
        r
    }

    pub fn add_boss(&mut self, mut boss: Boss) -> EntityRef {
        boss.id = self.next_entity_id();
        let r = EntityRef::new(Category::Boss, boss.id);
        log::info!("Boss {} entered ({:?})", boss.kind, boss.id);
        self.bosses.push(boss);
        r
    }

    pub fn add_bomb(&mut self, mut bomb: Bomb) -> EntityRef {
        bomb.id = self.next_entity_id();
        let r = EntityRef::new(Category::Bomb, bomb.id);
        self.bombs.push(bomb);
        r
    }

    pub fn add_particle(&mut self, mut particle: Particle) -> EntityRef {
        particle.id = self.next_entity_id();
        let r = EntityRef::new(Category::Particle, particle.id);
        self.particles.push(particle);
        r
    }

    // === Entity access ===

    pub fn is_alive(&self, r: EntityRef) -> bool {
        match r.category {
            Category::Player => self.players.is_alive(r.id),
            Category::Bomb => self.bombs.is_alive(r.id),
            Category::PlayerBullet => self.player_bullets.is_alive(r.id),
            Category::Bullet => self.bullets.is_alive(r.id),
            Category::Enemy => self.enemies.is_alive(r.id),
            Category::Boss => self.bosses.is_alive(r.id),
            Category::Particle => self.particles.is_alive(r.id),
        }
    }

    fn entity(&self, r: EntityRef) -> Option<&dyn Entity> {
        match r.category {
            Category::Player => self.players.get_live(r.id).map(|e| e as &dyn Entity),
            Category::Bomb => self.bombs.get_live(r.id).map(|e| e as &dyn Entity),
            Category::PlayerBullet => self.player_bullets.get_live(r.id).map(|e| e as &dyn Entity),
            Category::Bullet => self.bullets.get_live(r.id).map(|e| e as &dyn Entity),
            Category::Enemy => self.enemies.get_live(r.id).map(|e| e as &dyn Entity),
            Category::Boss => self.bosses.get_live(r.id).map(|e| e as &dyn Entity),
            Category::Particle => self.particles.get_live(r.id).map(|e| e as &dyn Entity),
        }
    }

    fn entity_mut(&mut self, r: EntityRef) -> Option<&mut dyn Entity> {
        match r.category {
            Category::Player => self.players.get_live_mut(r.id).map(|e| e as &mut dyn Entity),
            Category::Bomb => self.bombs.get_live_mut(r.id).map(|e| e as &mut dyn Entity),
            Category::PlayerBullet => self
                .player_bullets
                .get_live_mut(r.id)
                .map(|e| e as &mut dyn Entity),
            Category::Bullet => self.bullets.get_live_mut(r.id).map(|e| e as &mut dyn Entity),
            Category::Enemy => self.enemies.get_live_mut(r.id).map(|e| e as &mut dyn Entity),
            Category::Boss => self.bosses.get_live_mut(r.id).map(|e| e as &mut dyn Entity),
            Category::Particle => self.particles.get_live_mut(r.id).map(|e| e as &mut dyn Entity),
        }
    }

    /// Position of a live entity
    pub fn entity_pos(&self, r: EntityRef) -> Option<Vec2> {
        self.entity(r).map(|e| e.pos())
    }

    /// Move a live entity; returns false if it is gone
    pub fn set_entity_pos(&mut self, r: EntityRef, pos: Vec2) -> bool {
        match self.entity_mut(r) {
            Some(e) => {
                e.set_pos(pos);
                true
            }
            None => false,
        }
    }

    /// Kill any entity; bosses go through [`World::defeat_boss`]
    pub fn kill(&mut self, r: EntityRef) -> bool {
        if r.category == Category::Boss {
            return self.defeat_boss(r.id);
        }
        self.entity_mut(r).is_some_and(|e| e.kill())
    }

    /// Attach a task to an entity, or to the stage when `owner` is `None`.
    /// Tasks for dead owners are killed and dropped.
    pub fn attach_task(&mut self, owner: Option<EntityRef>, mut task: Task) -> bool {
        let list = match owner {
            None => Some(&mut self.tasks),
            Some(r) => match r.category {
                Category::Player => self.players.get_live_mut(r.id).map(|e| &mut e.tasks),
                Category::Bullet => self.bullets.get_live_mut(r.id).map(|e| &mut e.tasks),
                Category::Enemy => self.enemies.get_live_mut(r.id).map(|e| &mut e.tasks),
                Category::Boss => self.bosses.get_live_mut(r.id).map(|e| &mut e.tasks),
                Category::Bomb | Category::PlayerBullet | Category::Particle => None,
            },
        };
        match list {
            Some(list) => {
                list.attach(task);
                true
            }
            None => {
                task.kill();
                false
            }
        }
    }

    pub fn boss(&self, id: EntityId) -> Option<&Boss> {
        self.bosses.get_live(id)
    }

    pub fn boss_mut(&mut self, id: EntityId) -> Option<&mut Boss> {
        self.bosses.get_live_mut(id)
    }

    /// First live boss of the given kind
    pub fn find_boss(&self, kind: &str) -> Option<EntityId> {
        self.bosses.live().find(|b| b.kind == kind).map(Entity::id)
    }

    /// First live player
    pub fn player(&self) -> Option<&Player> {
        self.players.live().next()
    }

    pub fn player_pos(&self) -> Option<Vec2> {
        self.player().map(|p| p.pos)
    }

    // === Collision ===

    /// Collide two positioned shapes under the current settings
    pub fn hit_test(&self, a: &CollisionShape, pa: Vec2, b: &CollisionShape, pb: Vec2) -> bool {
        let result = collide(a, pa, b, pb, self.settings.ortho_circle_collision);
        self.resolve_hit(result, a.kind(), b.kind())
    }

    fn resolve_hit(&self, result: Option<bool>, a: ShapeKind, b: ShapeKind) -> bool {
        match result {
            Some(hit) => hit,
            None => {
                if self.settings.strict_collision {
                    panic!("collision between {a:?} and {b:?} is not implemented");
                }
                log::error!("Collision between {a:?} and {b:?} is not implemented");
                false
            }
        }
    }

    /// Hit-test the bullet in `slot` against a shape. Laser chains answer
    /// only through their head node.
    pub fn bullet_hits(&self, slot: usize, shape: &CollisionShape, pos: Vec2) -> bool {
        let bullet = self.bullets.slot(slot);
        if !bullet.alive() {
            return false;
        }
        if bullet.is_laser_node() {
            let id = bullet.id();
            if !laser::is_head(&self.bullets, id) || laser::is_moribund(&self.bullets, id) {
                return false;
            }
            let ortho = self.settings.ortho_circle_collision;
            let result = laser::chain_collide(&self.bullets, id, shape, pos, ortho);
            return self.resolve_hit(result, ShapeKind::Laser, shape.kind());
        }
        self.hit_test(bullet.collision(), bullet.pos, shape, pos)
    }

    // === Scoring and game flow ===

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Take all queued events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Count a graze at `pos`
    pub fn add_graze(&mut self, pos: Vec2) {
        self.graze += 1;
        self.point_value = (self.point_value + 1).min(self.settings.max_point_value);
        let vel = Vec2::from_angle(self.random_range(0.0, std::f32::consts::TAU)) * 2.0;
        self.add_particle(Particle::graze(pos, vel));
        self.push_event(GameEvent::Graze { pos });
    }

    /// Mark the running spell failed
    pub fn fail_spell(&mut self) {
        if let Some(spell) = &mut self.spell {
            spell.fail();
        }
    }

    /// Remove a bullet with a fade-out particle
    pub fn destroy_bullet(&mut self, id: EntityId) -> bool {
        let Some(bullet) = self.bullets.get_live_mut(id) else {
            return false;
        };
        let particle = Particle::new(
            ParticleKind::BulletDestroy {
                region: bullet.data.texture.region.clone(),
                frame: bullet.data.texture.frame_at(bullet.t),
                size: bullet.data.size,
            },
            bullet.pos,
            15,
        )
        .with_color(bullet.data.color.tinted(bullet.tint))
        .with_rotation(bullet.rotation + bullet.data.rotation)
        .with_scale(bullet.scale);
        bullet.kill();
        self.add_particle(particle);
        true
    }

    /// Destroy every destroyable bullet, or every bullet at all
    pub fn clear_bullets(&mut self, include_indestructible: bool) -> usize {
        let ids: Vec<EntityId> = self
            .bullets
            .live()
            .filter(|b| include_indestructible || b.destroyable)
            .map(Entity::id)
            .collect();
        let count = ids.into_iter().filter(|&id| self.destroy_bullet(id)).count();
        if count > 0 {
            self.push_event(GameEvent::BulletsCleared { count });
        }
        count
    }

    /// Resolve a hit on the player
    pub fn player_hit(&mut self, id: EntityId) -> bool {
        let settings = &self.settings;
        let Some(player) = self.players.get_live_mut(id) else {
            return false;
        };
        if !player.on_hit(settings) {
            return false;
        }
        let lives_left = player.lives;
        let pos = player.pos;
        log::info!("Player hit, {lives_left} lives left");
        self.push_event(GameEvent::PlayerHit {
            player: id,
            lives_left,
        });
        self.fail_spell();
        self.clear_bullets(false);
        for _ in 0..8 {
            let angle = self.random_range(0.0, std::f32::consts::TAU);
            let mut p = Particle::new(ParticleKind::Death, pos, 30);
            p.vel = Vec2::from_angle(angle) * 3.0;
            self.add_particle(p);
        }
        true
    }

    /// Launch a bomb from the player; fails the running spell
    pub fn use_bomb(&mut self, id: EntityId) -> bool {
        let Some(player) = self.players.get_live_mut(id) else {
            return false;
        };
        if !player.can_bomb() {
            return false;
        }
        player.bombs -= 1;
        let pos = player.pos;
        self.add_bomb(Bomb::new(pos));
        self.push_event(GameEvent::BombUsed { player: id });
        self.fail_spell();
        true
    }

    /// Damage a boss's current segment
    pub fn damage_boss(&mut self, id: EntityId, damage: f32, bomb: bool) -> bool {
        let Some(boss) = self.bosses.get_live_mut(id) else {
            return false;
        };
        if !boss.on_hit(damage) {
            return false;
        }
        if !bomb {
            let heavy = boss.health.current_health() < BOSS_LOW_HEALTH;
            self.push_event(GameEvent::BossDamaged {
                boss: id,
                damage,
                heavy,
            });
        }
        true
    }

    /// Damage an enemy, destroying it when its hit points run out
    pub fn damage_enemy(&mut self, id: EntityId, damage: f32) -> bool {
        let Some(enemy) = self.enemies.get_live_mut(id) else {
            return false;
        };
        if !enemy.on_hit(damage) {
            return false;
        }
        let pos = enemy.pos;
        enemy.kill();
        self.push_event(GameEvent::EnemyDestroyed { enemy: id, pos });
        for _ in 0..5 {
            let angle = self.random_range(0.0, std::f32::consts::TAU);
            let mut p = Particle::new(ParticleKind::Death, pos, 20);
            p.vel = Vec2::from_angle(angle) * 2.0;
            self.add_particle(p);
        }
        true
    }

    /// End a boss fight; cleanup runs once no matter how often it is called
    pub fn defeat_boss(&mut self, id: EntityId) -> bool {
        let Some(boss) = self.bosses.get_live_mut(id) else {
            return false;
        };
        if !boss.kill() {
            return false;
        }
        log::info!("Boss {} defeated", boss.kind);
        boss.set_phase(EncounterPhase::Defeated);
        self.push_event(GameEvent::BossDefeated { boss: id });
        true
    }

    /// Drop every dead entity
    pub fn sweep(&mut self) -> usize {
        self.players.sweep()
            + self.bombs.sweep()
            + self.player_bullets.sweep()
            + self.bullets.sweep()
            + self.enemies.sweep()
            + self.bosses.sweep()
            + self.particles.sweep()
    }

    // === Drawing ===

    /// Issue draw commands for everything alive
    pub fn draw(&self, target: &mut dyn DrawTarget, parent_alpha: f32, sub_frame_time: f32) {
        for bomb in self.bombs.live() {
            bomb.draw(target, parent_alpha, sub_frame_time);
        }
        for boss in self.bosses.live() {
            boss.draw(target, parent_alpha, sub_frame_time);
        }
        for enemy in self.enemies.live() {
            enemy.draw(target, parent_alpha, sub_frame_time);
        }
        for player in self.players.live() {
            player.draw(target, parent_alpha, sub_frame_time);
        }
        for shot in self.player_bullets.live() {
            shot.draw(target, parent_alpha, sub_frame_time);
        }
        for bullet in self.bullets.live() {
            match bullet.kind() {
                BulletKind::Basic => {
                    bullet.draw(target, parent_alpha, sub_frame_time)
                }
                BulletKind::Static(_) => {
                    bullet.draw_static_laser(target, parent_alpha, sub_frame_time)
                }
                BulletKind::Laser(_) => {
                    if laser::is_head(&self.bullets, bullet.id()) {
                        laser::draw_chain(&self.bullets, bullet.id(), target, parent_alpha);
                    }
                }
            }
        }
        for particle in self.particles.live() {
            particle.draw(target, parent_alpha, sub_frame_time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::bullet::tests::ball_data;

    #[test]
    fn test_entity_refs() {
        let mut world = World::with_seed(7);
        let b = world.add_bullet(Bullet::new(ball_data(3.0), Vec2::new(1.0, 2.0), 0.0, 0.0));
        let e = world.add_enemy(Enemy::new("fairy", Vec2::ZERO, 10.0, 8.0));
        assert!(b.id < e.id);
        assert_eq!(world.entity_pos(b), Some(Vec2::new(1.0, 2.0)));
        assert!(world.set_entity_pos(e, Vec2::ONE));
        assert!(world.kill(b));
        assert!(!world.kill(b));
        assert_eq!(world.entity_pos(b), None);
        assert_eq!(world.sweep(), 1);
    }

    #[test]
    fn test_attach_to_dead_owner_kills_task() {
        let mut world = World::with_seed(7);
        let b = world.add_bullet(Bullet::new(ball_data(3.0), Vec2::ZERO, 0.0, 0.0));
        assert!(world.attach_task(Some(b), Task::wait(5)));
        world.kill(b);
        assert!(!world.attach_task(Some(b), Task::wait(5)));
        assert!(world.attach_task(None, Task::wait(5)));
        assert_eq!(world.tasks.len(), 1);
    }

    #[test]
    fn test_player_hit_clears_destroyable_bullets_and_fails_spell() {
        let mut world = World::with_seed(7);
        let settings = world.settings.clone();
        let p = world.add_player(Player::new(&settings, Vec2::ZERO));
        world.add_bullet(Bullet::new(ball_data(3.0), Vec2::ZERO, 0.0, 0.0));
        world.add_bullet(Bullet::new(ball_data(3.0), Vec2::ONE, 0.0, 0.0).indestructible());
        world.spell = Some(SpellInfo::new("test", 100, 1000, EntityId(99)));

        assert!(world.player_hit(p.id));
        assert!(!world.player_hit(p.id));
        assert_eq!(world.bullets.live_count(), 1);
        assert!(world.spell.as_ref().unwrap().failed);
        let events = world.drain_events();
        assert!(events.contains(&GameEvent::BulletsCleared { count: 1 }));
        assert!(matches!(events[0], GameEvent::PlayerHit { lives_left: 2, .. }));
    }

    #[test]
    fn test_defeat_boss_once() {
        let mut world = World::with_seed(7);
        let boss = world.add_boss(Boss::new("aya", Vec2::ZERO, 40.0));
        assert!(world.defeat_boss(boss.id));
        assert!(!world.defeat_boss(boss.id));
        assert!(!world.kill(boss));
        let defeated = world
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::BossDefeated { .. }))
            .count();
        assert_eq!(defeated, 1);
    }

    #[test]
    fn test_graze_caps_point_value() {
        let settings = Settings {
            base_point_value: 999_988,
            ..Settings::default()
        };
        let mut world = World::new(settings, Rc::new(ShotSheet::default()), 1);
        world.add_graze(Vec2::ZERO);
        assert_eq!(world.point_value, 999_989);
        world.add_graze(Vec2::ZERO);
        world.add_graze(Vec2::ZERO);
        assert_eq!(world.graze, 3);
        assert_eq!(world.point_value, 999_990);
        assert_eq!(world.particles.len(), 3);
    }

    #[test]
    fn test_entity_ids_keep_growing_past_u32() {
        let mut world = World::with_seed(1);
        world.next_id = u64::from(u32::MAX);
        let a = world.add_bullet(Bullet::new(ball_data(2.0), Vec2::ZERO, 0.0, 0.0));
        let b = world.add_bullet(Bullet::new(ball_data(2.0), Vec2::ZERO, 0.0, 0.0));
        assert_eq!(b.id, EntityId(u64::from(u32::MAX) + 1));
        assert!(a.id < b.id);
        assert_eq!(world.bullets.index_of(b.id), Some(1));
    }

    #[test]
    fn test_unsupported_pair_is_a_miss_when_lenient() {
        let mut world = World::with_seed(1);
        world.settings.strict_collision = false;
        let rect = CollisionShape::Aabb { width: 2.0, height: 2.0 };
        let seg = CollisionShape::Segment(crate::sim::collision::DirectionalSegment::new(
            0.0, 10.0, 4.0, 0.6, 0.7,
        ));
        assert!(!world.hit_test(&seg, Vec2::ZERO, &rect, Vec2::new(5.0, 0.0)));
    }

    #[test]
    #[should_panic(expected = "not implemented")]
    fn test_unsupported_pair_panics_when_strict() {
        let mut world = World::with_seed(1);
        world.settings.strict_collision = true;
        let rect = CollisionShape::Aabb { width: 2.0, height: 2.0 };
        let seg = CollisionShape::Segment(crate::sim::collision::DirectionalSegment::new(
            0.0, 10.0, 4.0, 0.6, 0.7,
        ));
        world.hit_test(&seg, Vec2::ZERO, &rect, Vec2::new(5.0, 0.0));
    }
}
