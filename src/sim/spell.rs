//! Spells: named, timed and health-bounded boss attacks
//!
//! Running a spell binds it to a live boss of the right kind, starts its
//! pattern script and keeps the timer and bonus up to date in
//! [`World::spell`]. The run ends when the boss's current segment is
//! depleted or time runs out. Running out of time, getting hit or bombing
//! only fails the spell for scoring; the fight carries on either way.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::boss::{Boss, EncounterPhase};
use super::entity::{Category, EntityId, EntityRef};
use super::task::{Flow, Task};
use super::world::{GameEvent, World};
use crate::consts::FRAME_RATE;
use crate::pattern;

/// Game difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Lunatic,
    Extra,
}

impl Difficulty {
    /// The four main-game difficulties
    pub const REGULAR: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::Lunatic,
    ];
}

/// How a spell's capture bonus is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusFormula {
    Fixed(u64),
    /// Falls linearly from `initial` to `floor` over the time limit
    Decaying { initial: u64, floor: u64 },
}

impl BonusFormula {
    /// Standard bonus for spells of the given stage
    pub fn for_stage(stage: u32) -> Self {
        let initial = u64::from(stage) * 1_000_000;
        BonusFormula::Decaying {
            initial,
            floor: initial / 10,
        }
    }

    /// Bonus after `elapsed` of `max_time` frames, rounded down to 10
    pub fn value_at(&self, elapsed: u32, max_time: u32) -> u64 {
        match *self {
            BonusFormula::Fixed(value) => value,
            BonusFormula::Decaying { initial, floor } => {
                if initial <= floor || max_time == 0 {
                    return initial;
                }
                let progress = f64::from(elapsed.min(max_time)) / f64::from(max_time);
                let value = initial as f64 - (initial - floor) as f64 * progress;
                (value as u64) / 10 * 10
            }
        }
    }
}

/// How a spell run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpellOutcome {
    /// Segment cleared without failing; bonus paid
    Captured { bonus: u64 },
    /// Segment cleared after the player was hit or bombed
    Failed,
    /// Time ran out
    TimedOut,
}

/// Live state of the running spell, for UI
#[derive(Debug, Clone, PartialEq)]
pub struct SpellInfo {
    pub name: String,
    /// Bonus as it stands now
    pub bonus: u64,
    pub failed: bool,
    pub elapsed: u32,
    pub max_time: u32,
    pub boss: EntityId,
}

impl SpellInfo {
    pub fn new(name: impl Into<String>, bonus: u64, max_time: u32, boss: EntityId) -> Self {
        Self {
            name: name.into(),
            bonus,
            failed: false,
            elapsed: 0,
            max_time,
            boss,
        }
    }

    pub fn fail(&mut self) {
        if !self.failed {
            log::info!("Spell \"{}\" failed", self.name);
            self.failed = true;
            self.bonus = 0;
        }
    }

    pub fn remaining_frames(&self) -> u32 {
        self.max_time.saturating_sub(self.elapsed)
    }

    /// Bonus to show; `None` once failed
    pub fn display_bonus(&self) -> Option<u64> {
        (!self.failed).then_some(self.bonus)
    }
}

type ScriptFactory = Rc<dyn Fn(EntityRef) -> Task>;

/// A spell definition
pub struct Spell {
    pub name: String,
    /// Kind of boss that casts this spell
    pub boss_kind: String,
    pub health: f32,
    /// Time limit in frames
    pub max_time: u32,
    pub bonus: BonusFormula,
    pub difficulties: Vec<Difficulty>,
    script: ScriptFactory,
}

impl fmt::Debug for Spell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spell")
            .field("name", &self.name)
            .field("boss_kind", &self.boss_kind)
            .field("health", &self.health)
            .field("max_time", &self.max_time)
            .finish()
    }
}

impl Spell {
    /// `script` builds the attack pattern for the boss it is given
    pub fn new(
        name: impl Into<String>,
        boss_kind: impl Into<String>,
        script: impl Fn(EntityRef) -> Task + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            boss_kind: boss_kind.into(),
            health: 10_000.0,
            max_time: 60 * FRAME_RATE,
            bonus: BonusFormula::for_stage(1),
            difficulties: Difficulty::REGULAR.to_vec(),
            script: Rc::new(script),
        }
    }

    pub fn with_health(mut self, health: f32) -> Self {
        self.health = health;
        self
    }

    pub fn with_max_time(mut self, frames: u32) -> Self {
        self.max_time = frames;
        self
    }

    pub fn with_bonus(mut self, bonus: BonusFormula) -> Self {
        self.bonus = bonus;
        self
    }

    pub fn with_difficulties(mut self, difficulties: &[Difficulty]) -> Self {
        self.difficulties = difficulties.to_vec();
        self
    }

    pub fn available_on(&self, difficulty: Difficulty) -> bool {
        self.difficulties.contains(&difficulty)
    }

    /// Task that runs this spell against the first live boss of its kind
    pub fn build(self: Rc<Self>) -> Task {
        let spell = self;
        let mut run: Option<(EntityRef, Task)> = None;
        Task::coroutine(move |ctx| {
            if run.is_none() {
                match spell.declare(ctx.world) {
                    Some(started) => {
                        run = Some(started);
                        return Flow::Wait(0);
                    }
                    None => return Flow::Done,
                }
            }
            let Some((boss, script)) = run.as_mut() else {
                return Flow::Done;
            };
            let boss = *boss;
            if !ctx.world.is_alive(boss) {
                script.kill();
                ctx.world.spell = None;
                return Flow::Done;
            }
            script.tick(&mut ctx.scoped(Some(boss)));
            match spell.update(ctx.world, boss.id) {
                None => Flow::Yield,
                Some(outcome) => {
                    script.kill();
                    spell.finish(ctx.world, boss.id, outcome);
                    Flow::Done
                }
            }
        })
    }

    /// Self-contained run: spawn the boss, enter, fight, explode
    pub fn build_practice(self: Rc<Self>, make_boss: impl Fn() -> Boss + 'static) -> Task {
        let spell = self;
        let mut step = 0;
        let mut boss_ref = None;
        Task::coroutine(move |ctx| {
            step += 1;
            match step {
                1 => {
                    let mut boss = make_boss();
                    boss.health.start_with(&[spell.health]);
                    let r = ctx.world.add_boss(boss);
                    boss_ref = Some(r);
                    Flow::Await(pattern::boss_entrance(r))
                }
                2 => Flow::Await(spell.clone().build()),
                3 => match boss_ref {
                    Some(r) if ctx.world.is_alive(r) => Flow::Await(pattern::boss_defeat(r)),
                    _ => Flow::Done,
                },
                _ => Flow::Done,
            }
        })
    }

    fn declare(&self, world: &mut World) -> Option<(EntityRef, Task)> {
        let Some(boss_id) = world.find_boss(&self.boss_kind) else {
            log::error!(
                "No boss of kind \"{}\" for spell \"{}\"",
                self.boss_kind,
                self.name
            );
            return None;
        };
        let boss = world.boss_mut(boss_id)?;
        if boss.health.segment_count() == 0 {
            boss.health.add_segment(self.health);
        } else if boss.health.current_segment_depleted() {
            // Earlier spells used up the bar; this one gets its own segment
            boss.health.add_segment(self.health);
            boss.health.next_segment();
        }
        boss.invulnerable = false;
        boss.set_phase(EncounterPhase::InSpell);

        let bonus = self.bonus.value_at(0, self.max_time);
        world.spell = Some(SpellInfo::new(self.name.clone(), bonus, self.max_time, boss_id));
        world.push_event(GameEvent::SpellDeclared {
            name: self.name.clone(),
        });
        log::info!("Spell \"{}\" declared", self.name);

        let boss_ref = EntityRef::new(Category::Boss, boss_id);
        Some((boss_ref, (self.script)(boss_ref)))
    }

    /// Advance the timer; returns the outcome once the run is over
    fn update(&self, world: &mut World, boss: EntityId) -> Option<SpellOutcome> {
        let depleted = world
            .boss(boss)
            .is_some_and(|b| b.health.current_segment_depleted());
        let info = world
            .spell
            .get_or_insert_with(|| SpellInfo::new(self.name.clone(), 0, self.max_time, boss));
        info.elapsed += 1;
        if !info.failed {
            info.bonus = self.bonus.value_at(info.elapsed, self.max_time);
        }
        if depleted {
            return Some(if info.failed {
                SpellOutcome::Failed
            } else {
                SpellOutcome::Captured { bonus: info.bonus }
            });
        }
        if info.elapsed >= self.max_time {
            info.fail();
            return Some(SpellOutcome::TimedOut);
        }
        None
    }

    fn finish(&self, world: &mut World, boss: EntityId, outcome: SpellOutcome) {
        world.clear_bullets(true);
        match outcome {
            SpellOutcome::Captured { bonus } => {
                world.score += bonus;
                log::info!("Spell \"{}\" captured, bonus {bonus}", self.name);
            }
            SpellOutcome::Failed => log::info!("Spell \"{}\" cleared without bonus", self.name),
            SpellOutcome::TimedOut => log::info!("Spell \"{}\" timed out", self.name),
        }
        world.push_event(GameEvent::SpellEnded {
            name: self.name.clone(),
            outcome,
        });
        world.spell = None;
        if let Some(boss) = world.boss_mut(boss) {
            boss.set_phase(EncounterPhase::SegmentCleared);
            boss.health.next_segment();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::bullet::Bullet;
    use crate::sim::bullet::tests::ball_data;
    use crate::sim::player::Player;
    use crate::sim::task::TaskCtx;
    use glam::Vec2;

    fn tick(task: &mut Task, world: &mut World) {
        task.tick(&mut TaskCtx::new(world, None));
    }

    /// Spell whose script fires one bullet per frame
    fn spray() -> Rc<Spell> {
        Rc::new(
            Spell::new("test.spray", "aya", |boss| {
                Task::coroutine(move |ctx| {
                    let pos = ctx.world.entity_pos(boss).unwrap_or_default();
                    ctx.world.add_bullet(Bullet::new(ball_data(3.0), pos, 1.0, 0.0));
                    Flow::Yield
                })
            })
            .with_health(100.0)
            .with_max_time(10)
            .with_bonus(BonusFormula::Fixed(5000)),
        )
    }

    fn world_with_boss() -> (World, EntityRef) {
        let mut world = World::with_seed(3);
        let boss = world.add_boss(Boss::new("aya", Vec2::ZERO, 40.0));
        (world, boss)
    }

    #[test]
    fn test_bonus_formula() {
        let f = BonusFormula::for_stage(2);
        assert_eq!(f.value_at(0, 100), 2_000_000);
        assert_eq!(f.value_at(50, 100), 1_100_000);
        assert_eq!(f.value_at(100, 100), 200_000);
        assert_eq!(f.value_at(500, 100), 200_000);
        assert_eq!(BonusFormula::Fixed(7).value_at(3, 0), 7);
    }

    #[test]
    fn test_capture_pays_bonus_and_clears() {
        let (mut world, boss) = world_with_boss();
        let mut task = spray().build();
        tick(&mut task, &mut world);
        assert_eq!(world.boss(boss.id).unwrap().phase, EncounterPhase::InSpell);
        assert_eq!(world.spell.as_ref().unwrap().elapsed, 1);
        assert_eq!(world.bullets.live_count(), 1);

        world.damage_boss(boss.id, 100.0, false);
        tick(&mut task, &mut world);
        assert!(!task.alive());
        assert_eq!(world.score, 5000);
        assert_eq!(world.bullets.live_count(), 0);
        assert!(world.spell.is_none());
        assert!(world.events().contains(&GameEvent::SpellEnded {
            name: "test.spray".into(),
            outcome: SpellOutcome::Captured { bonus: 5000 },
        }));
        let boss = world.boss(boss.id).unwrap();
        assert_eq!(boss.phase, EncounterPhase::SegmentCleared);
    }

    #[test]
    fn test_consecutive_spells_register_own_segments() {
        let (mut world, boss) = world_with_boss();
        let mut task = Task::sequence([spray().build(), spray().build()]);
        tick(&mut task, &mut world);
        world.damage_boss(boss.id, 100.0, false);
        for _ in 0..4 {
            tick(&mut task, &mut world);
        }
        assert!(task.alive());
        assert_eq!(world.score, 5000);
        assert!(world.spell.is_some());
        let health = &world.boss(boss.id).unwrap().health;
        assert_eq!(health.segment_count(), 2);
        assert_eq!(health.current_segment(), 1);
        assert_eq!(health.current_health(), 100.0);
        let captures = world
            .events()
            .iter()
            .filter(|e| matches!(e, GameEvent::SpellEnded { .. }))
            .count();
        assert_eq!(captures, 1);
    }

    #[test]
    fn test_time_out_fails_without_ending_fight() {
        let (mut world, boss) = world_with_boss();
        let mut task = spray().build();
        for _ in 0..9 {
            tick(&mut task, &mut world);
        }
        assert!(task.alive());
        assert_eq!(world.spell.as_ref().unwrap().remaining_frames(), 1);
        tick(&mut task, &mut world);
        assert!(!task.alive());
        assert_eq!(world.score, 0);
        assert!(world.is_alive(boss));
        assert!(world.events().contains(&GameEvent::SpellEnded {
            name: "test.spray".into(),
            outcome: SpellOutcome::TimedOut,
        }));
    }

    #[test]
    fn test_player_hit_fails_spell() {
        let (mut world, boss) = world_with_boss();
        let settings = world.settings.clone();
        let player = world.add_player(Player::new(&settings, Vec2::new(0.0, -400.0)));
        let mut task = spray().build();
        tick(&mut task, &mut world);
        world.player_hit(player.id);
        let info = world.spell.as_ref().unwrap();
        assert!(info.failed);
        assert_eq!(info.display_bonus(), None);

        world.damage_boss(boss.id, 1000.0, false);
        tick(&mut task, &mut world);
        assert_eq!(world.score, 0);
        assert!(world.events().contains(&GameEvent::SpellEnded {
            name: "test.spray".into(),
            outcome: SpellOutcome::Failed,
        }));
    }

    #[test]
    fn test_missing_boss_ends_immediately() {
        let mut world = World::with_seed(3);
        let mut task = spray().build();
        tick(&mut task, &mut world);
        assert!(!task.alive());
        assert!(world.spell.is_none());
    }

    #[test]
    fn test_boss_death_stops_script() {
        let (mut world, boss) = world_with_boss();
        let mut task = spray().build();
        tick(&mut task, &mut world);
        world.defeat_boss(boss.id);
        tick(&mut task, &mut world);
        assert!(!task.alive());
        assert_eq!(world.bullets.live_count(), 1);
    }

    #[test]
    fn test_difficulty_availability() {
        let spell = Spell::new("x", "aya", |_| Task::empty()).with_difficulties(&[Difficulty::Extra]);
        assert!(spell.available_on(Difficulty::Extra));
        assert!(!spell.available_on(Difficulty::Easy));
    }

    #[test]
    fn test_practice_runs_whole_encounter() {
        let mut world = World::with_seed(3);
        let spell = spray();
        let mut task = spell.build_practice(|| {
            Boss::new("aya", Vec2::new(0.0, 100.0), 40.0).with_home(Vec2::new(0.0, -100.0))
        });
        let mut frames = 0;
        while task.alive() && frames < 2000 {
            tick(&mut task, &mut world);
            frames += 1;
        }
        assert!(!task.alive());
        assert_eq!(world.bosses.live_count(), 0);
        let events = world.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::SpellEnded { .. })));
        assert!(events.iter().any(|e| matches!(e, GameEvent::BossDefeated { .. })));
    }
}
