//! Bosses and their segmented health bars
//!
//! The health bar only tracks health. It exposes whether the current segment
//! is depleted and lets the fight script move on; deciding when the fight is
//! over belongs to the script.

use glam::Vec2;

use super::collision::CollisionShape;
use super::draw::{BlendingMode, Color, DrawTarget, Sprite};
use super::entity::{Entity, EntityId};
use super::task::TaskList;

/// Where a boss is in its encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncounterPhase {
    /// Scripted entrance; cannot be damaged
    Approaching,
    /// A segment is active and takes damage
    InSpell,
    /// The current segment just ended
    SegmentCleared,
    /// Fight over
    Defeated,
}

/// Ordered health segments, one per spell or phase
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthBar {
    segments: Vec<f32>,
    current_segment: usize,
    current_health: f32,
    total_health: f32,
}

impl HealthBar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all segments
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Append segments; the first segment ever added becomes current
    pub fn add_segments(&mut self, health: &[f32]) {
        if self.segments.is_empty() {
            if let Some(&first) = health.first() {
                self.current_health = first;
            }
        }
        for &h in health {
            self.total_health += h;
            self.segments.push(h);
        }
    }

    pub fn add_segment(&mut self, health: f32) {
        self.add_segments(&[health]);
    }

    /// Replace all segments
    pub fn start_with(&mut self, health: &[f32]) {
        self.reset();
        self.add_segments(health);
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn current_segment(&self) -> usize {
        self.current_segment
    }

    pub fn current_health(&self) -> f32 {
        self.current_health
    }

    /// Sum of all segments as added
    pub fn total_health(&self) -> f32 {
        self.total_health
    }

    /// Health left in the current and all later segments
    pub fn current_total_health(&self) -> f32 {
        let later: f32 = self
            .segments
            .iter()
            .skip(self.current_segment + 1)
            .sum();
        later + self.current_health
    }

    pub fn is_last_segment(&self) -> bool {
        self.current_segment + 1 >= self.segments.len()
    }

    /// Subtract health, clamping at zero
    pub fn damage(&mut self, damage: f32) {
        self.current_health = (self.current_health - damage).max(0.0);
    }

    pub fn current_segment_depleted(&self) -> bool {
        self.current_health <= 0.0
    }

    /// Move to the next segment, or empty the current one if it is the last
    pub fn next_segment(&mut self) {
        if self.current_segment + 1 < self.segments.len() {
            self.current_segment += 1;
            self.current_health = self.segments[self.current_segment];
        } else {
            self.current_health = 0.0;
        }
    }
}

/// A boss entity
#[derive(Debug)]
pub struct Boss {
    pub(crate) id: EntityId,
    /// Boss type, used to match spells to bosses
    pub kind: String,
    pub pos: Vec2,
    /// Where the entrance moves the boss to
    pub home: Vec2,
    pub invulnerable: bool,
    /// Tested against player shots
    pub bullet_collision: CollisionShape,
    /// Tested against the player
    pub player_collision: CollisionShape,
    pub health: HealthBar,
    pub phase: EncounterPhase,
    pub rotation: f32,
    pub scale: Vec2,
    pub color: Color,
    pub tasks: TaskList,
    alive: bool,
}

impl Boss {
    /// New boss; the player-facing radius is half the shot-facing one
    pub fn new(kind: impl Into<String>, pos: Vec2, bullet_radius: f32) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            kind: kind.into(),
            pos,
            home: Vec2::new(0.0, -100.0),
            invulnerable: false,
            bullet_collision: CollisionShape::circle(bullet_radius),
            player_collision: CollisionShape::circle(bullet_radius / 2.0),
            health: HealthBar::new(),
            phase: EncounterPhase::Approaching,
            rotation: 0.0,
            scale: Vec2::ONE,
            color: Color::WHITE,
            tasks: TaskList::new(),
            alive: true,
        }
    }

    pub fn with_player_radius(mut self, radius: f32) -> Self {
        self.player_collision = CollisionShape::circle(radius);
        self
    }

    pub fn with_home(mut self, home: Vec2) -> Self {
        self.home = home;
        self
    }

    /// Whether damage applies right now
    pub fn vulnerable(&self) -> bool {
        !self.invulnerable && self.phase == EncounterPhase::InSpell
    }

    /// Apply damage to the current segment; returns whether it applied
    pub fn on_hit(&mut self, damage: f32) -> bool {
        if !self.alive || !self.vulnerable() {
            return false;
        }
        self.health.damage(damage);
        true
    }

    pub fn set_phase(&mut self, phase: EncounterPhase) {
        if self.phase != phase {
            log::debug!("Boss {} ({:?}): {:?} -> {:?}", self.kind, self.id, self.phase, phase);
            self.phase = phase;
        }
    }

    pub fn draw(&self, target: &mut dyn DrawTarget, parent_alpha: f32, _sub_frame_time: f32) {
        target.sprite(&Sprite {
            region: &self.kind,
            frame: 0,
            pos: self.pos,
            origin: Vec2::new(32.0, 40.0),
            size: Vec2::new(64.0, 80.0),
            scale: self.scale,
            rotation: self.rotation,
            color: self.color.with_alpha(self.color.a * parent_alpha),
            blending: BlendingMode::Alpha,
        });
    }
}

impl Entity for Boss {
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
        self.set_phase(EncounterPhase::Defeated);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_two_segment_scenario() {
        let mut bar = HealthBar::new();
        bar.add_segments(&[5000.0, 7000.0]);
        assert_eq!(bar.total_health(), 12000.0);
        assert_eq!(bar.current_health(), 5000.0);

        bar.damage(5000.0);
        assert!(bar.current_segment_depleted());
        assert_eq!(bar.current_total_health(), 7000.0);

        bar.next_segment();
        assert_eq!(bar.current_segment(), 1);
        assert_eq!(bar.current_health(), 7000.0);
        assert!(bar.is_last_segment());
    }

    #[test]
    fn test_next_segment_on_last_empties_it() {
        let mut bar = HealthBar::new();
        bar.add_segment(100.0);
        bar.next_segment();
        assert_eq!(bar.current_segment(), 0);
        assert_eq!(bar.current_health(), 0.0);
        assert!(bar.current_segment_depleted());
    }

    #[test]
    fn test_later_segments_keep_current() {
        let mut bar = HealthBar::new();
        bar.add_segment(100.0);
        bar.damage(30.0);
        bar.add_segment(50.0);
        assert_eq!(bar.current_health(), 70.0);
        bar.start_with(&[10.0]);
        assert_eq!(bar.segment_count(), 1);
        assert_eq!(bar.current_health(), 10.0);
    }

    #[test]
    fn test_boss_damage_only_in_spell() {
        let mut boss = Boss::new("aya", Vec2::ZERO, 40.0);
        boss.health.add_segment(100.0);
        assert!(!boss.on_hit(10.0));
        boss.set_phase(EncounterPhase::InSpell);
        assert!(boss.on_hit(10.0));
        boss.invulnerable = true;
        assert!(!boss.on_hit(10.0));
        assert_eq!(boss.health.current_health(), 90.0);
    }

    #[test]
    fn test_boss_kill_runs_once() {
        let mut boss = Boss::new("aya", Vec2::ZERO, 40.0);
        assert!(boss.kill());
        assert_eq!(boss.phase, EncounterPhase::Defeated);
        assert!(!boss.kill());
    }

    proptest! {
        #[test]
        fn prop_health_never_negative(
            segments in proptest::collection::vec(1.0f32..10_000.0, 1..5),
            ops in proptest::collection::vec((0.0f32..20_000.0, any::<bool>()), 0..40),
        ) {
            let mut bar = HealthBar::new();
            bar.add_segments(&segments);
            for (damage, advance) in ops {
                bar.damage(damage);
                if advance {
                    bar.next_segment();
                }
                prop_assert!(bar.current_health() >= 0.0);
                prop_assert!(bar.current_segment() < segments.len());
            }
        }
    }
}
