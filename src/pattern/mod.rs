//! Pattern helpers
//!
//! The surface stage and spell scripts are written against. Every helper
//! either returns a [`Flow`] for a script step to hand back, or builds a
//! [`Task`] that can be awaited, raced, or attached to an entity.

pub mod rng;

pub use rng::RngBank;

use std::f32::consts::{FRAC_PI_2, TAU};
use std::rc::Rc;

use glam::Vec2;

use crate::sim::boss::EncounterPhase;
use crate::sim::bullet::Bullet;
use crate::sim::entity::{EntityId, EntityRef};
use crate::sim::laser::{self, LaserNode};
use crate::sim::particle::{Particle, ParticleKind};
use crate::sim::shot_sheet::BulletData;
use crate::sim::task::{Flow, Task, TaskCtx};
use crate::sim::world::{GameEvent, World};
use crate::{angle_to, smoothstep};

/// Frames a boss takes to fly to its home position
pub const BOSS_ENTRANCE_FRAMES: u32 = 120;
/// Length of the boss explosion
pub const BOSS_EXPLOSION_FRAMES: u32 = 180;

/// Resume after `frames` frames
pub fn wait(frames: i32) -> Flow {
    Flow::Wait(frames)
}

/// Resume next frame
pub fn yield_frame() -> Flow {
    Flow::Yield
}

/// Run `task` and resume once it has finished
pub fn attach_and_wait(task: Task) -> Flow {
    Flow::Await(task)
}

/// Run all tasks side by side until every one has finished
pub fn parallel(tasks: impl IntoIterator<Item = Task>) -> Task {
    Task::join_all(tasks)
}

/// Run all tasks side by side until the first one finishes
pub fn race(tasks: impl IntoIterator<Item = Task>) -> Task {
    Task::race(tasks)
}

/// Call `body` every `interval` frames, `times` times or forever
pub fn repeat(
    times: Option<u32>,
    interval: i32,
    mut body: impl FnMut(&mut TaskCtx<'_>, u32) + 'static,
) -> Task {
    let mut count = 0;
    Task::coroutine(move |ctx| {
        if times.is_some_and(|n| count >= n) {
            return Flow::Done;
        }
        body(ctx, count);
        count += 1;
        if times.is_some_and(|n| count >= n) {
            Flow::Done
        } else {
            Flow::Wait(interval.max(1))
        }
    })
}

/// Call `apply` once per frame with progress running from `1/frames` to 1
pub fn interpolate(frames: u32, mut apply: impl FnMut(&mut TaskCtx<'_>, f32) + 'static) -> Task {
    let frames = frames.max(1);
    let mut t = 0;
    Task::coroutine(move |ctx| {
        t += 1;
        apply(ctx, t as f32 / frames as f32);
        if t >= frames {
            Flow::Done
        } else {
            Flow::Yield
        }
    })
}

/// Ease an entity to `to` over `frames` frames
pub fn move_to(entity: EntityRef, to: Vec2, frames: u32) -> Task {
    let mut from = None;
    interpolate(frames, move |ctx, progress| {
        let Some(start) = from.or_else(|| ctx.world.entity_pos(entity)) else {
            return;
        };
        from = Some(start);
        let pos = Vec2::new(
            smoothstep(start.x, to.x, progress),
            smoothstep(start.y, to.y, progress),
        );
        ctx.world.set_entity_pos(entity, pos);
    })
}

/// Drift to a random nearby point, staying inside `bounds`
pub fn wander(entity: EntityRef, frames: u32, bounds: (Vec2, Vec2)) -> Task {
    let mut started = false;
    Task::coroutine(move |ctx| {
        if started {
            return Flow::Done;
        }
        started = true;
        let Some(pos) = ctx.world.entity_pos(entity) else {
            return Flow::Done;
        };
        let dx = ctx.world.random_range(40.0, 80.0);
        let dy = ctx.world.random_range(-20.0, 20.0);
        // Head toward whichever side has more room
        let dx = if pos.x > (bounds.0.x + bounds.1.x) / 2.0 { -dx } else { dx };
        let target = (pos + Vec2::new(dx, dy)).clamp(bounds.0, bounds.1);
        Flow::Await(move_to(entity, target, frames))
    })
}

/// Charge-up effect: particles drawn in toward `pos` for `frames` frames
pub fn cast(pos: Vec2, intensity: u32, frames: u32) -> Task {
    let mut t = 0;
    Task::coroutine(move |ctx| {
        if t == 0 {
            ctx.world.push_event(GameEvent::Cast { pos });
        }
        for _ in 0..intensity {
            let from = Vec2::new(
                ctx.world.random_range(-1000.0, 1000.0),
                ctx.world.random_range(-1000.0, 1000.0),
            );
            ctx.world.add_particle(Particle::cast(pos + from, pos, 30));
        }
        t += 1;
        if t >= frames {
            Flow::Done
        } else {
            Flow::Yield
        }
    })
}

/// Boss explosion: particles thrown out of `pos` with a burst every 10 frames
pub fn explode(pos: Vec2, frames: u32) -> Task {
    let mut t = 0;
    Task::coroutine(move |ctx| {
        let world = &mut *ctx.world;
        for _ in 0..3 {
            let to = pos + Vec2::new(
                world.random_range(-300.0, 300.0),
                world.random_range(-300.0, 300.0),
            );
            world.add_particle(Particle::cast(pos, to, 30));
        }
        if t % 10 == 0 {
            let rotation = world.random_range(0.0, TAU);
            world.add_particle(
                Particle::new(
                    ParticleKind::Explosion {
                        from_size: 16.0,
                        to_size: 256.0,
                    },
                    pos,
                    15,
                )
                .with_rotation(rotation),
            );
            for _ in 0..5 {
                let angle = world.random_range(0.0, TAU);
                let mut p = Particle::new(ParticleKind::Death, pos, 20);
                p.vel = Vec2::from_angle(angle) * 1.2;
                world.add_particle(p);
            }
        }
        t += 1;
        if t >= frames {
            Flow::Done
        } else {
            Flow::Yield
        }
    })
}

/// Scripted entrance: the boss cannot be hurt while it flies home
pub fn boss_entrance(boss: EntityRef) -> Task {
    let mut step = 0;
    Task::coroutine(move |ctx| {
        step += 1;
        let Some(b) = ctx.world.boss_mut(boss.id) else {
            return Flow::Done;
        };
        if step == 1 {
            b.invulnerable = true;
            b.set_phase(EncounterPhase::Approaching);
            let home = b.home;
            return Flow::Await(move_to(boss, home, BOSS_ENTRANCE_FRAMES));
        }
        b.invulnerable = false;
        Flow::Done
    })
}

/// Explosion followed by the boss's defeat
pub fn boss_defeat(boss: EntityRef) -> Task {
    let mut exploded = false;
    Task::coroutine(move |ctx| {
        if !exploded {
            exploded = true;
            let Some(b) = ctx.world.boss_mut(boss.id) else {
                return Flow::Done;
            };
            b.invulnerable = true;
            let pos = b.pos;
            return Flow::Await(explode(pos, BOSS_EXPLOSION_FRAMES));
        }
        ctx.world.defeat_boss(boss.id);
        Flow::Done
    })
}

/// `count` evenly spaced angles starting at `base`
pub fn ring(count: u32, base: f32) -> impl Iterator<Item = f32> {
    let step = TAU / count.max(1) as f32;
    (0..count).map(move |i| base + step * i as f32)
}

/// Angle from `from` to the player, or straight down without one
pub fn aim(world: &World, from: Vec2) -> f32 {
    world
        .player_pos()
        .map_or(-FRAC_PI_2, |player| angle_to(from, player))
}

/// Fire a plain bullet
pub fn shoot(world: &mut World, data: Rc<BulletData>, pos: Vec2, speed: f32, angle: f32) -> EntityRef {
    world.add_bullet(Bullet::new(data, pos, speed, angle))
}

/// Fire a static laser that starts `delay` frames from now
pub fn static_laser(
    world: &mut World,
    data: Rc<BulletData>,
    pos: Vec2,
    angle: f32,
    length: f32,
    width: f32,
    delay: u32,
) -> EntityRef {
    world.add_bullet(Bullet::new_static_laser(data, pos, angle, length, width, delay))
}

/// Parameters of a chain laser
#[derive(Debug, Clone)]
pub struct LaserParams {
    pub data: Rc<BulletData>,
    pub speed: f32,
    pub width: f32,
    pub max_length: f32,
}

/// Grow a chain laser one node per frame. `source` gives each new node's
/// position and heading, or `None` to stop. Building also stops once the
/// chain reaches its maximum length or its head is gone.
pub fn laser(
    params: LaserParams,
    mut source: impl FnMut(&mut TaskCtx<'_>, u32) -> Option<(Vec2, f32)> + 'static,
) -> Task {
    let mut head: Option<EntityId> = None;
    let mut tail: Option<EntityId> = None;
    let mut count = 0;
    Task::coroutine(move |ctx| {
        if let Some(head) = head {
            let bullets = &ctx.world.bullets;
            if !bullets.is_alive(head) || laser::chain_length(bullets, head) >= params.max_length {
                return Flow::Done;
            }
        }
        let Some((pos, angle)) = source(ctx, count) else {
            return Flow::Done;
        };
        count += 1;
        let node = Bullet::new(params.data.clone(), pos, params.speed, angle)
            .with_delay(0)
            .into_laser_node(LaserNode::new(params.width, params.max_length));
        let id = ctx.world.add_bullet(node).id;
        if let Some(prev) = tail {
            laser::link(&mut ctx.world.bullets, prev, id);
        }
        head.get_or_insert(id);
        tail = Some(id);
        Flow::Yield
    })
}

/// Node ids of the chain that starts at `head`, for tests and tooling
pub fn chain_ids(world: &World, head: EntityId) -> Vec<EntityId> {
    let mut ids = vec![head];
    let mut current = head;
    while let Some(next) = laser::live_next(&world.bullets, current) {
        if ids.contains(&next) {
            break;
        }
        ids.push(next);
        current = next;
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::boss::Boss;
    use crate::sim::bullet::tests::ball_data;
    use crate::sim::player::Player;

    fn run(task: &mut Task, world: &mut World, frames: usize) {
        for _ in 0..frames {
            task.tick(&mut TaskCtx::new(world, None));
        }
    }

    #[test]
    fn test_repeat_counts_and_interval() {
        let mut world = World::with_seed(5);
        let mut task = repeat(Some(3), 2, |ctx, i| ctx.world.score += u64::from(i) + 1);
        run(&mut task, &mut world, 1);
        assert_eq!(world.score, 1);
        run(&mut task, &mut world, 2);
        assert_eq!(world.score, 3);
        run(&mut task, &mut world, 2);
        assert_eq!(world.score, 6);
        assert!(!task.alive());
    }

    #[test]
    fn test_move_to_arrives_exactly() {
        let mut world = World::with_seed(5);
        let boss = world.add_boss(Boss::new("aya", Vec2::ZERO, 30.0));
        let target = Vec2::new(50.0, -100.0);
        let mut task = move_to(boss, target, 10);
        run(&mut task, &mut world, 5);
        let halfway = world.entity_pos(boss).unwrap();
        assert!((halfway.x - 25.0).abs() < 1e-3);
        run(&mut task, &mut world, 5);
        assert!(!task.alive());
        let end = world.entity_pos(boss).unwrap();
        assert!(end.distance(target) < 1e-4);
    }

    #[test]
    fn test_wander_stays_in_bounds() {
        let mut world = World::with_seed(5);
        let boss = world.add_boss(Boss::new("aya", Vec2::new(-100.0, -100.0), 30.0));
        let bounds = (Vec2::new(-120.0, -150.0), Vec2::new(120.0, -50.0));
        for _ in 0..10 {
            let mut task = wander(boss, 30, bounds);
            run(&mut task, &mut world, 40);
            assert!(!task.alive());
            let pos = world.entity_pos(boss).unwrap();
            assert!(pos.cmpge(bounds.0).all() && pos.cmple(bounds.1).all());
        }
    }

    #[test]
    fn test_cast_and_explode_spawn_particles() {
        let mut world = World::with_seed(5);
        let mut task = cast(Vec2::ZERO, 4, 3);
        run(&mut task, &mut world, 3);
        assert!(!task.alive());
        assert_eq!(world.particles.len(), 12);
        assert_eq!(world.events(), [GameEvent::Cast { pos: Vec2::ZERO }]);

        let mut world = World::with_seed(5);
        let mut task = explode(Vec2::ZERO, 11);
        run(&mut task, &mut world, 11);
        // 3 per frame plus two bursts of 1 ring and 5 sparks
        assert_eq!(world.particles.len(), 33 + 12);
    }

    #[test]
    fn test_entrance_then_defeat() {
        let mut world = World::with_seed(5);
        let boss = world.add_boss(
            Boss::new("aya", Vec2::new(0.0, 50.0), 30.0).with_home(Vec2::new(0.0, -100.0)),
        );
        let mut entrance = boss_entrance(boss);
        run(&mut entrance, &mut world, 1);
        assert!(world.boss(boss.id).unwrap().invulnerable);
        run(&mut entrance, &mut world, BOSS_ENTRANCE_FRAMES as usize + 1);
        assert!(!entrance.alive());
        let b = world.boss(boss.id).unwrap();
        assert!(!b.invulnerable);
        assert!(b.pos.distance(Vec2::new(0.0, -100.0)) < 1e-3);

        let mut defeat = boss_defeat(boss);
        run(&mut defeat, &mut world, BOSS_EXPLOSION_FRAMES as usize + 2);
        assert!(!defeat.alive());
        assert!(!world.is_alive(boss));
    }

    #[test]
    fn test_ring_and_aim() {
        let angles: Vec<f32> = ring(4, 0.0).collect();
        assert_eq!(angles.len(), 4);
        assert!((angles[2] - std::f32::consts::PI).abs() < 1e-6);
        assert_eq!(ring(0, 1.0).count(), 0);

        let mut world = World::with_seed(5);
        assert_eq!(aim(&world, Vec2::ZERO), -FRAC_PI_2);
        let settings = world.settings.clone();
        world.add_player(Player::new(&settings, Vec2::new(10.0, 0.0)));
        assert!(aim(&world, Vec2::ZERO).abs() < 1e-6);
    }

    #[test]
    fn test_laser_builder_links_and_stops_at_max_length() {
        let mut world = World::with_seed(5);
        let params = LaserParams {
            data: ball_data(2.0),
            speed: 0.0,
            width: 8.0,
            max_length: 30.0,
        };
        let mut task = laser(params, |_, i| Some((Vec2::new(0.0, -10.0 * i as f32), 0.0)));
        run(&mut task, &mut world, 10);
        assert!(!task.alive());
        let head = world.bullets.slot(0).id;
        assert!(laser::is_head(&world.bullets, head));
        let ids = chain_ids(&world, head);
        assert_eq!(ids.len(), 4);
        assert_eq!(laser::chain_length(&world.bullets, head), 30.0);
        for id in &ids[1..] {
            assert!(world.bullets.get(*id).unwrap().laser().unwrap().activated());
        }
    }

    #[test]
    fn test_laser_builder_stops_on_source_end() {
        let mut world = World::with_seed(5);
        let params = LaserParams {
            data: ball_data(2.0),
            speed: 1.0,
            width: 8.0,
            max_length: 1000.0,
        };
        let mut task = laser(params, |_, i| (i < 2).then_some((Vec2::ZERO, 0.0)));
        run(&mut task, &mut world, 5);
        assert!(!task.alive());
        assert_eq!(world.bullets.len(), 2);
    }

    #[test]
    fn test_static_laser_helper() {
        let mut world = World::with_seed(5);
        let r = static_laser(&mut world, ball_data(2.0), Vec2::ZERO, 0.0, 200.0, 10.0, 30);
        let bullet = world.bullets.get_live(r.id).unwrap();
        assert!(!bullet.destroyable);
        assert_eq!(bullet.static_laser().unwrap().length(), 200.0);
        let shot = shoot(&mut world, ball_data(2.0), Vec2::ZERO, 2.0, 0.0);
        assert!(world.is_alive(shot));
    }
}
