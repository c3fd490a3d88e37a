//! Fixed timestep simulation tick
//!
//! Advances the world by one frame, deterministically. Within a frame the
//! order is: stage tasks, players, bombs, player shots, bullets, enemies,
//! bosses, particles, then the sweep of everything that died.
//!
//! Every pass walks its pool by slot over a length snapshot, so entities
//! spawned mid-pass wait until the next frame for their first update.

use glam::Vec2;

use super::collision::CollisionShape;
use super::entity::{Category, Entity, EntityId, EntityRef};
use super::player::PlayerBullet;
use super::task::{TaskCtx, TaskList};
use super::world::World;
use crate::consts::*;

/// Frames between player volleys
const SHOT_INTERVAL: u32 = 4;
const SHOT_DAMAGE: f32 = 12.0;
const SHOT_SPEED: f32 = 12.0;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Desired movement direction; longer than 1 is clamped
    pub movement: Vec2,
    /// Slow, precise movement
    pub focus: bool,
    /// Fire player shots
    pub shoot: bool,
    /// Launch a bomb
    pub bomb: bool,
}

/// Advance the world by one frame
pub fn tick(world: &mut World, input: &TickInput) {
    let mut stage = world.tasks.detach();
    stage.tick(&mut TaskCtx::new(world, None));
    world.tasks.restore(stage);

    tick_players(world, input);
    tick_bombs(world);
    tick_player_bullets(world);
    tick_bullets(world);
    tick_enemies(world);
    tick_bosses(world);

    for particle in world.particles.iter_mut() {
        particle.tick();
    }

    world.sweep();
    world.frame += 1;
}

/// Run the tasks attached to one entity. The list is moved out while the
/// tasks run, so they may freely borrow the world, and merged back after.
/// If the owner died meanwhile, the tasks die with it.
fn run_entity_tasks(
    world: &mut World,
    owner: EntityRef,
    list: impl Fn(&mut World) -> Option<&mut TaskList>,
) {
    let Some(mut tasks) = list(world).map(TaskList::detach) else {
        return;
    };
    if !tasks.is_empty() {
        tasks.tick(&mut TaskCtx::new(world, Some(owner)));
    }
    match list(world) {
        Some(current) => current.restore(tasks),
        None => {
            tasks.kill_all();
        }
    }
}

fn tick_players(world: &mut World, input: &TickInput) {
    let invulnerable_frames = world.settings.respawn_invulnerable_frames;
    let bounds = world.settings.world_bounds();
    let movement = input.movement.clamp_length_max(1.0);

    for slot in 0..world.players.len() {
        let player = world.players.slot_mut(slot);
        if !player.alive() {
            continue;
        }
        player.advance_state(invulnerable_frames);
        let speed = if input.focus {
            player.focus_speed
        } else {
            player.speed
        };
        player.move_by(movement * speed, bounds);

        let id = player.id;
        let pos = player.pos;
        let can_act = player.can_move();
        let volley = input.shoot && can_act && player.shot_cooldown == 0;
        if volley {
            player.shot_cooldown = SHOT_INTERVAL;
        } else {
            player.shot_cooldown = player.shot_cooldown.saturating_sub(1);
        }

        if input.bomb {
            world.use_bomb(id);
        }
        if volley {
            for dx in [-8.0, 8.0] {
                world.add_player_bullet(PlayerBullet::new(
                    pos + Vec2::new(dx, 8.0),
                    Vec2::new(0.0, SHOT_SPEED),
                    SHOT_DAMAGE,
                    1,
                    6.0,
                ));
            }
        }
        if can_act {
            collide_player_with_bullets(world, id);
        }

        run_entity_tasks(world, EntityRef::new(Category::Player, id), |w| {
            w.players.get_live_mut(id).map(|p| &mut p.tasks)
        });
    }
}

/// Hits first, then grazes, against every live bullet
fn collide_player_with_bullets(world: &mut World, id: EntityId) {
    let Some(player) = world.players.get_live(id) else {
        return;
    };
    let pos = player.pos;
    let hit_shape = player.hit_shape.clone();
    let graze_shape = player.graze_shape.clone();

    for slot in 0..world.bullets.len() {
        let vulnerable = world.players.get_live(id).is_some_and(|p| p.is_normal());
        if vulnerable && world.bullet_hits(slot, &hit_shape, pos) {
            world.player_hit(id);
            continue;
        }
        if world.bullet_hits(slot, &graze_shape, pos) {
            let bullet = world.bullets.slot_mut(slot);
            if bullet.on_graze() {
                let at = bullet.pos;
                world.add_graze(at);
            }
        }
    }
}

fn tick_bombs(world: &mut World) {
    for slot in 0..world.bombs.len() {
        let bomb = world.bombs.slot_mut(slot);
        if !bomb.alive() {
            continue;
        }
        bomb.advance();
        if !bomb.alive() {
            continue;
        }
        let pos = bomb.pos;
        let radius = bomb.radius;
        let shape = bomb.collision();

        let doomed: Vec<EntityId> = world
            .bullets
            .live()
            .filter(|b| b.destroyable && b.pos.distance(pos) <= radius)
            .map(Entity::id)
            .collect();
        for id in doomed {
            world.destroy_bullet(id);
        }

        let enemies: Vec<EntityId> = world
            .enemies
            .live()
            .filter(|e| world.hit_test(&shape, pos, &e.bullet_collision, e.pos))
            .map(Entity::id)
            .collect();
        for id in enemies {
            world.damage_enemy(id, BOMB_DAMAGE);
        }

        let bosses: Vec<EntityId> = world
            .bosses
            .live()
            .filter(|b| world.hit_test(&shape, pos, &b.bullet_collision, b.pos))
            .map(Entity::id)
            .collect();
        for id in bosses {
            world.damage_boss(id, BOMB_DAMAGE, true);
        }
    }
}

fn tick_player_bullets(world: &mut World) {
    let settings = &world.settings;
    for shot in world.player_bullets.iter_mut() {
        if !shot.alive() {
            continue;
        }
        shot.advance();
        if settings.out_of_world(shot.pos) {
            shot.kill();
        }
    }
}

fn tick_bullets(world: &mut World) {
    for slot in 0..world.bullets.len() {
        let bullet = world.bullets.slot_mut(slot);
        if !bullet.alive() {
            continue;
        }
        bullet.advance();
        let id = bullet.id;
        let pos = bullet.pos;
        if world.settings.out_of_world(pos) {
            world.bullets.slot_mut(slot).kill();
            continue;
        }
        run_entity_tasks(world, EntityRef::new(Category::Bullet, id), |w| {
            w.bullets.get_live_mut(id).map(|b| &mut b.tasks)
        });
    }
}

/// Player shots that overlap `shape` at `pos`; each one is spent as it hits
fn shots_hitting(world: &mut World, shape: &CollisionShape, pos: Vec2) -> f32 {
    let mut damage = 0.0;
    for slot in 0..world.player_bullets.len() {
        let shot = world.player_bullets.slot(slot);
        if !shot.alive() || !world.hit_test(&shot.collision, shot.pos, shape, pos) {
            continue;
        }
        damage += world.player_bullets.slot_mut(slot).hit();
    }
    damage
}

/// Body contact with the first live player
fn touch_player(world: &mut World, shape: &CollisionShape, pos: Vec2) {
    let Some(player) = world.player() else {
        return;
    };
    if player.is_normal() && world.hit_test(&player.hit_shape, player.pos, shape, pos) {
        let id = player.id;
        world.player_hit(id);
    }
}

fn tick_enemies(world: &mut World) {
    for slot in 0..world.enemies.len() {
        let enemy = world.enemies.slot(slot);
        if !enemy.alive() {
            continue;
        }
        let id = enemy.id;
        let pos = enemy.pos;
        let invulnerable = enemy.invulnerable;
        let bullet_shape = enemy.bullet_collision.clone();
        let player_shape = enemy.player_collision.clone();

        let damage = shots_hitting(world, &bullet_shape, pos);
        if damage > 0.0 {
            if !invulnerable {
                world.score += (damage * SCORE_PER_DAMAGE).round() as u64;
            }
            world.damage_enemy(id, damage);
        }
        if world.enemies.is_alive(id) {
            touch_player(world, &player_shape, pos);
        }

        run_entity_tasks(world, EntityRef::new(Category::Enemy, id), |w| {
            w.enemies.get_live_mut(id).map(|e| &mut e.tasks)
        });
    }
}

fn tick_bosses(world: &mut World) {
    for slot in 0..world.bosses.len() {
        let boss = world.bosses.slot(slot);
        if !boss.alive() {
            continue;
        }
        let id = boss.id;
        let pos = boss.pos;
        let bullet_shape = boss.bullet_collision.clone();
        let player_shape = boss.player_collision.clone();

        let damage = shots_hitting(world, &bullet_shape, pos);
        if damage > 0.0 && world.damage_boss(id, damage, false) {
            world.score += (damage * SCORE_PER_DAMAGE).round() as u64;
        }
        touch_player(world, &player_shape, pos);

        run_entity_tasks(world, EntityRef::new(Category::Boss, id), |w| {
            w.bosses.get_live_mut(id).map(|b| &mut b.tasks)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::boss::{Boss, EncounterPhase};
    use crate::sim::bullet::Bullet;
    use crate::sim::bullet::tests::ball_data;
    use crate::sim::enemy::Enemy;
    use crate::sim::laser::{self, LaserNode};
    use crate::sim::player::{Player, PlayerState};
    use crate::sim::task::{Flow, Task};
    use crate::sim::world::GameEvent;

    fn world_with_player(pos: Vec2) -> (World, EntityRef) {
        let mut world = World::with_seed(42);
        let settings = world.settings.clone();
        let player = world.add_player(Player::new(&settings, pos));
        (world, player)
    }

    #[test]
    fn test_bullet_waits_out_delay() {
        let mut world = World::with_seed(1);
        let b = world.add_bullet(
            Bullet::new(ball_data(3.0), Vec2::new(0.0, -200.0), 2.0, 0.0).with_delay(8),
        );
        for _ in 0..8 {
            tick(&mut world, &TickInput::default());
        }
        assert_eq!(world.entity_pos(b), Some(Vec2::new(0.0, -200.0)));
        tick(&mut world, &TickInput::default());
        let moved = world.entity_pos(b).unwrap();
        assert!((moved.x - 2.0).abs() < 1e-5);
        assert_eq!(world.frame, 9);
    }

    #[test]
    fn test_bullets_spawned_by_tasks_start_next_frame() {
        let mut world = World::with_seed(1);
        let b = world.add_bullet(
            Bullet::new(ball_data(3.0), Vec2::new(0.0, -200.0), 0.0, 0.0).with_delay(0),
        );
        // Every tick the bullet spawns a sibling; the pass must not visit it
        let spawner = Task::coroutine(|ctx| {
            let pos = ctx.owner_pos().unwrap_or_default();
            let data = ball_data(3.0);
            ctx.world
                .add_bullet(Bullet::new(data, pos, 1.0, 0.0).with_delay(0));
            Flow::Yield
        });
        assert!(world.attach_task(Some(b), spawner));
        tick(&mut world, &TickInput::default());
        assert_eq!(world.bullets.live_count(), 2);
        let spawned = world.bullets.slot(1);
        assert_eq!(spawned.t, 0);
        tick(&mut world, &TickInput::default());
        assert_eq!(world.bullets.live_count(), 3);
        assert_eq!(world.bullets.slot(1).t, 1);
    }

    #[test]
    fn test_owner_death_kills_running_tasks() {
        let mut world = World::with_seed(1);
        let b = world.add_bullet(Bullet::new(ball_data(3.0), Vec2::new(0.0, -200.0), 0.0, 0.0));
        let mut frames = 0;
        let task = Task::coroutine(move |ctx| {
            frames += 1;
            ctx.world.score += 1;
            if frames == 2 {
                if let Some(owner) = ctx.owner {
                    ctx.world.kill(owner);
                }
            }
            Flow::Yield
        });
        world.attach_task(Some(b), task);
        for _ in 0..5 {
            tick(&mut world, &TickInput::default());
        }
        assert_eq!(world.score, 2);
        assert!(world.bullets.is_empty());
    }

    #[test]
    fn test_out_of_world_bullets_are_removed() {
        let mut world = World::with_seed(1);
        let far = world.settings.delete_distance + 1000.0;
        world.add_bullet(Bullet::new(ball_data(3.0), Vec2::new(far, 0.0), 1.0, 0.0));
        world.add_bullet(Bullet::new(ball_data(3.0), Vec2::new(0.0, -200.0), 0.0, 0.0));
        tick(&mut world, &TickInput::default());
        assert_eq!(world.bullets.len(), 1);
    }

    #[test]
    fn test_player_hit_by_bullet() {
        let (mut world, player) = world_with_player(Vec2::new(0.0, -400.0));
        world.add_bullet(Bullet::new(ball_data(4.0), Vec2::new(0.0, -400.0), 0.0, 0.0));
        tick(&mut world, &TickInput::default());
        let p = world.players.get_live(player.id).unwrap();
        assert!(matches!(p.state, PlayerState::Respawning(_)));
        assert_eq!(p.lives, 2);
        // The destroyable bullet was cleared by the hit
        assert_eq!(world.bullets.live_count(), 0);
    }

    #[test]
    fn test_graze_counts_once_per_bullet() {
        let (mut world, _) = world_with_player(Vec2::new(0.0, -400.0));
        world.add_bullet(Bullet::new(ball_data(3.0), Vec2::new(15.0, -400.0), 0.0, 0.0));
        for _ in 0..5 {
            tick(&mut world, &TickInput::default());
        }
        assert_eq!(world.graze, 1);
        let grazes = world
            .events()
            .iter()
            .filter(|e| matches!(e, GameEvent::Graze { .. }))
            .count();
        assert_eq!(grazes, 1);
    }

    #[test]
    fn test_player_movement_is_clamped() {
        let (mut world, player) = world_with_player(Vec2::new(0.0, -446.0));
        let input = TickInput {
            movement: Vec2::new(0.0, -5.0),
            ..Default::default()
        };
        tick(&mut world, &input);
        let (min, _) = world.settings.world_bounds();
        assert_eq!(world.players.get_live(player.id).unwrap().pos.y, min.y);

        let focused = TickInput {
            movement: Vec2::X,
            focus: true,
            ..Default::default()
        };
        tick(&mut world, &focused);
        assert_eq!(world.players.get_live(player.id).unwrap().pos.x, 2.0);
    }

    #[test]
    fn test_shots_damage_enemy_and_score() {
        let (mut world, _) = world_with_player(Vec2::new(0.0, -400.0));
        let enemy = world.add_enemy(Enemy::new("fairy", Vec2::new(8.0, -370.0), 1000.0, 16.0));
        let input = TickInput {
            shoot: true,
            ..Default::default()
        };
        for _ in 0..10 {
            tick(&mut world, &input);
        }
        assert!(world.score > 0);
        assert_eq!(world.score % 10, 0);
        assert!(world.enemies.get_live(enemy.id).unwrap().hp < 1000.0);
    }

    #[test]
    fn test_shots_do_not_hurt_approaching_boss() {
        let (mut world, _) = world_with_player(Vec2::new(0.0, -400.0));
        let mut boss = Boss::new("aya", Vec2::new(0.0, -360.0), 30.0);
        boss.health.add_segment(1000.0);
        let boss = world.add_boss(boss);
        let input = TickInput {
            shoot: true,
            ..Default::default()
        };
        for _ in 0..5 {
            tick(&mut world, &input);
        }
        assert_eq!(world.boss(boss.id).unwrap().health.current_health(), 1000.0);
        assert_eq!(world.score, 0);

        world.boss_mut(boss.id).unwrap().set_phase(EncounterPhase::InSpell);
        for _ in 0..5 {
            tick(&mut world, &input);
        }
        assert!(world.boss(boss.id).unwrap().health.current_health() < 1000.0);
    }

    #[test]
    fn test_bomb_clears_destroyable_bullets() {
        let (mut world, player) = world_with_player(Vec2::new(0.0, -400.0));
        world.add_bullet(Bullet::new(ball_data(3.0), Vec2::new(100.0, -300.0), 0.0, 0.0));
        world.add_bullet(
            Bullet::new(ball_data(3.0), Vec2::new(-100.0, -300.0), 0.0, 0.0).indestructible(),
        );
        let bomb = TickInput {
            bomb: true,
            ..Default::default()
        };
        tick(&mut world, &bomb);
        assert_eq!(world.players.get_live(player.id).unwrap().bombs, 2);
        for _ in 0..40 {
            tick(&mut world, &TickInput::default());
        }
        assert_eq!(world.bullets.live_count(), 1);
        assert!(!world.bullets.slot(0).destroyable);
    }

    #[test]
    fn test_determinism() {
        let run = || {
            let (mut world, _) = world_with_player(Vec2::new(0.0, -400.0));
            world.add_enemy(Enemy::new("fairy", Vec2::new(0.0, -200.0), 300.0, 16.0));
            let spray = Task::coroutine(|ctx| {
                let angle = ctx.world.random_range(-3.0, 0.0);
                let data = ball_data(3.0);
                ctx.world
                    .add_bullet(Bullet::new(data, Vec2::new(0.0, -200.0), 2.0, angle));
                Flow::Wait(3)
            });
            world.attach_task(None, spray);
            let inputs = [
                TickInput {
                    movement: Vec2::X,
                    shoot: true,
                    ..Default::default()
                },
                TickInput {
                    movement: Vec2::NEG_X,
                    focus: true,
                    ..Default::default()
                },
                TickInput::default(),
            ];
            for i in 0..120 {
                tick(&mut world, &inputs[i % inputs.len()]);
            }
            let positions: Vec<Vec2> = world.bullets.live().map(|b| b.pos).collect();
            (world.score, world.graze, positions)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_laser_chain_grazes_through_head() {
        let (mut world, _) = world_with_player(Vec2::new(0.0, -200.0));
        // Stationary chain 12 units beside the player: inside graze, outside the hit width
        let ids: Vec<EntityId> = [-210.0, -200.0, -190.0]
            .into_iter()
            .map(|y| {
                let node = Bullet::new(ball_data(2.0), Vec2::new(12.0, y), 0.0, 0.0)
                    .with_delay(0)
                    .into_laser_node(LaserNode::new(10.0, 1000.0));
                world.add_bullet(node).id
            })
            .collect();
        assert!(laser::link(&mut world.bullets, ids[0], ids[1]));
        assert!(laser::link(&mut world.bullets, ids[1], ids[2]));
        for _ in 0..LASER_PROTECTION_FRAMES {
            for &id in &ids {
                world.bullets.get_mut(id).unwrap().advance();
            }
        }

        for _ in 0..100 {
            tick(&mut world, &TickInput::default());
        }
        assert_eq!(world.graze, 5);
        assert_eq!(world.player().unwrap().state, PlayerState::Normal);
        assert!(ids.iter().all(|&id| world.bullets.is_alive(id)));
    }
}
