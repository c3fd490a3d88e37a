//! Danmaku Core demo
//!
//! Runs a headless two-spell boss encounter against a scripted player and
//! logs how it went. Pass a settings JSON path as the first argument to
//! override the defaults; set `RUST_LOG=debug` for per-event output.

use std::f32::consts::PI;
use std::rc::Rc;

use glam::Vec2;

use danmaku_core::Settings;
use danmaku_core::pattern::{self, LaserParams, RngBank};
use danmaku_core::sim::{
    Boss, BonusFormula, DrawLog, GameEvent, Player, ShotSheet, ShotSheetError, Spell, Task,
    TickInput, World, tick,
};

const DEFAULT_SHOT_SHEET: &str = include_str!("../assets/default_shot.json");
const SEED: u64 = 20_240_601;
/// Give up after three minutes of game time
const MAX_FRAMES: u64 = 60 * 180;

fn main() {
    env_logger::init();
    log::info!("Danmaku Core demo starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(path),
        None => Settings::default(),
    };

    match run(settings) {
        Ok(world) => report(&world),
        Err(e) => {
            log::error!("Demo failed: {e}");
            std::process::exit(1);
        }
    }
}

fn run(settings: Settings) -> Result<World, ShotSheetError> {
    let sheet = Rc::new(ShotSheet::from_json(DEFAULT_SHOT_SHEET)?);
    let ring_spell = Rc::new(ring_spell(&sheet)?);
    let laser_spell = Rc::new(laser_spell(&sheet)?);

    let mut world = World::new(settings, sheet, SEED);
    let player_settings = world.settings.clone();
    world.add_player(Player::new(&player_settings, Vec2::new(0.0, -400.0)));

    let mut boss = Boss::new("aya", Vec2::new(0.0, 80.0), 32.0).with_home(Vec2::new(0.0, -110.0));
    boss.health.start_with(&[ring_spell.health, laser_spell.health]);
    let boss = world.add_boss(boss);

    world.attach_task(
        None,
        Task::sequence([
            pattern::boss_entrance(boss),
            ring_spell.build(),
            laser_spell.build(),
            pattern::boss_defeat(boss),
        ]),
    );

    while world.tasks.any_alive() && world.frame < MAX_FRAMES {
        let input = autopilot(world.frame);
        tick(&mut world, &input);
        for event in world.drain_events() {
            log_event(&event);
        }
        if world.frame % 600 == 0 {
            let mut frame = DrawLog::default();
            world.draw(&mut frame, 1.0, 0.0);
            log::debug!(
                "Frame {}: {} sprites, {} laser paths, {} warning lines",
                world.frame,
                frame.sprites.len(),
                frame.paths.len(),
                frame.lines.len()
            );
        }
    }
    if world.tasks.any_alive() {
        log::warn!("Encounter still running after {MAX_FRAMES} frames");
    }
    Ok(world)
}

/// Rotating rings from the boss
fn ring_spell(sheet: &ShotSheet) -> Result<Spell, ShotSheetError> {
    let ball = sheet.find_by_name("DS_BALL_M_A_RED")?;
    let rice = sheet.find_by_name("DS_RICE_S_PURPLE")?;
    let spell = Spell::new("demo.ring", "aya", move |_boss| {
        let ball = ball.clone();
        let rice = rice.clone();
        pattern::repeat(None, 14, move |ctx, i| {
            let Some(pos) = ctx.owner_pos() else {
                return;
            };
            let base = i as f32 * 0.17;
            for angle in pattern::ring(18, base) {
                pattern::shoot(ctx.world, ball.clone(), pos, 2.2, angle);
            }
            if i % 4 == 3 {
                let aimed = pattern::aim(ctx.world, pos);
                for k in -2..=2 {
                    pattern::shoot(ctx.world, rice.clone(), pos, 3.5, aimed + k as f32 * 0.12);
                }
            }
        })
    })
    .with_health(6000.0)
    .with_max_time(60 * 40)
    .with_bonus(BonusFormula::for_stage(1));
    Ok(spell)
}

/// Wavering chain lasers aimed at the player, crossed by static beams
fn laser_spell(sheet: &ShotSheet) -> Result<Spell, ShotSheetError> {
    let laser_data = sheet.find_by_name("DS_LASER_BLUE")?;
    let beam = sheet.find_by_name("DS_BALL_M_A_BLUE")?;
    let spell = Spell::new("demo.laser", "aya", move |boss| {
        let laser_data = laser_data.clone();
        let beam = beam.clone();
        pattern::repeat(None, 50, move |ctx, i| {
            let Some(pos) = ctx.owner_pos() else {
                return;
            };
            let aimed = pattern::aim(ctx.world, pos);
            for k in -1..=1 {
                let heading = aimed + k as f32 * 0.5;
                let params = LaserParams {
                    data: laser_data.clone(),
                    speed: 3.0,
                    width: 12.0,
                    max_length: 160.0,
                };
                // Every four nodes share one wobble so the chain bends smoothly
                let mut wobble = RngBank::new();
                let builder = pattern::laser(params, move |ctx, n| {
                    let origin = ctx.owner_pos()?;
                    let offset = wobble.random(ctx.world.rng(), n / 4, -0.08, 0.08);
                    Some((origin, heading + offset))
                });
                ctx.world.attach_task(Some(boss), builder);
            }
            if i % 2 == 1 {
                let sweep = ctx.world.random_range(-0.6, 0.6);
                pattern::static_laser(
                    ctx.world,
                    beam.clone(),
                    pos,
                    -PI / 2.0 + sweep,
                    420.0,
                    14.0,
                    40,
                );
            }
        })
    })
    .with_health(8000.0)
    .with_max_time(60 * 50)
    .with_bonus(BonusFormula::for_stage(2));
    Ok(spell)
}

/// Sway side to side under constant fire; bomb once, late
fn autopilot(frame: u64) -> TickInput {
    let sway = (frame as f32 / 70.0).sin();
    TickInput {
        movement: Vec2::new(sway, 0.0),
        focus: frame % 300 < 150,
        shoot: true,
        bomb: frame == 2400,
    }
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::SpellDeclared { name } => log::info!("Spell declared: {name}"),
        GameEvent::SpellEnded { name, outcome } => log::info!("Spell {name} ended: {outcome:?}"),
        GameEvent::PlayerHit { lives_left, .. } => log::info!("Player hit, {lives_left} lives left"),
        GameEvent::BombUsed { .. } => log::info!("Bomb!"),
        GameEvent::BossDefeated { .. } => log::info!("Boss defeated"),
        other => log::debug!("{other:?}"),
    }
}

fn report(world: &World) {
    let lives = world.player().map_or(0, |p| p.lives);
    println!("\nEncounter finished after {} frames", world.frame);
    println!("  score:  {}", world.score);
    println!("  graze:  {}", world.graze);
    println!("  lives:  {lives}");
    println!("  bosses: {}", world.bosses.live_count());
}
