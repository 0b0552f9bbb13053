//! Fixed-order frame update
//!
//! One call advances the world by one frame: field forces, control intent
//! (human or AI), tanks, obstacles, shells, collision resolution, effects,
//! then the round-over check. Everything that happened is returned as events.

use glam::Vec2;

use super::ai::Surroundings;
use super::resolve::resolve;
use super::state::{GameEvent, RoundPhase, World};
use super::tank::TankInput;
use crate::PlayerId;
use crate::consts::MAX_FRAME_DT;
use crate::tuning::Tuning;

/// Advance the world by one frame. `inputs` is indexed by slot; AI slots
/// ignore theirs and missing entries mean "no input".
pub fn tick(world: &mut World, inputs: &[TankInput], tuning: &Tuning, dt: f32) -> Vec<GameEvent> {
    let dt = if dt.is_finite() { dt.clamp(0.0, MAX_FRAME_DT) } else { 0.0 };
    let mut events = Vec::new();

    match world.phase {
        RoundPhase::Placement | RoundPhase::MatchOver => return events,
        RoundPhase::Playing | RoundPhase::RoundOver => {}
    }
    world.phase_timer += dt;

    apply_field_forces(world, tuning, dt);
    let intents = gather_inputs(world, inputs, tuning, dt);
    update_tanks(world, &intents, tuning, dt, &mut events);
    update_obstacles(world, tuning, dt, &mut events);

    let arena = world.arena;
    for shell in &mut world.shells {
        shell.update(dt, &arena);
    }

    resolve(world, tuning, &mut events);
    world.shells.retain(|s| s.is_alive());

    for explosion in &mut world.explosions {
        explosion.update(dt);
    }
    world.explosions.retain(|e| !e.is_done());

    match world.phase {
        RoundPhase::Playing => check_round_over(world, tuning, dt, &mut events),
        RoundPhase::RoundOver if world.phase_timer >= tuning.flow.round_over_delay => {
            finish_round(world, tuning, &mut events)
        }
        _ => {}
    }

    for event in &events {
        world.scoreboard.record(event, &tuning.flow);
    }
    events
}

/// Electromagnet and fan forces on live tanks and shells
fn apply_field_forces(world: &mut World, tuning: &Tuning, dt: f32) {
    let World {
        tanks,
        shells,
        obstacles,
        ..
    } = world;

    for tank in tanks.iter_mut().filter(|t| t.is_alive()) {
        let force: Vec2 = obstacles
            .iter()
            .filter(|o| o.is_alive())
            .map(|o| o.tank_force(tank.pos, tuning))
            .sum();
        tank.apply_external_force(force);
    }
    for shell in shells.iter_mut().filter(|s| s.is_alive()) {
        let force: Vec2 = obstacles
            .iter()
            .filter(|o| o.is_alive())
            .map(|o| o.shell_force(shell.pos, tuning))
            .sum();
        shell.apply_force(force, dt);
    }
}

/// This frame's intent per slot. Nobody fires during the round-start grace
/// period or once the round is decided.
fn gather_inputs(world: &mut World, inputs: &[TankInput], tuning: &Tuning, dt: f32) -> Vec<TankInput> {
    let may_fire = world.phase == RoundPhase::Playing && world.phase_timer > tuning.flow.round_start_delay;

    (0..world.tanks.len())
        .map(|slot| {
            let mut intent = match world.ai.get_mut(slot).and_then(Option::as_mut) {
                Some(ai) => {
                    let view = Surroundings {
                        tanks: &world.tanks,
                        shells: &world.shells,
                        obstacles: &world.obstacles,
                        arena: &world.arena,
                    };
                    ai.update(dt, &world.tanks[slot], &view, tuning, &mut world.rng)
                }
                None => inputs.get(slot).copied().unwrap_or_default(),
            };
            intent.fire &= may_fire;
            intent
        })
        .collect()
}

fn update_tanks(world: &mut World, intents: &[TankInput], tuning: &Tuning, dt: f32, events: &mut Vec<GameEvent>) {
    for (tank, intent) in world.tanks.iter_mut().zip(intents) {
        tank.update(dt, intent, &world.arena, tuning, &mut world.rng);
        for shell in tank.take_pending_shells() {
            events.push(GameEvent::ShellFired {
                owner: shell.owner,
                pos: shell.pos,
                from_turret: false,
            });
            world.shells.push(shell);
        }
    }
}

/// Obstacle timers and turret fire, then hand out pickup effects
fn update_obstacles(world: &mut World, tuning: &Tuning, dt: f32, events: &mut Vec<GameEvent>) {
    for obstacle in world.obstacles.iter_mut() {
        obstacle.update(dt, &world.tanks, tuning);

        for shell in obstacle.take_pending_shells() {
            events.push(GameEvent::ShellFired {
                owner: shell.owner,
                pos: shell.pos,
                from_turret: true,
            });
            world.shells.push(shell);
        }

        let Some(effect) = obstacle.take_collection_effect(tuning) else {
            continue;
        };
        if let Some(tank) = world.tanks.get_mut(effect.player) {
            if effect.heal_fraction > 0.0 {
                tank.heal(effect.heal_fraction, tuning);
            }
            if let Some(kind) = effect.powerup {
                tank.apply_powerup(kind, tuning);
            }
        }
        log::debug!("Player {} collected {:?}", effect.player, obstacle.kind());
        events.push(GameEvent::PickupCollected {
            kind: obstacle.kind(),
            effect,
        });
    }
}

/// Last tank standing wins; nobody taking damage for too long is a draw
fn check_round_over(world: &mut World, tuning: &Tuning, dt: f32, events: &mut Vec<GameEvent>) {
    if world.any_health_lost() {
        world.stalemate_timer = 0.0;
    } else {
        world.stalemate_timer += dt;
    }

    let alive: Vec<PlayerId> = world.tanks.iter().filter(|t| t.is_alive()).map(|t| t.player).collect();
    if world.player_count() >= 2 && alive.len() <= 1 {
        end_round(world, alive.first().copied(), events);
    } else if world.stalemate_timer >= tuning.flow.stalemate_timeout {
        log::info!("Round {} stalemate", world.round);
        end_round(world, None, events);
    }
}

fn end_round(world: &mut World, winner: Option<PlayerId>, events: &mut Vec<GameEvent>) {
    world.phase = RoundPhase::RoundOver;
    world.phase_timer = 0.0;
    world.round_winner = winner;
    match winner {
        Some(player) => log::info!("Round {} won by player {}", world.round, player),
        None => log::info!("Round {} is a draw", world.round),
    }
    events.push(GameEvent::RoundOver {
        round: world.round,
        winner,
    });
}

/// After the round-over pause: next placement, or the end of the match
fn finish_round(world: &mut World, tuning: &Tuning, events: &mut Vec<GameEvent>) {
    if world.round >= tuning.flow.rounds_to_win {
        world.phase = RoundPhase::MatchOver;
        let winner = world.scoreboard.leader();
        log::info!("Match over after {} rounds, winner {:?}", world.round, winner);
        events.push(GameEvent::MatchOver { winner });
    } else {
        world.start_placement(tuning);
    }
}
