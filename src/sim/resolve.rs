//! Per-frame collision and combat resolution
//!
//! Four passes in a fixed order: shell vs obstacle, shell vs tank, tank vs
//! obstacle, tank vs tank. Containers are walked in storage order so the
//! outcome never depends on distance sorting.

use glam::Vec2;

use super::geometry::{obb_overlap, segment_circle_hit};
use super::obstacle::{ObstacleKind, ShellHit, TankContact};
use super::state::{Explosion, GameEvent, World};
use crate::PlayerId;
use crate::tuning::Tuning;

/// Extra separation per tank so a resolved pair no longer touches
const TANK_SEPARATION_SLOP: f32 = 0.5;

/// Run all four passes
pub fn resolve(world: &mut World, tuning: &Tuning, events: &mut Vec<GameEvent>) {
    shells_vs_obstacles(world, tuning, events);
    shells_vs_tanks(world, tuning, events);
    tanks_vs_obstacles(world, tuning, events);
    tanks_vs_tanks(world, tuning, events);
}

/// Reflect, burst or absorb shells on obstacles. A shell bounces at most
/// once per frame.
pub fn shells_vs_obstacles(world: &mut World, tuning: &Tuning, events: &mut Vec<GameEvent>) {
    let World {
        shells,
        obstacles,
        explosions,
        ..
    } = world;
    let mut fragments = Vec::new();

    for shell in shells.iter_mut().filter(|s| s.is_alive()) {
        for obstacle in obstacles.iter_mut().filter(|o| o.is_alive()) {
            match obstacle.check_shell_collision(shell, tuning) {
                ShellHit::Miss => continue,
                ShellHit::Reflected { point, normal } => {
                    shell.reflect(point, normal, tuning.shells.bounce_nudge);
                    events.push(GameEvent::ShellReflected { pos: point });
                }
                ShellHit::Ricochet { point, normal } => {
                    let burst = shell.ricochet_fragments(point, normal, tuning);
                    events.push(GameEvent::Ricochet {
                        pos: point,
                        fragments: burst.len(),
                    });
                    fragments.extend(burst);
                    shell.kill();
                }
                ShellHit::Destroyed { point, .. } => {
                    shell.kill();
                    events.push(GameEvent::ShellImpact { pos: point });
                    if obstacle.explodes_on_hit() {
                        explosions.push(Explosion::small(point, tuning));
                    }
                    if obstacle.take_damage(shell.damage) {
                        let kind = obstacle.kind();
                        log::debug!("{:?} destroyed by player {}", kind, shell.owner);
                        events.push(GameEvent::ObstacleDestroyed {
                            kind,
                            pos: obstacle.pos,
                        });
                        if kind == ObstacleKind::AutoTurret {
                            explosions.push(Explosion::large(obstacle.pos, tuning));
                        }
                    }
                }
            }
            break;
        }
    }

    shells.extend(fragments);
}

/// Swept shell hits on tank hit circles. Wrecks still on the field soak up
/// shells without taking damage.
pub fn shells_vs_tanks(world: &mut World, tuning: &Tuning, events: &mut Vec<GameEvent>) {
    let World {
        shells,
        tanks,
        explosions,
        ..
    } = world;

    for shell in shells.iter_mut().filter(|s| s.is_alive()) {
        for tank in tanks.iter_mut().filter(|t| t.is_visible(tuning)) {
            let Some(point) = segment_circle_hit(shell.prev_pos, shell.pos, tank.pos, tank.hit_radius()) else {
                continue;
            };
            shell.kill();
            explosions.push(Explosion::small(point, tuning));
            events.push(GameEvent::ShellImpact { pos: point });

            if tank.is_alive() {
                let before = tank.health();
                let killed = tank.take_damage(shell.damage, shell.owner, tuning);
                events.push(GameEvent::TankHit {
                    victim: tank.player,
                    attacker: shell.owner,
                    damage: before - tank.health(),
                });
                if killed {
                    on_tank_killed(tank.player, shell.owner, tank.pos, tuning, explosions, events);
                }
            }
            break;
        }
    }
}

/// Mines, pits, portals and solid contact
pub fn tanks_vs_obstacles(world: &mut World, tuning: &Tuning, events: &mut Vec<GameEvent>) {
    let World {
        tanks,
        obstacles,
        explosions,
        rng,
        ..
    } = world;

    for tank in tanks.iter_mut() {
        for i in 0..obstacles.len() {
            if !tank.is_alive() {
                break;
            }
            if !obstacles[i].is_alive() {
                continue;
            }
            let push = obstacles[i].check_tank_collision(tank, tuning);
            if !push.hit {
                continue;
            }

            if obstacles[i].kind() == ObstacleKind::Mine && obstacles[i].is_armed(tuning) {
                let mine = &mut obstacles[i];
                mine.destroy();
                explosions.push(Explosion::large(mine.pos, tuning));
                events.push(GameEvent::MineDetonated {
                    owner: mine.owner,
                    victim: tank.player,
                    pos: mine.pos,
                });
                let owner = mine.owner;
                if tank.take_piercing_damage(tuning.obstacles.mine_damage, owner, tuning) {
                    on_tank_killed(tank.player, owner, tank.pos, tuning, explosions, events);
                }
                continue;
            }

            let exits: Vec<Vec2> = if obstacles[i].kind() == ObstacleKind::Portal {
                obstacles
                    .iter()
                    .enumerate()
                    .filter(|(j, o)| *j != i && o.is_alive() && o.kind() == ObstacleKind::Portal)
                    .map(|(_, o)| o.pos)
                    .collect()
            } else {
                Vec::new()
            };

            match obstacles[i].handle_tank_collision(tank, &exits, rng, tuning) {
                TankContact::Push => tank.apply_collision(push.normal, push.penetration, Vec2::ZERO),
                TankContact::Trapped => {
                    log::debug!("Player {} fell into a pit", tank.player);
                    events.push(GameEvent::Trapped { player: tank.player });
                }
                TankContact::Teleported { to } => {
                    log::debug!("Player {} teleported to ({:.0}, {:.0})", tank.player, to.x, to.y);
                    events.push(GameEvent::Teleported {
                        player: tank.player,
                        to,
                    });
                }
                TankContact::Ignored => {}
            }
        }
    }
}

/// Hull overlaps: push apart, exchange momentum, ram damage by closing speed
pub fn tanks_vs_tanks(world: &mut World, tuning: &Tuning, events: &mut Vec<GameEvent>) {
    let World { tanks, explosions, .. } = world;
    let restitution = tuning.collision.restitution;

    for i in 0..tanks.len() {
        let (head, tail) = tanks.split_at_mut(i + 1);
        let a = &mut head[i];
        for b in tail.iter_mut() {
            if !a.is_alive() || !b.is_alive() {
                continue;
            }
            let overlap = obb_overlap(&a.corners(), a.pos, &b.corners(), b.pos);
            if !overlap.hit {
                continue;
            }

            // Normal points from a to b; positive closing means they approach
            let n = overlap.normal;
            let closing = (a.vel - b.vel).dot(n).max(0.0);
            let impulse = n * closing * 0.5 * restitution;
            let push = overlap.penetration * 0.5 + TANK_SEPARATION_SLOP;
            a.apply_collision(-n, push, -impulse);
            b.apply_collision(n, push, impulse);

            events.push(GameEvent::TankCollision {
                a: a.player,
                b: b.player,
                impact_speed: closing,
            });

            let damage = closing * tuning.collision.damage_scale;
            if damage <= 0.0 {
                continue;
            }
            if a.take_damage(damage, b.player, tuning) {
                on_tank_killed(a.player, b.player, a.pos, tuning, explosions, events);
            }
            if b.take_damage(damage, a.player, tuning) {
                on_tank_killed(b.player, a.player, b.pos, tuning, explosions, events);
            }
        }
    }
}

/// Destruction bookkeeping shared by every pass. Self-kills earn nothing.
fn on_tank_killed(
    victim: PlayerId,
    killer: PlayerId,
    pos: Vec2,
    tuning: &Tuning,
    explosions: &mut Vec<Explosion>,
    events: &mut Vec<GameEvent>,
) {
    log::info!("Player {} destroyed by player {}", victim, killer);
    explosions.push(Explosion::large(pos, tuning));
    events.push(GameEvent::TankDestroyed {
        victim,
        killer: Some(killer),
    });
    if killer != victim {
        events.push(GameEvent::KillCredited { killer, victim });
    }
}
