//! AI tank controller
//!
//! Reactive steering with no state machine: each frame sums weighted steering
//! vectors (wander, pickups, hazards, incoming shells, arena edges), turns the
//! result into stick input, and picks a target to aim at and shoot.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::Rng;

use super::obstacle::{Obstacle, ObstacleKind};
use super::shell::Shell;
use super::tank::{Tank, TankInput};
use crate::consts::MIN_DIVISOR;
use crate::tuning::Tuning;
use crate::{Arena, PlayerId, angle_delta, heading};

/// Past this heading error it is quicker to back up
const REVERSE_THRESHOLD: f32 = 0.7 * PI;
const FORWARD_THROTTLE: f32 = 0.8;
const REVERSE_THROTTLE: f32 = 0.5;
/// Heading error that maps to a full turn
const TURN_GAIN_ANGLE: f32 = 0.5;
const TURN_DEADBAND: f32 = 0.1;
/// Desired-direction sums shorter than this mean "stay put"
const STEER_MIN: f32 = 0.05;

const TARGET_SCORE_RANGE: f32 = 600.0;
const TARGET_PROXIMITY_WEIGHT: f32 = 0.6;
const TARGET_DAMAGE_WEIGHT: f32 = 0.4;

const PICKUP_SCORE_RANGE: f32 = 500.0;
const PICKUP_URGENCY_RANGE: f32 = 400.0;
const PICKUP_ARRIVE_DISTANCE: f32 = 10.0;

/// Idle aim point distance ahead of the hull
const IDLE_AIM_DISTANCE: f32 = 200.0;
const IDLE_AIM_TOLERANCE: f32 = 10.0;

/// Everything an AI tank can see this frame
#[derive(Debug, Clone, Copy)]
pub struct Surroundings<'a> {
    pub tanks: &'a [Tank],
    pub shells: &'a [Shell],
    pub obstacles: &'a [Obstacle],
    pub arena: &'a Arena,
}

/// Decision state for one AI-controlled tank slot
#[derive(Debug, Clone)]
pub struct AiController {
    pub player: PlayerId,
    /// Scales throttle and firing range, fixed per instance
    personality: f32,
    wander_target: Option<Vec2>,
    wander_timer: f32,
}

impl AiController {
    pub fn new(player: PlayerId, tuning: &Tuning, rng: &mut impl Rng) -> Self {
        let ai = &tuning.ai;
        let personality = if ai.personality_max > ai.personality_min {
            rng.random_range(ai.personality_min..ai.personality_max)
        } else {
            ai.personality_min
        };
        Self {
            player,
            personality,
            wander_target: None,
            wander_timer: 0.0,
        }
    }

    pub fn personality(&self) -> f32 {
        self.personality
    }

    pub fn wander_target(&self) -> Option<Vec2> {
        self.wander_target
    }

    /// Decide this frame's input for `me`
    pub fn update(
        &mut self,
        dt: f32,
        me: &Tank,
        world: &Surroundings,
        tuning: &Tuning,
        rng: &mut impl Rng,
    ) -> TankInput {
        if !me.is_alive() {
            return TankInput::default();
        }

        let ai = &tuning.ai;
        let desired = self.wander(dt, me, world.arena, tuning, rng) * ai.seek_weight
            + seek_pickup(me, world.obstacles, tuning) * ai.collectible_weight
            + avoid_obstacles(me, world.obstacles, tuning) * ai.obstacle_weight
            + avoid_shells(me, world.shells, tuning) * ai.shell_weight
            + avoid_edges(me.pos, world.arena, ai.wander_margin);

        let move_dir = self.steer(me, desired);
        let (aim, fire) = self.aim_and_fire(me, world.tanks, tuning);

        TankInput { move_dir, aim, fire }
    }

    /// Seek the wander point, re-picking it on timeout or arrival
    fn wander(&mut self, dt: f32, me: &Tank, arena: &Arena, tuning: &Tuning, rng: &mut impl Rng) -> Vec2 {
        let ai = &tuning.ai;
        self.wander_timer -= dt;

        let arrived = self
            .wander_target
            .is_none_or(|t| t.distance(me.pos) < ai.wander_arrive_distance);
        if self.wander_timer <= 0.0 || arrived {
            self.wander_target = Some(random_point(arena, ai.wander_margin, rng));
            self.wander_timer = ai.wander_interval * rng.random_range(0.8..1.2);
        }

        match self.wander_target {
            Some(target) if target.distance(me.pos) > ai.wander_arrive_distance => {
                (target - me.pos).normalize_or_zero()
            }
            _ => Vec2::ZERO,
        }
    }

    /// Convert a desired direction into move-stick input
    fn steer(&self, me: &Tank, desired: Vec2) -> Vec2 {
        if desired.length() < STEER_MIN {
            return Vec2::ZERO;
        }

        let mut delta = angle_delta(me.angle, heading(desired));
        let throttle = if delta.abs() > REVERSE_THRESHOLD {
            // Point the rear at the goal and back up
            delta -= PI * delta.signum();
            REVERSE_THROTTLE * self.personality
        } else {
            -FORWARD_THROTTLE * self.personality
        };

        let turn = if delta.abs() > TURN_DEADBAND {
            (delta / TURN_GAIN_ANGLE).clamp(-1.0, 1.0)
        } else {
            0.0
        };
        Vec2::new(turn, throttle.clamp(-1.0, 1.0))
    }

    /// Aim-stick input and trigger for this frame
    fn aim_and_fire(&self, me: &Tank, tanks: &[Tank], tuning: &Tuning) -> (Vec2, bool) {
        let ai = &tuning.ai;
        let crosshair = me.crosshair_world();

        let Some(target) = pick_target(me, tanks, tuning) else {
            // Nobody to shoot: keep the crosshair ahead of the hull
            let idle = me.pos + Vec2::from_angle(me.angle) * IDLE_AIM_DISTANCE;
            let diff = idle - crosshair;
            let aim = if diff.length() > IDLE_AIM_TOLERANCE {
                diff.normalize_or_zero() * 0.5
            } else {
                Vec2::ZERO
            };
            return (aim, false);
        };

        // Lead the target by half the shell flight time
        let dist = target.pos.distance(me.pos);
        let flight = dist / tuning.shells.speed.max(MIN_DIVISOR);
        let predicted = target.pos + target.vel * flight * 0.5;

        let diff = predicted - crosshair;
        let error = diff.length();
        let aim = if error > ai.crosshair_tolerance {
            diff.normalize_or_zero()
        } else {
            Vec2::ZERO
        };
        let fire = dist < ai.fire_distance * self.personality && error < ai.fire_tolerance;
        (aim, fire)
    }

    /// Where to drop an obstacle during placement
    pub fn placement_position(arena: &Arena, tuning: &Tuning, rng: &mut impl Rng) -> Vec2 {
        random_point(arena, tuning.ai.placement_margin, rng)
    }

    pub fn placement_angle(rng: &mut impl Rng) -> f32 {
        rng.random_range(0.0..TAU)
    }

    /// Which obstacle to pick from the full menu
    pub fn choose_obstacle(rng: &mut impl Rng) -> ObstacleKind {
        ObstacleKind::ALL[rng.random_range(0..ObstacleKind::ALL.len())]
    }
}

/// Uniform point at least `margin` from every edge, or the center if the
/// arena is too small for that
fn random_point(arena: &Arena, margin: f32, rng: &mut impl Rng) -> Vec2 {
    let x = if arena.width > margin * 2.0 {
        rng.random_range(margin..arena.width - margin)
    } else {
        arena.width * 0.5
    };
    let y = if arena.height > margin * 2.0 {
        rng.random_range(margin..arena.height - margin)
    } else {
        arena.height * 0.5
    };
    Vec2::new(x, y)
}

/// Best enemy by proximity and damage taken
fn pick_target<'a>(me: &Tank, tanks: &'a [Tank], tuning: &Tuning) -> Option<&'a Tank> {
    tanks
        .iter()
        .filter(|t| t.player != me.player && t.is_alive())
        .map(|t| {
            let proximity = 1.0 - (t.pos.distance(me.pos) / TARGET_SCORE_RANGE).min(1.0);
            let score = proximity * TARGET_PROXIMITY_WEIGHT + t.damage_fraction(tuning) * TARGET_DAMAGE_WEIGHT;
            (t, score)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(t, _)| t)
}

/// Pull toward the most valuable nearby pickup
fn seek_pickup(me: &Tank, obstacles: &[Obstacle], tuning: &Tuning) -> Vec2 {
    let best = obstacles
        .iter()
        .filter(|o| o.is_alive())
        .filter_map(|o| {
            let value = match o.kind() {
                ObstacleKind::Flag => 1.2,
                ObstacleKind::HealthPack if me.damage_fraction(tuning) > 0.0 => 1.0,
                ObstacleKind::Powerup => 1.0,
                _ => return None,
            };
            let dist = o.pos.distance(me.pos);
            let score = value * (1.0 - (dist / PICKUP_SCORE_RANGE).min(1.0));
            Some((o.pos, dist, score))
        })
        .max_by(|a, b| a.2.total_cmp(&b.2));

    match best {
        Some((pos, dist, _)) if dist > PICKUP_ARRIVE_DISTANCE => {
            let urgency = (1.0 - dist / PICKUP_URGENCY_RANGE).max(0.0);
            (pos - me.pos).normalize_or_zero() * (0.5 + urgency * 0.5)
        }
        _ => Vec2::ZERO,
    }
}

/// Repulsion from hazards, stronger the closer they are
fn avoid_obstacles(me: &Tank, obstacles: &[Obstacle], tuning: &Tuning) -> Vec2 {
    let ai = &tuning.ai;
    obstacles
        .iter()
        .filter(|o| o.is_alive())
        .filter_map(|o| {
            let danger = match o.kind() {
                ObstacleKind::Mine => ai.mine_danger_radius,
                ObstacleKind::AutoTurret if o.owner != me.player => ai.turret_danger_radius,
                ObstacleKind::AutoTurret => ai.obstacle_danger_radius,
                ObstacleKind::Portal
                | ObstacleKind::Flag
                | ObstacleKind::HealthPack
                | ObstacleKind::Powerup
                | ObstacleKind::Fan => return None,
                _ => ai.obstacle_danger_radius,
            };
            let away = me.pos - o.pos;
            let dist = away.length();
            (dist < danger).then(|| away.normalize_or_zero() * (1.0 - dist / danger.max(MIN_DIVISOR)))
        })
        .sum()
}

/// Sidestep enemy shells heading our way
fn avoid_shells(me: &Tank, shells: &[Shell], tuning: &Tuning) -> Vec2 {
    let detect = tuning.ai.shell_detect_radius;
    shells
        .iter()
        .filter(|s| s.is_alive() && s.owner != me.player)
        .filter_map(|s| {
            let to_me = me.pos - s.pos;
            let dist = to_me.length();
            let dir = s.vel.normalize_or_zero();
            if dist >= detect || dir.dot(to_me) <= 0.0 {
                return None;
            }
            // Step off the shell's line on whichever side we're already on
            let side = dir.perp();
            let side = if side.dot(to_me) >= 0.0 { side } else { -side };
            Some(side * (1.0 - dist / detect.max(MIN_DIVISOR)) * 2.0)
        })
        .sum()
}

/// Push back toward the middle when within `margin` of an edge
fn avoid_edges(pos: Vec2, arena: &Arena, margin: f32) -> Vec2 {
    let margin = margin.max(MIN_DIVISOR);
    let mut push = Vec2::ZERO;
    if pos.x < margin {
        push.x += (margin - pos.x) / margin;
    } else if pos.x > arena.width - margin {
        push.x -= (pos.x - (arena.width - margin)) / margin;
    }
    if pos.y < margin {
        push.y += (margin - pos.y) / margin;
    } else if pos.y > arena.height - margin {
        push.y -= (pos.y - (arena.height - margin)) / margin;
    }
    push
}
