//! Shell ballistics
//!
//! Shells fly straight unless a field pushes them, keep their previous position
//! for swept collision tests, and die once they exhaust their range.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::reflect_velocity;
use crate::tuning::Tuning;
use crate::{Arena, PlayerId, heading};

/// Ricochet fragments spawn this far off the wall along its normal
const RICOCHET_SPAWN_OFFSET: f32 = 5.0;

/// A projectile fired by a tank or an auto-turret
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shell {
    pub pos: Vec2,
    /// Position at the start of the last update (swept collision)
    pub prev_pos: Vec2,
    pub vel: Vec2,
    /// Player credited with damage this shell does
    pub owner: PlayerId,
    pub damage: f32,
    pub max_range: f32,
    /// Distance covered since spawn or the last bounce
    pub traveled: f32,
    pub bounces: u32,
    pub radius: f32,
    alive: bool,
}

impl Shell {
    pub fn new(pos: Vec2, vel: Vec2, owner: PlayerId, max_range: f32, damage: f32, radius: f32) -> Self {
        Self {
            pos,
            prev_pos: pos,
            vel,
            owner,
            damage,
            max_range,
            traveled: 0.0,
            bounces: 0,
            radius,
            alive: true,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn kill(&mut self) {
        self.alive = false;
    }

    /// Advance one step. Dies on range exhaustion or leaving the arena.
    pub fn update(&mut self, dt: f32, arena: &Arena) {
        if !self.alive {
            return;
        }
        self.prev_pos = self.pos;
        let step = self.vel * dt;
        self.pos += step;
        self.traveled += step.length();

        if self.traveled >= self.max_range || !arena.contains(self.pos) {
            self.alive = false;
        }
    }

    /// Additive field force (electromagnet pull, fan push)
    pub fn apply_force(&mut self, force: Vec2, dt: f32) {
        self.vel += force * dt;
    }

    /// Whether a reflective wall may bounce this shell again
    pub fn can_reflect(&self, max_bounces: u32) -> bool {
        self.bounces < max_bounces
    }

    /// Bounce off a surface at `point`. Restarts just off the wall and with a
    /// fresh range budget.
    pub fn reflect(&mut self, point: Vec2, normal: Vec2, nudge: f32) {
        self.vel = reflect_velocity(self.vel, normal);
        self.bounces += 1;
        self.pos = point + normal * nudge;
        self.prev_pos = self.pos;
        self.traveled = 0.0;
    }

    /// Fragments of a ricochet burst at `point`, fanned around the mirrored
    /// direction. The caller kills the original.
    pub fn ricochet_fragments(&self, point: Vec2, normal: Vec2, tuning: &Tuning) -> Vec<Shell> {
        let speed = self.vel.length();
        let base = heading(reflect_velocity(self.vel, normal));
        let spawn = point + normal * RICOCHET_SPAWN_OFFSET;
        let range = self.max_range * tuning.shells.ricochet_range_factor;
        let damage = self.damage * tuning.shells.ricochet_damage_factor;

        tuning
            .shells
            .ricochet_spread
            .iter()
            .map(|offset| {
                let vel = Vec2::from_angle(base + offset) * speed;
                Shell::new(spawn, vel, self.owner, range, damage, self.radius)
            })
            .collect()
    }
}
