//! Tank Arena - simulation core for a four-player top-down tank game
//!
//! Core modules:
//! - `sim`: Per-frame simulation (tanks, shells, obstacles, collisions, AI)
//! - `tuning`: Data-driven game balance, passed into every update
//! - `scoreboard`: Round and match scoring fed by simulation events

pub mod scoreboard;
pub mod sim;
pub mod tuning;

pub use scoreboard::Scoreboard;
pub use tuning::Tuning;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Index of a player slot (0..MAX_TANKS). Tanks, shells and obstacles all
/// refer to their owner by slot.
pub type PlayerId = usize;

/// Game constants that are structural rather than balance knobs
pub mod consts {
    /// Number of tank slots (human or AI)
    pub const MAX_TANKS: usize = 4;
    /// Largest simulation step accepted after a stall
    pub const MAX_FRAME_DT: f32 = 1.0 / 20.0;
    /// Nominal tick for headless runs and tests
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Tank footprint (body is 1.2x long and 0.8x wide of this)
    pub const TANK_SIZE: f32 = 40.0;
    /// Shell-vs-tank hit circle as a fraction of tank size
    pub const TANK_HIT_RADIUS_FACTOR: f32 = 0.6;
    /// Barrel tip distance as a fraction of tank size
    pub const BARREL_LENGTH_FACTOR: f32 = 0.7;

    /// Health sentinel for obstacles that can't be destroyed
    pub const INDESTRUCTIBLE_HEALTH: f32 = 9999.0;
    /// Smallest value any divisor-like tunable is clamped to
    pub const MIN_DIVISOR: f32 = 1.0e-3;
}

/// Wrap an angle to (-π, π]
#[inline]
pub fn wrap_angle(mut angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if !angle.is_finite() {
        return 0.0;
    }
    while angle > PI {
        angle -= TAU;
    }
    while angle <= -PI {
        angle += TAU;
    }
    angle
}

/// Signed shortest rotation from `from` to `to`, in (-π, π]
#[inline]
pub fn angle_delta(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}

/// Rotate `current` toward `target` by at most `max_step`, result wrapped
#[inline]
pub fn rotate_toward(current: f32, target: f32, max_step: f32) -> f32 {
    let delta = angle_delta(current, target);
    if delta.abs() <= max_step {
        wrap_angle(target)
    } else {
        wrap_angle(current + delta.signum() * max_step)
    }
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Heading of a vector in radians
#[inline]
pub fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// The rectangular play field, origin at the top-left corner.
///
/// Width and height may change between frames if the host window resizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Arena {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Whether a point lies inside the arena (edges inclusive)
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.x <= self.width && p.y >= 0.0 && p.y <= self.height
    }

    /// Whether a point lies inside the arena shrunk by `margin` on every side
    pub fn contains_with_margin(&self, p: Vec2, margin: f32) -> bool {
        p.x >= margin && p.x <= self.width - margin && p.y >= margin && p.y <= self.height - margin
    }

    /// Corner spawn point for a slot, `margin` in from the edges
    pub fn spawn_point(&self, slot: usize, margin: f32) -> Vec2 {
        match slot {
            0 => Vec2::new(margin, margin),
            1 => Vec2::new(self.width - margin, margin),
            2 => Vec2::new(margin, self.height - margin),
            3 => Vec2::new(self.width - margin, self.height - margin),
            _ => self.center(),
        }
    }

    /// Spawn heading for a slot, pointing toward the arena center
    pub fn spawn_angle(&self, slot: usize) -> f32 {
        use std::f32::consts::PI;
        match slot {
            0 => PI * 0.25,
            1 => PI * 0.75,
            2 => -PI * 0.25,
            3 => -PI * 0.75,
            _ => 0.0,
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}
