//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep, clamped
//! - One seeded RNG owned by the world
//! - Stable iteration order (by slot, then insertion)
//! - No rendering or platform dependencies

pub mod ai;
pub mod geometry;
pub mod obstacle;
pub mod resolve;
pub mod shell;
pub mod state;
pub mod tank;
pub mod tick;

pub use ai::{AiController, Surroundings};
pub use geometry::CollisionResult;
pub use obstacle::{
    Appearance, CollectionEffect, Obstacle, ObstacleKind, Preview, Shape, ShellHit, TankContact,
};
pub use shell::Shell;
pub use state::{Controller, Explosion, GameEvent, RoundPhase, World};
pub use tank::{PowerupKind, Tank, TankInput};
pub use tick::tick;
