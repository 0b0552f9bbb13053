//! Game balance tunables
//!
//! Every numeric constant the simulation reads lives here. The host may swap
//! in a freshly loaded `Tuning` between frames; the simulation reads values
//! per use through the reference it's handed and never caches them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::MIN_DIVISOR;

/// Tank movement and health
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TankTuning {
    /// Maximum forward speed
    pub max_speed: f32,
    /// Maximum reverse speed
    pub reverse_speed: f32,
    /// Seconds to reach full speed from rest
    pub accel_time: f32,
    /// Seconds to stop from full speed when pushing the other way
    pub brake_time: f32,
    /// Seconds to roll to a stop from full speed with no input
    pub coast_stop_time: f32,
    /// Body rotation at full turn input (rad/s)
    pub rotate_speed: f32,
    /// Rotation multiplier at full speed (lerped from 1.0 at rest)
    pub rotate_while_moving: f32,
    /// Speed/turn reduction at 0% health
    pub damage_penalty_max: f32,
    /// Seconds of destruction sequence before the wreck disappears
    pub destroy_duration: f32,
    /// Per-frame velocity decay while destroying
    pub destroy_velocity_decay: f32,
    pub max_health: f32,
    /// Stick deflection below which an axis counts as released
    pub input_deadzone: f32,
}

impl Default for TankTuning {
    fn default() -> Self {
        Self {
            max_speed: 25.0,
            reverse_speed: 15.0,
            accel_time: 1.5,
            brake_time: 0.5,
            coast_stop_time: 2.0,
            rotate_speed: 2.5,
            rotate_while_moving: 0.7,
            damage_penalty_max: 0.3,
            destroy_duration: 2.0,
            destroy_velocity_decay: 0.95,
            max_health: 500.0,
            input_deadzone: 0.1,
        }
    }
}

/// Tank turret aiming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TurretTuning {
    /// Radians per second
    pub rotation_speed: f32,
    /// Max bearing error allowed to fire (radians)
    pub on_target_tolerance: f32,
}

impl Default for TurretTuning {
    fn default() -> Self {
        Self {
            rotation_speed: 3.0,
            on_target_tolerance: 0.05,
        }
    }
}

/// Shells fired by tanks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShellTuning {
    /// Seconds between shots
    pub fire_interval: f32,
    pub speed: f32,
    pub radius: f32,
    pub damage: f32,
    pub max_range: f32,
    /// Reflections allowed before a reflective wall absorbs the shell
    pub max_bounces: u32,
    /// Distance a reflected shell is pushed off the wall
    pub bounce_nudge: f32,
    /// Ricochet burst: range fraction inherited by each fragment
    pub ricochet_range_factor: f32,
    /// Ricochet burst: damage fraction inherited by each fragment
    pub ricochet_damage_factor: f32,
    /// Ricochet burst: angular offsets around the mirrored direction
    pub ricochet_spread: Vec<f32>,
}

impl Default for ShellTuning {
    fn default() -> Self {
        Self {
            fire_interval: 7.0,
            speed: 400.0,
            radius: 4.0,
            damage: 50.0,
            max_range: 400.0,
            max_bounces: 3,
            bounce_nudge: 2.0,
            ricochet_range_factor: 0.5,
            ricochet_damage_factor: 0.4,
            ricochet_spread: vec![-0.3, -0.15, 0.0, 0.15, 0.3],
        }
    }
}

/// Crosshair movement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrosshairTuning {
    pub speed: f32,
    pub start_distance: f32,
    pub max_distance: f32,
    /// Keep-out band along the arena edges
    pub edge_margin: f32,
}

impl Default for CrosshairTuning {
    fn default() -> Self {
        Self {
            speed: 200.0,
            start_distance: 150.0,
            max_distance: 500.0,
            edge_margin: 10.0,
        }
    }
}

/// Placeable obstacles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObstacleTuning {
    pub wall_length: f32,
    pub wall_thickness: f32,
    pub breakable_wall_health: f32,

    pub mine_radius: f32,
    /// Seconds after placement before a mine can detonate
    pub mine_arm_time: f32,
    pub mine_damage: f32,

    pub turret_radius: f32,
    pub turret_health: f32,
    pub turret_fire_interval: f32,
    pub turret_range: f32,
    pub turret_rotation_speed: f32,
    pub turret_damage: f32,
    /// Turret shell speed as a fraction of tank shell speed
    pub turret_shell_speed_factor: f32,
    pub turret_aim_tolerance: f32,

    pub pit_radius: f32,
    pub pit_trap_duration: f32,
    pub portal_radius: f32,
    /// Immunity to pits/portals after a trap ends or a teleport
    pub portal_cooldown: f32,

    pub flag_radius: f32,
    pub flag_points: i32,
    pub health_pack_radius: f32,
    /// Fraction of max health restored by a health pack
    pub health_pack_heal: f32,

    pub electromagnet_radius: f32,
    pub electromagnet_range: f32,
    pub electromagnet_force: f32,
    /// Magnets pull shells this many times harder than tanks
    pub electromagnet_shell_factor: f32,
    /// Mean on/off period; each magnet jitters its own
    pub electromagnet_duty_cycle: f32,

    pub fan_radius: f32,
    pub fan_range: f32,
    /// Width of the wind cone at full range
    pub fan_width: f32,
    pub fan_force: f32,
    pub fan_shell_factor: f32,

    /// Placement keep-out band along the arena edges
    pub placement_edge_margin: f32,
    /// Minimum center distance between two obstacles
    pub placement_min_spacing: f32,
    /// Minimum center distance from any live tank
    pub placement_tank_clearance: f32,
}

impl Default for ObstacleTuning {
    fn default() -> Self {
        Self {
            wall_length: 100.0,
            wall_thickness: 20.0,
            breakable_wall_health: 50.0,
            mine_radius: 15.0,
            mine_arm_time: 2.0,
            mine_damage: 500.0,
            turret_radius: 15.0,
            turret_health: 400.0,
            turret_fire_interval: 2.0,
            turret_range: 300.0,
            turret_rotation_speed: 2.0,
            turret_damage: 10.0,
            turret_shell_speed_factor: 0.7,
            turret_aim_tolerance: 0.1,
            pit_radius: 25.0,
            pit_trap_duration: 15.0,
            portal_radius: 20.0,
            portal_cooldown: 10.0,
            flag_radius: 12.0,
            flag_points: 5,
            health_pack_radius: 15.0,
            health_pack_heal: 0.5,
            electromagnet_radius: 30.0,
            electromagnet_range: 800.0,
            electromagnet_force: 100.0,
            electromagnet_shell_factor: 3.0,
            electromagnet_duty_cycle: 10.0,
            fan_radius: 20.0,
            fan_range: 300.0,
            fan_width: 100.0,
            fan_force: 150.0,
            fan_shell_factor: 3.0,
            placement_edge_margin: 20.0,
            placement_min_spacing: 50.0,
            placement_tank_clearance: 80.0,
        }
    }
}

/// Speed / damage / armor pickups
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PowerupTuning {
    pub radius: f32,
    pub duration: f32,
    /// +50% max speed
    pub speed_bonus: f32,
    /// +50% outgoing shell damage
    pub damage_bonus: f32,
    /// -50% incoming damage
    pub armor_bonus: f32,
}

impl Default for PowerupTuning {
    fn default() -> Self {
        Self {
            radius: 15.0,
            duration: 30.0,
            speed_bonus: 0.5,
            damage_bonus: 0.5,
            armor_bonus: 0.5,
        }
    }
}

/// Tank collisions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollisionTuning {
    pub restitution: f32,
    /// Ramming damage per unit of closing speed
    pub damage_scale: f32,
    /// Velocity kept (and reflected) when a tank hits the arena edge
    pub wall_bounce: f32,
}

impl Default for CollisionTuning {
    fn default() -> Self {
        Self {
            restitution: 0.3,
            damage_scale: 2.0,
            wall_bounce: 0.2,
        }
    }
}

/// Cosmetic trails and explosions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectTuning {
    pub smoke_fade_time_min: f32,
    pub smoke_fade_time_max: f32,
    pub smoke_spawn_interval: f32,
    pub smoke_damage_multiplier: f32,
    pub smoke_base_radius: f32,
    pub smoke_base_alpha: f32,
    /// Tanks start smoking above this damage fraction
    pub smoke_damage_threshold: f32,
    pub track_mark_fade_time: f32,
    pub track_mark_spawn_distance: f32,
    pub explosion_duration: f32,
    pub explosion_max_radius: f32,
    pub destroy_explosion_duration: f32,
    pub destroy_explosion_max_radius: f32,
}

impl Default for EffectTuning {
    fn default() -> Self {
        Self {
            smoke_fade_time_min: 2.0,
            smoke_fade_time_max: 4.0,
            smoke_spawn_interval: 0.1,
            smoke_damage_multiplier: 3.0,
            smoke_base_radius: 3.0,
            smoke_base_alpha: 0.5,
            smoke_damage_threshold: 0.3,
            track_mark_fade_time: 8.0,
            track_mark_spawn_distance: 3.0,
            explosion_duration: 0.4,
            explosion_max_radius: 40.0,
            destroy_explosion_duration: 0.8,
            destroy_explosion_max_radius: 60.0,
        }
    }
}

/// AI steering and gunnery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AiTuning {
    pub wander_interval: f32,
    /// Wander targets and edge repulsion stay this far from the edges
    pub wander_margin: f32,
    /// Distance at which the wander target counts as reached
    pub wander_arrive_distance: f32,
    pub fire_distance: f32,
    /// Crosshair error below which the AI stops steering its aim
    pub crosshair_tolerance: f32,
    /// Crosshair error below which the AI pulls the trigger
    pub fire_tolerance: f32,
    pub placement_margin: f32,
    /// Random placement tries before giving up on a slot
    pub placement_attempts: u32,
    pub personality_min: f32,
    pub personality_max: f32,
    pub shell_detect_radius: f32,
    pub obstacle_danger_radius: f32,
    pub mine_danger_radius: f32,
    /// Turrets get a wider berth than their range
    pub turret_danger_radius: f32,
    pub seek_weight: f32,
    pub collectible_weight: f32,
    pub obstacle_weight: f32,
    pub shell_weight: f32,
}

impl Default for AiTuning {
    fn default() -> Self {
        Self {
            wander_interval: 2.0,
            wander_margin: 100.0,
            wander_arrive_distance: 20.0,
            fire_distance: 350.0,
            crosshair_tolerance: 20.0,
            fire_tolerance: 40.0,
            placement_margin: 150.0,
            placement_attempts: 10,
            personality_min: 0.9,
            personality_max: 1.1,
            shell_detect_radius: 200.0,
            obstacle_danger_radius: 100.0,
            mine_danger_radius: 80.0,
            turret_danger_radius: 350.0,
            seek_weight: 1.0,
            collectible_weight: 2.5,
            obstacle_weight: 2.0,
            shell_weight: 3.0,
        }
    }
}

/// Round structure and scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowTuning {
    /// Rounds in a match
    pub rounds_to_win: u32,
    /// Seconds after round start before humans may fire
    pub round_start_delay: f32,
    pub round_over_delay: f32,
    pub points_for_surviving: i32,
    pub points_for_kill: i32,
    /// Round ends in a draw if nobody takes damage for this long
    pub stalemate_timeout: f32,
    /// Spawn corners sit this far in from the edges
    pub spawn_margin: f32,
}

impl Default for FlowTuning {
    fn default() -> Self {
        Self {
            rounds_to_win: 10,
            round_start_delay: 0.5,
            round_over_delay: 3.0,
            points_for_surviving: 1,
            points_for_kill: 1,
            stalemate_timeout: 60.0,
            spawn_margin: 100.0,
        }
    }
}

/// Complete tunable snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tuning {
    pub tank: TankTuning,
    pub turret: TurretTuning,
    pub shells: ShellTuning,
    pub crosshair: CrosshairTuning,
    pub obstacles: ObstacleTuning,
    pub powerups: PowerupTuning,
    pub collision: CollisionTuning,
    pub effects: EffectTuning,
    pub ai: AiTuning,
    pub flow: FlowTuning,
}

impl Tuning {
    /// Parse a (possibly partial) tuning document. Missing sections and
    /// fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let tuning: Tuning = serde_json::from_str(json)?;
        Ok(tuning.sanitized())
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from a JSON file, falling back to defaults on any failure
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json_str(&json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from {}", path.display());
                    tuning
                }
                Err(e) => {
                    log::warn!("Bad tuning file {}: {e}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Can't read tuning file {}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Clamp every value the simulation divides by to a small positive
    /// number, and order min/max pairs.
    pub fn sanitized(mut self) -> Self {
        fn pos(v: &mut f32) {
            if !v.is_finite() || *v < MIN_DIVISOR {
                *v = MIN_DIVISOR;
            }
        }

        pos(&mut self.tank.max_speed);
        pos(&mut self.tank.accel_time);
        pos(&mut self.tank.brake_time);
        pos(&mut self.tank.coast_stop_time);
        pos(&mut self.tank.destroy_duration);
        pos(&mut self.tank.max_health);
        pos(&mut self.shells.fire_interval);
        pos(&mut self.shells.speed);
        pos(&mut self.shells.max_range);
        pos(&mut self.obstacles.mine_arm_time);
        pos(&mut self.obstacles.breakable_wall_health);
        pos(&mut self.obstacles.turret_health);
        pos(&mut self.obstacles.turret_fire_interval);
        pos(&mut self.obstacles.electromagnet_range);
        pos(&mut self.obstacles.electromagnet_duty_cycle);
        pos(&mut self.obstacles.fan_range);
        pos(&mut self.effects.smoke_spawn_interval);
        pos(&mut self.effects.smoke_fade_time_min);
        pos(&mut self.effects.track_mark_fade_time);
        pos(&mut self.effects.explosion_duration);
        pos(&mut self.effects.destroy_explosion_duration);
        pos(&mut self.ai.shell_detect_radius);
        pos(&mut self.ai.obstacle_danger_radius);
        pos(&mut self.ai.mine_danger_radius);
        pos(&mut self.ai.turret_danger_radius);
        pos(&mut self.ai.wander_margin);

        if self.effects.smoke_fade_time_max < self.effects.smoke_fade_time_min {
            self.effects.smoke_fade_time_max = self.effects.smoke_fade_time_min;
        }
        if self.ai.personality_max < self.ai.personality_min {
            std::mem::swap(&mut self.ai.personality_min, &mut self.ai.personality_max);
        }
        self.tank.damage_penalty_max = self.tank.damage_penalty_max.clamp(0.0, 1.0);
        self.tank.rotate_while_moving = self.tank.rotate_while_moving.clamp(0.0, 1.0);
        self
    }

    /// Acceleration toward a higher target speed
    pub fn accel_rate(&self) -> f32 {
        self.tank.max_speed / self.tank.accel_time.max(MIN_DIVISOR)
    }

    /// Deceleration when input opposes the current motion
    pub fn brake_rate(&self) -> f32 {
        self.tank.max_speed / self.tank.brake_time.max(MIN_DIVISOR)
    }

    /// Deceleration with no input
    pub fn coast_rate(&self) -> f32 {
        self.tank.max_speed / self.tank.coast_stop_time.max(MIN_DIVISOR)
    }
}
