//! Tank entity: throttle model, turret aiming, damage and status effects
//!
//! Controls are twin-stick: the move stick's y axis sets a target speed and
//! its x axis turns the hull, while the aim stick drags a crosshair that the
//! turret tracks at a fixed rate.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::geometry::rect_corners;
use super::shell::Shell;
use crate::consts::{BARREL_LENGTH_FACTOR, MIN_DIVISOR, TANK_HIT_RADIUS_FACTOR, TANK_SIZE};
use crate::tuning::Tuning;
use crate::{Arena, PlayerId, angle_delta, heading, rotate_toward, wrap_angle};

/// Below this speed a tank lays no track marks
const TRACK_MIN_SPEED: f32 = 0.1;

/// Control intent for one tank for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TankInput {
    /// Move stick, each axis in [-1, 1]; y = -1 is full forward
    pub move_dir: Vec2,
    /// Aim stick, each axis in [-1, 1]
    pub aim: Vec2,
    pub fire: bool,
}

/// Timed bonus granted by a powerup pickup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerupKind {
    Speed,
    Damage,
    Armor,
}

impl PowerupKind {
    pub const ALL: [PowerupKind; 3] = [PowerupKind::Speed, PowerupKind::Damage, PowerupKind::Armor];
}

/// Fading tread imprint
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackMark {
    pub pos: Vec2,
    pub angle: f32,
    pub alpha: f32,
}

/// Fading smoke puff from a damaged or burning tank
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SmokePuff {
    pub pos: Vec2,
    pub radius: f32,
    pub alpha: f32,
    pub fade_rate: f32,
}

/// A player's tank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tank {
    pub player: PlayerId,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Hull heading (radians, wrapped)
    pub angle: f32,
    /// Turret angle relative to the hull (radians, wrapped)
    pub turret_angle: f32,
    /// Current throttle in [-1, 1]
    pub throttle: f32,
    /// Footprint size; the hull is 1.2x long and 0.8x wide of this
    pub size: f32,
    health: f32,
    /// Seconds since the last shot, capped at the fire interval
    pub reload_timer: f32,
    /// Aim point relative to the tank
    pub crosshair_offset: Vec2,
    pub trap_timer: f32,
    pub teleport_cooldown: f32,
    pub speed_powerup_timer: f32,
    pub damage_powerup_timer: f32,
    pub armor_powerup_timer: f32,
    destroying: bool,
    destroy_timer: f32,
    /// Who dealt the killing blow
    pub killer: Option<PlayerId>,
    external_force: Vec2,
    pending_shells: Vec<Shell>,
    #[serde(skip)]
    pub track_marks: Vec<TrackMark>,
    #[serde(skip)]
    track_distance: f32,
    #[serde(skip)]
    pub smoke: Vec<SmokePuff>,
    #[serde(skip)]
    smoke_timer: f32,
}

impl Tank {
    pub fn new(player: PlayerId, pos: Vec2, angle: f32, tuning: &Tuning) -> Self {
        let angle = wrap_angle(angle);
        Self {
            player,
            pos,
            vel: Vec2::ZERO,
            angle,
            turret_angle: 0.0,
            throttle: 0.0,
            size: TANK_SIZE,
            health: tuning.tank.max_health,
            // Start loaded
            reload_timer: tuning.shells.fire_interval,
            crosshair_offset: Vec2::from_angle(angle) * tuning.crosshair.start_distance,
            trap_timer: 0.0,
            teleport_cooldown: 0.0,
            speed_powerup_timer: 0.0,
            damage_powerup_timer: 0.0,
            armor_powerup_timer: 0.0,
            destroying: false,
            destroy_timer: 0.0,
            killer: None,
            external_force: Vec2::ZERO,
            pending_shells: Vec::new(),
            track_marks: Vec::new(),
            track_distance: 0.0,
            smoke: Vec::new(),
            smoke_timer: 0.0,
        }
    }

    /// Advance one frame under the given control intent
    pub fn update(&mut self, dt: f32, input: &TankInput, arena: &Arena, tuning: &Tuning, rng: &mut impl Rng) {
        self.health = self.health.clamp(0.0, tuning.tank.max_health);

        if self.destroying {
            self.destroy_timer = (self.destroy_timer + dt).min(tuning.tank.destroy_duration);
            self.vel *= tuning.tank.destroy_velocity_decay;
            self.pos += self.vel * dt;
            self.external_force = Vec2::ZERO;
            self.clamp_to_arena(arena, tuning);
            self.update_track_marks(dt, tuning);
            self.update_smoke(dt, tuning, rng);
            return;
        }

        if self.trap_timer > 0.0 {
            self.trap_timer -= dt;
            // Cooldown starts when the trap releases so the tank can drive out
            if self.trap_timer <= 0.0 {
                self.trap_timer = 0.0;
                self.teleport_cooldown = tuning.obstacles.portal_cooldown;
            }
        }
        tick_down(&mut self.teleport_cooldown, dt);
        tick_down(&mut self.speed_powerup_timer, dt);
        tick_down(&mut self.damage_powerup_timer, dt);
        tick_down(&mut self.armor_powerup_timer, dt);

        self.reload_timer = (self.reload_timer + dt).min(tuning.shells.fire_interval);

        if self.is_trapped() {
            self.vel = Vec2::ZERO;
            self.throttle = 0.0;
            self.external_force = Vec2::ZERO;
            self.update_turret(dt, tuning);
            self.update_track_marks(dt, tuning);
            self.update_smoke(dt, tuning, rng);
            return;
        }

        if input.fire {
            self.fire(tuning);
        }

        self.drive(dt, input, tuning);
        self.pos += self.vel * dt;
        self.clamp_to_arena(arena, tuning);

        if input.aim.length_squared() > 0.01 {
            self.crosshair_offset += input.aim * tuning.crosshair.speed * dt;
        }
        self.clamp_crosshair(arena, tuning);
        self.update_turret(dt, tuning);

        self.update_track_marks(dt, tuning);
        self.update_smoke(dt, tuning, rng);
    }

    /// Throttle, hull rotation and external forces
    fn drive(&mut self, dt: f32, input: &TankInput, tuning: &Tuning) {
        let penalty = self.damage_penalty(tuning);
        let deadzone = tuning.tank.input_deadzone;

        let throttle_input = -input.move_dir.y;
        self.throttle = if throttle_input.abs() > deadzone {
            throttle_input.clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let turn_input = input.move_dir.x.clamp(-1.0, 1.0);
        if turn_input.abs() > deadzone {
            let speed_frac = (self.vel.length() / tuning.tank.max_speed.max(MIN_DIVISOR)).clamp(0.0, 1.0);
            let speed_factor = 1.0 - speed_frac * (1.0 - tuning.tank.rotate_while_moving);
            self.angle += turn_input * tuning.tank.rotate_speed * speed_factor * penalty * dt;
        }
        self.angle = wrap_angle(self.angle);

        let forward = Vec2::from_angle(self.angle);
        let gear_max = if self.throttle >= 0.0 {
            tuning.tank.max_speed
        } else {
            tuning.tank.reverse_speed
        };
        let target = self.throttle * gear_max * penalty * self.speed_multiplier(tuning);
        let current = self.vel.dot(forward);

        let rate = if self.throttle == 0.0 {
            tuning.coast_rate()
        } else if target * current < 0.0 {
            tuning.brake_rate()
        } else {
            tuning.accel_rate()
        };
        let change = rate * dt;
        let speed = if target > current {
            (current + change).min(target)
        } else {
            (current - change).max(target)
        };

        self.vel = forward * speed + self.external_force * dt;
        self.external_force = Vec2::ZERO;
    }

    /// Keep the aim point on screen and within reach
    fn clamp_crosshair(&mut self, arena: &Arena, tuning: &Tuning) {
        let margin = tuning.crosshair.edge_margin;
        let world = self.pos + self.crosshair_offset;
        let clamped = Vec2::new(
            world.x.clamp(margin, (arena.width - margin).max(margin)),
            world.y.clamp(margin, (arena.height - margin).max(margin)),
        );
        self.crosshair_offset = (clamped - self.pos).clamp_length_max(tuning.crosshair.max_distance);
    }

    /// Turret bearing (relative to hull) that points at the crosshair
    fn crosshair_local_angle(&self) -> Option<f32> {
        if self.crosshair_offset.length_squared() < 1.0 {
            return None;
        }
        Some(wrap_angle(heading(self.crosshair_offset) - self.angle))
    }

    fn update_turret(&mut self, dt: f32, tuning: &Tuning) {
        if let Some(target) = self.crosshair_local_angle() {
            self.turret_angle = rotate_toward(self.turret_angle, target, tuning.turret.rotation_speed * dt);
        }
        self.turret_angle = wrap_angle(self.turret_angle);
    }

    /// Whether the turret points at the crosshair within tolerance
    pub fn is_turret_on_target(&self, tuning: &Tuning) -> bool {
        match self.crosshair_local_angle() {
            Some(target) => angle_delta(self.turret_angle, target).abs() <= tuning.turret.on_target_tolerance,
            None => true,
        }
    }

    pub fn is_ready_to_fire(&self, tuning: &Tuning) -> bool {
        self.is_alive() && self.reload_timer >= tuning.shells.fire_interval && self.is_turret_on_target(tuning)
    }

    /// Queue a shell at the barrel tip if reloaded and on target
    pub fn fire(&mut self, tuning: &Tuning) -> bool {
        if !self.is_ready_to_fire(tuning) {
            return false;
        }
        let dir = Vec2::from_angle(self.angle + self.turret_angle);
        let muzzle = self.pos + dir * self.size * BARREL_LENGTH_FACTOR;
        self.pending_shells.push(Shell::new(
            muzzle,
            dir * tuning.shells.speed,
            self.player,
            tuning.shells.max_range,
            tuning.shells.damage * self.damage_multiplier(tuning),
            tuning.shells.radius,
        ));
        self.reload_timer = 0.0;
        true
    }

    /// Hand over shells fired this frame
    pub fn take_pending_shells(&mut self) -> Vec<Shell> {
        std::mem::take(&mut self.pending_shells)
    }

    /// Push corners back inside the arena and bounce off the edge
    pub fn clamp_to_arena(&mut self, arena: &Arena, tuning: &Tuning) {
        let bounce = tuning.collision.wall_bounce;
        let (mut left, mut right, mut up, mut down) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
        for c in self.corners() {
            left = left.max(-c.x);
            right = right.max(c.x - arena.width);
            up = up.max(-c.y);
            down = down.max(c.y - arena.height);
        }

        if left > 0.0 {
            self.pos.x += left;
            self.vel.x = self.vel.x.abs() * bounce;
        } else if right > 0.0 {
            self.pos.x -= right;
            self.vel.x = -self.vel.x.abs() * bounce;
        }
        if up > 0.0 {
            self.pos.y += up;
            self.vel.y = self.vel.y.abs() * bounce;
        } else if down > 0.0 {
            self.pos.y -= down;
            self.vel.y = -self.vel.y.abs() * bounce;
        }
    }

    /// Apply damage from `attacker`, reduced by armor. Returns true only on
    /// the hit that destroys the tank.
    pub fn take_damage(&mut self, amount: f32, attacker: PlayerId, tuning: &Tuning) -> bool {
        let reduced = amount.max(0.0) * self.armor_multiplier(tuning);
        self.apply_damage(reduced, attacker, tuning)
    }

    /// Damage that ignores armor (mine blasts)
    pub fn take_piercing_damage(&mut self, amount: f32, attacker: PlayerId, tuning: &Tuning) -> bool {
        self.apply_damage(amount.max(0.0), attacker, tuning)
    }

    fn apply_damage(&mut self, amount: f32, attacker: PlayerId, tuning: &Tuning) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.health = (self.health - amount).clamp(0.0, tuning.tank.max_health);
        if self.health <= 0.0 {
            self.destroying = true;
            self.destroy_timer = 0.0;
            self.killer = Some(attacker);
            return true;
        }
        false
    }

    /// Restore a fraction of max health
    pub fn heal(&mut self, fraction: f32, tuning: &Tuning) {
        if !self.is_alive() {
            return;
        }
        let max = tuning.tank.max_health;
        self.health = (self.health + max * fraction.max(0.0)).min(max);
    }

    pub fn apply_collision(&mut self, push_dir: Vec2, push_dist: f32, impulse: Vec2) {
        self.pos += push_dir * push_dist;
        self.vel += impulse;
    }

    /// Accumulate a field force, applied on the next update
    pub fn apply_external_force(&mut self, force: Vec2) {
        self.external_force += force;
    }

    /// Trap in a pit unless already trapped or cooldown-protected
    pub fn trap_in_pit(&mut self, tuning: &Tuning) -> bool {
        if self.is_trapped() || !self.can_use_teleporter() {
            return false;
        }
        self.trap_timer = tuning.obstacles.pit_trap_duration;
        self.vel = Vec2::ZERO;
        self.throttle = 0.0;
        self.teleport_cooldown = tuning.obstacles.portal_cooldown;
        true
    }

    pub fn teleport_to(&mut self, pos: Vec2, tuning: &Tuning) {
        self.pos = pos;
        self.vel = Vec2::ZERO;
        self.teleport_cooldown = tuning.obstacles.portal_cooldown;
    }

    pub fn apply_powerup(&mut self, kind: PowerupKind, tuning: &Tuning) {
        let duration = tuning.powerups.duration;
        match kind {
            PowerupKind::Speed => self.speed_powerup_timer = duration,
            PowerupKind::Damage => self.damage_powerup_timer = duration,
            PowerupKind::Armor => self.armor_powerup_timer = duration,
        }
    }

    /// Mouse-style aiming: put the crosshair on a world point, within reach
    pub fn set_crosshair_position(&mut self, world: Vec2, tuning: &Tuning) {
        self.crosshair_offset = (world - self.pos).clamp_length_max(tuning.crosshair.max_distance);
    }

    fn update_track_marks(&mut self, dt: f32, tuning: &Tuning) {
        let fade = dt / tuning.effects.track_mark_fade_time.max(MIN_DIVISOR);
        self.track_marks.retain_mut(|m| {
            m.alpha -= fade;
            m.alpha > 0.0
        });

        let speed = self.vel.length();
        if self.is_alive() && speed > TRACK_MIN_SPEED {
            self.track_distance += speed * dt;
            if self.track_distance >= tuning.effects.track_mark_spawn_distance {
                self.track_distance = 0.0;
                self.track_marks.push(TrackMark {
                    pos: self.pos,
                    angle: self.angle,
                    alpha: 1.0,
                });
            }
        }
    }

    fn update_smoke(&mut self, dt: f32, tuning: &Tuning, rng: &mut impl Rng) {
        self.smoke.retain_mut(|p| {
            p.alpha -= p.fade_rate * dt;
            p.alpha > 0.0
        });

        let fx = &tuning.effects;
        let damage = self.damage_fraction(tuning);
        let fade_out = if self.destroying {
            1.0 - self.destroy_progress(tuning)
        } else {
            1.0
        };
        if fade_out <= 0.0 || !(self.destroying || damage > fx.smoke_damage_threshold) {
            return;
        }

        self.smoke_timer += dt;
        let interval = (fx.smoke_spawn_interval / ((1.0 + damage * fx.smoke_damage_multiplier) * fade_out))
            .max(MIN_DIVISOR);
        while self.smoke_timer >= interval {
            self.smoke_timer -= interval;
            let jitter = Vec2::new(rng.random_range(-0.5..0.5), rng.random_range(-0.5..0.5)) * self.size * 0.6;
            let shortest = fx.smoke_fade_time_min;
            let lifetime = rng.random_range(shortest..=fx.smoke_fade_time_max.max(shortest));
            self.smoke.push(SmokePuff {
                pos: self.pos + jitter,
                radius: fx.smoke_base_radius + damage * 3.0 + rng.random::<f32>() * 2.0,
                alpha: (fx.smoke_base_alpha + damage * 0.4) * fade_out,
                fade_rate: 1.0 / lifetime.max(MIN_DIVISOR),
            });
        }
    }

    fn damage_penalty(&self, tuning: &Tuning) -> f32 {
        1.0 - self.damage_fraction(tuning) * tuning.tank.damage_penalty_max
    }

    pub fn speed_multiplier(&self, tuning: &Tuning) -> f32 {
        if self.speed_powerup_timer > 0.0 {
            1.0 + tuning.powerups.speed_bonus
        } else {
            1.0
        }
    }

    pub fn damage_multiplier(&self, tuning: &Tuning) -> f32 {
        if self.damage_powerup_timer > 0.0 {
            1.0 + tuning.powerups.damage_bonus
        } else {
            1.0
        }
    }

    pub fn armor_multiplier(&self, tuning: &Tuning) -> f32 {
        if self.armor_powerup_timer > 0.0 {
            (1.0 - tuning.powerups.armor_bonus).max(0.0)
        } else {
            1.0
        }
    }

    // --- Queries ---

    pub fn health(&self) -> f32 {
        self.health
    }

    /// Alive and not yet in the destruction sequence
    pub fn is_alive(&self) -> bool {
        !self.destroying && self.health > 0.0
    }

    pub fn is_destroying(&self) -> bool {
        self.destroying
    }

    /// Still on the field (alive or mid-destruction)
    pub fn is_visible(&self, tuning: &Tuning) -> bool {
        !self.destroying || self.destroy_timer < tuning.tank.destroy_duration
    }

    pub fn is_trapped(&self) -> bool {
        self.trap_timer > 0.0
    }

    pub fn can_use_teleporter(&self) -> bool {
        self.teleport_cooldown <= 0.0
    }

    /// 0 at full health, 1 when dead
    pub fn damage_fraction(&self, tuning: &Tuning) -> f32 {
        (1.0 - self.health / tuning.tank.max_health.max(MIN_DIVISOR)).clamp(0.0, 1.0)
    }

    pub fn reload_progress(&self, tuning: &Tuning) -> f32 {
        (self.reload_timer / tuning.shells.fire_interval.max(MIN_DIVISOR)).clamp(0.0, 1.0)
    }

    pub fn destroy_progress(&self, tuning: &Tuning) -> f32 {
        (self.destroy_timer / tuning.tank.destroy_duration.max(MIN_DIVISOR)).clamp(0.0, 1.0)
    }

    pub fn crosshair_world(&self) -> Vec2 {
        self.pos + self.crosshair_offset
    }

    /// Turret direction in world space
    pub fn turret_world_angle(&self) -> f32 {
        wrap_angle(self.angle + self.turret_angle)
    }

    /// Hull corners in world space
    pub fn corners(&self) -> [Vec2; 4] {
        let half = self.size * 0.5;
        rect_corners(self.pos, self.angle, half * 1.2, half * 0.8)
    }

    /// Radius used for shell hits
    pub fn hit_radius(&self) -> f32 {
        self.size * TANK_HIT_RADIUS_FACTOR
    }

    /// Radius used against circular obstacles
    pub fn body_radius(&self) -> f32 {
        self.size * 0.4
    }
}

fn tick_down(timer: &mut f32, dt: f32) {
    if *timer > 0.0 {
        *timer = (*timer - dt).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::f32::consts::PI;

    fn setup() -> (Tank, Arena, Tuning, Pcg32) {
        let arena = Arena::new(1280.0, 720.0);
        let tuning = Tuning::default();
        let tank = Tank::new(0, arena.center(), 0.0, &tuning);
        (tank, arena, tuning, Pcg32::seed_from_u64(7))
    }

    fn forward_input() -> TankInput {
        TankInput {
            move_dir: Vec2::new(0.0, -1.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_full_throttle_reaches_max_speed() {
        let (mut tank, arena, tuning, mut rng) = setup();
        let steps = (tuning.tank.accel_time / SIM_DT).round() as usize;
        for _ in 0..steps {
            tank.update(SIM_DT, &forward_input(), &arena, &tuning, &mut rng);
        }
        let forward_speed = tank.vel.dot(Vec2::from_angle(tank.angle));
        assert!((forward_speed - tuning.tank.max_speed).abs() < tuning.tank.max_speed * 0.03);
        assert!(tank.pos.x > arena.center().x);
    }

    #[test]
    fn test_coasting_keeps_momentum() {
        let (mut tank, arena, tuning, mut rng) = setup();
        for _ in 0..120 {
            tank.update(SIM_DT, &forward_input(), &arena, &tuning, &mut rng);
        }
        tank.update(SIM_DT, &TankInput::default(), &arena, &tuning, &mut rng);
        assert!(tank.vel.length() > tuning.tank.max_speed * 0.9);

        // Coasting to a stop takes about coast_stop_time
        let steps = (tuning.tank.coast_stop_time / SIM_DT).ceil() as usize + 1;
        for _ in 0..steps {
            tank.update(SIM_DT, &TankInput::default(), &arena, &tuning, &mut rng);
        }
        assert!(tank.vel.length() < 1e-3);
    }

    #[test]
    fn test_braking_is_faster_than_coasting() {
        let (mut a, arena, tuning, mut rng) = setup();
        for _ in 0..120 {
            a.update(SIM_DT, &forward_input(), &arena, &tuning, &mut rng);
        }
        let mut b = a.clone();
        let reverse = TankInput {
            move_dir: Vec2::new(0.0, 1.0),
            ..Default::default()
        };
        for _ in 0..10 {
            a.update(SIM_DT, &TankInput::default(), &arena, &tuning, &mut rng);
            b.update(SIM_DT, &reverse, &arena, &tuning, &mut rng);
        }
        let fwd = Vec2::from_angle(a.angle);
        assert!(b.vel.dot(fwd) < a.vel.dot(fwd));
    }

    #[test]
    fn test_turning_slower_at_speed() {
        let (mut still, arena, tuning, mut rng) = setup();
        let mut moving = still.clone();
        moving.vel = Vec2::new(tuning.tank.max_speed, 0.0);
        let turn = TankInput {
            move_dir: Vec2::new(1.0, 0.0),
            ..Default::default()
        };
        still.update(SIM_DT, &turn, &arena, &tuning, &mut rng);
        moving.update(SIM_DT, &turn, &arena, &tuning, &mut rng);
        assert!(still.angle > moving.angle);
        assert!(moving.angle > 0.0);
    }

    #[test]
    fn test_fire_requires_reload_and_aim() {
        let (mut tank, arena, tuning, mut rng) = setup();
        let fire = TankInput {
            fire: true,
            ..Default::default()
        };
        // Starts loaded, crosshair straight ahead
        tank.update(SIM_DT, &fire, &arena, &tuning, &mut rng);
        let shells = tank.take_pending_shells();
        assert_eq!(shells.len(), 1);
        let muzzle = arena.center() + Vec2::X * tank.size * BARREL_LENGTH_FACTOR;
        assert!((shells[0].pos - muzzle).length() < 1.0);
        assert!((shells[0].vel - Vec2::X * tuning.shells.speed).length() < 1e-2);

        // Reloading
        tank.update(SIM_DT, &fire, &arena, &tuning, &mut rng);
        assert!(tank.take_pending_shells().is_empty());

        // Reloaded but aiming behind: turret hasn't caught up
        tank.reload_timer = tuning.shells.fire_interval;
        tank.set_crosshair_position(tank.pos - Vec2::X * 100.0, &tuning);
        assert!(!tank.fire(&tuning));
    }

    #[test]
    fn test_damage_powerup_boosts_shell() {
        let (mut tank, _, tuning, _) = setup();
        tank.apply_powerup(PowerupKind::Damage, &tuning);
        assert!(tank.fire(&tuning));
        let shell = &tank.take_pending_shells()[0];
        assert!((shell.damage - tuning.shells.damage * 1.5).abs() < 1e-3);
    }

    #[test]
    fn test_armor_halves_damage() {
        let (mut tank, _, tuning, _) = setup();
        tank.apply_powerup(PowerupKind::Armor, &tuning);
        tank.take_damage(100.0, 1, &tuning);
        assert!((tank.health() - 450.0).abs() < 1e-3);
        // Mines ignore armor
        assert!(tank.take_piercing_damage(500.0, 1, &tuning));
        assert_eq!(tank.health(), 0.0);
    }

    #[test]
    fn test_kill_reported_once() {
        let (mut tank, _, tuning, _) = setup();
        assert!(tank.take_damage(10_000.0, 2, &tuning));
        assert!(!tank.take_damage(10.0, 3, &tuning));
        assert!(tank.is_destroying());
        assert_eq!(tank.killer, Some(2));
        tank.heal(1.0, &tuning);
        assert_eq!(tank.health(), 0.0);
    }

    #[test]
    fn test_destroying_decelerates_then_disappears() {
        let (mut tank, arena, tuning, mut rng) = setup();
        tank.vel = Vec2::new(20.0, 0.0);
        tank.take_damage(1000.0, 1, &tuning);
        tank.update(SIM_DT, &forward_input(), &arena, &tuning, &mut rng);
        assert!((tank.vel.x - 19.0).abs() < 1e-3);
        assert!(tank.is_visible(&tuning));
        for _ in 0..200 {
            tank.update(SIM_DT, &TankInput::default(), &arena, &tuning, &mut rng);
        }
        assert!(!tank.is_visible(&tuning));
        assert!(!tank.is_alive());
    }

    #[test]
    fn test_pit_trap_suppresses_control() {
        let (mut tank, arena, tuning, mut rng) = setup();
        assert!(tank.trap_in_pit(&tuning));
        let start = tank.pos;
        let input = TankInput {
            move_dir: Vec2::new(1.0, -1.0),
            aim: Vec2::new(0.0, 1.0),
            fire: true,
        };
        for _ in 0..30 {
            tank.update(SIM_DT, &input, &arena, &tuning, &mut rng);
        }
        assert_eq!(tank.pos, start);
        assert_eq!(tank.angle, 0.0);
        assert!(tank.take_pending_shells().is_empty());
        // Can't be re-trapped while held
        assert!(!tank.trap_in_pit(&tuning));
    }

    #[test]
    fn test_trap_release_starts_cooldown() {
        let (mut tank, arena, tuning, mut rng) = setup();
        tank.trap_in_pit(&tuning);
        let frames = (tuning.obstacles.pit_trap_duration / SIM_DT).ceil() as usize + 2;
        for _ in 0..frames {
            tank.update(SIM_DT, &TankInput::default(), &arena, &tuning, &mut rng);
        }
        assert!(!tank.is_trapped());
        assert!(!tank.can_use_teleporter());
        assert!(!tank.trap_in_pit(&tuning));
    }

    #[test]
    fn test_external_force_applied_once() {
        let (mut tank, arena, tuning, mut rng) = setup();
        tank.apply_external_force(Vec2::new(0.0, 60.0));
        tank.update(SIM_DT, &TankInput::default(), &arena, &tuning, &mut rng);
        assert!((tank.vel.y - 1.0).abs() < 1e-4);
        let y = tank.pos.y;
        tank.update(SIM_DT, &TankInput::default(), &arena, &tuning, &mut rng);
        // Lateral drift is not carried over
        assert!(tank.vel.y.abs() < 1e-4);
        assert!((tank.pos.y - y).abs() < 1e-4);
    }

    #[test]
    fn test_arena_clamp_bounces() {
        let (mut tank, arena, tuning, _) = setup();
        tank.pos = Vec2::new(5.0, 300.0);
        tank.vel = Vec2::new(-20.0, 0.0);
        tank.clamp_to_arena(&arena, &tuning);
        assert!(tank.corners().iter().all(|c| c.x >= -1e-3));
        assert!((tank.vel.x - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_crosshair_clamped() {
        let (mut tank, arena, tuning, mut rng) = setup();
        let aim = TankInput {
            aim: Vec2::new(1.0, 0.0),
            ..Default::default()
        };
        for _ in 0..600 {
            tank.update(SIM_DT, &aim, &arena, &tuning, &mut rng);
        }
        assert!(tank.crosshair_offset.length() <= tuning.crosshair.max_distance + 1e-3);

        tank.pos = Vec2::new(1200.0, 360.0);
        tank.update(SIM_DT, &aim, &arena, &tuning, &mut rng);
        assert!(tank.crosshair_world().x <= arena.width - tuning.crosshair.edge_margin + 1e-3);

        tank.set_crosshair_position(Vec2::new(0.0, 0.0), &tuning);
        assert!(tank.crosshair_offset.length() <= tuning.crosshair.max_distance + 1e-3);
    }

    #[test]
    fn test_smoke_spawns_when_damaged_and_prunes() {
        let (mut tank, arena, tuning, mut rng) = setup();
        tank.take_damage(400.0, 1, &tuning);
        for _ in 0..60 {
            tank.update(SIM_DT, &TankInput::default(), &arena, &tuning, &mut rng);
        }
        assert!(!tank.smoke.is_empty());
        tank.heal(1.0, &tuning);
        let frames = (tuning.effects.smoke_fade_time_max / SIM_DT) as usize + 10;
        for _ in 0..frames {
            tank.update(SIM_DT, &TankInput::default(), &arena, &tuning, &mut rng);
        }
        assert!(tank.smoke.is_empty());
    }

    #[test]
    fn test_track_marks_fade() {
        let (mut tank, arena, tuning, mut rng) = setup();
        for _ in 0..60 {
            tank.update(SIM_DT, &forward_input(), &arena, &tuning, &mut rng);
        }
        assert!(!tank.track_marks.is_empty());
        tank.vel = Vec2::ZERO;
        let frames = (tuning.effects.track_mark_fade_time / SIM_DT) as usize + 10;
        for _ in 0..frames {
            tank.update(SIM_DT, &TankInput::default(), &arena, &tuning, &mut rng);
        }
        assert!(tank.track_marks.is_empty());
    }

    proptest! {
        #[test]
        fn prop_health_stays_in_bounds(hits in proptest::collection::vec(-100.0f32..2000.0, 0..20)) {
            let (mut tank, arena, tuning, mut rng) = setup();
            for dmg in hits {
                tank.take_damage(dmg, 1, &tuning);
                prop_assert!(tank.health() >= 0.0 && tank.health() <= tuning.tank.max_health);
                tank.heal(0.2, &tuning);
                tank.update(SIM_DT, &TankInput::default(), &arena, &tuning, &mut rng);
                prop_assert!(tank.health() >= 0.0 && tank.health() <= tuning.tank.max_health);
            }
        }

        #[test]
        fn prop_angles_stay_wrapped(
            inputs in proptest::collection::vec((-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0), 1..120),
            start in -10.0f32..10.0,
        ) {
            let (_, arena, tuning, mut rng) = setup();
            let mut tank = Tank::new(0, arena.center(), start, &tuning);
            for (mx, my, ax, ay) in inputs {
                let input = TankInput { move_dir: Vec2::new(mx, my), aim: Vec2::new(ax, ay), fire: true };
                tank.update(0.05, &input, &arena, &tuning, &mut rng);
                prop_assert!(tank.angle > -PI && tank.angle <= PI);
                prop_assert!(tank.turret_angle > -PI && tank.turret_angle <= PI);
            }
        }
    }
}
