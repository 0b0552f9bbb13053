//! Placeable obstacles
//!
//! One closed set of kinds sharing a common contract: update, shell and tank
//! collision, field forces, one-shot pickup effects and placement checks.
//! Walls are oriented rectangles; every other kind is a circle.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::geometry::{
    CollisionResult, circle_overlap, obb_overlap, rect_corners, segment_circle_hit, segment_rect_hit,
};
use super::shell::Shell;
use super::tank::{PowerupKind, Tank};
use crate::consts::{INDESTRUCTIBLE_HEALTH, MIN_DIVISOR};
use crate::tuning::Tuning;
use crate::{Arena, PlayerId, angle_delta, heading, rotate_toward};

/// Extra push so a wall-tank contact resolves instead of resting at zero
const WALL_PUSH_SLOP: f32 = 1.0;
/// Auto-turret barrel reaches this far past its base
const TURRET_BARREL_OVERHANG: f32 = 5.0;
/// Fan cone half-angle, as the minimum cosine to the blow direction
const FAN_CONE_MIN_DOT: f32 = 0.3;
/// Opacity of mines and pits nobody has found yet
const HIDDEN_OPACITY: f32 = 0.05;

/// Obstacle kinds, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    SolidWall,
    BreakableWall,
    ReflectiveWall,
    RicochetWall,
    Mine,
    AutoTurret,
    Pit,
    Portal,
    Flag,
    HealthPack,
    Powerup,
    Electromagnet,
    Fan,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 13] = [
        ObstacleKind::SolidWall,
        ObstacleKind::BreakableWall,
        ObstacleKind::ReflectiveWall,
        ObstacleKind::RicochetWall,
        ObstacleKind::Mine,
        ObstacleKind::AutoTurret,
        ObstacleKind::Pit,
        ObstacleKind::Portal,
        ObstacleKind::Flag,
        ObstacleKind::HealthPack,
        ObstacleKind::Powerup,
        ObstacleKind::Electromagnet,
        ObstacleKind::Fan,
    ];

    pub fn is_wall(self) -> bool {
        matches!(
            self,
            ObstacleKind::SolidWall
                | ObstacleKind::BreakableWall
                | ObstacleKind::ReflectiveWall
                | ObstacleKind::RicochetWall
        )
    }

    pub fn is_pickup(self) -> bool {
        matches!(self, ObstacleKind::Flag | ObstacleKind::HealthPack | ObstacleKind::Powerup)
    }

    /// Collision footprint
    pub fn shape(self, tuning: &Tuning) -> Shape {
        let o = &tuning.obstacles;
        let radius = match self {
            ObstacleKind::SolidWall
            | ObstacleKind::BreakableWall
            | ObstacleKind::ReflectiveWall
            | ObstacleKind::RicochetWall => {
                return Shape::Rect {
                    length: o.wall_length,
                    thickness: o.wall_thickness,
                };
            }
            ObstacleKind::Mine => o.mine_radius,
            ObstacleKind::AutoTurret => o.turret_radius,
            ObstacleKind::Pit => o.pit_radius,
            ObstacleKind::Portal => o.portal_radius,
            ObstacleKind::Flag => o.flag_radius,
            ObstacleKind::HealthPack => o.health_pack_radius,
            ObstacleKind::Powerup => tuning.powerups.radius,
            ObstacleKind::Electromagnet => o.electromagnet_radius,
            ObstacleKind::Fan => o.fan_radius,
        };
        Shape::Circle { radius }
    }

    /// Reach of a field or gun, for range rings
    pub fn range(self, tuning: &Tuning) -> Option<f32> {
        match self {
            ObstacleKind::AutoTurret => Some(tuning.obstacles.turret_range),
            ObstacleKind::Electromagnet => Some(tuning.obstacles.electromagnet_range),
            ObstacleKind::Fan => Some(tuning.obstacles.fan_range),
            _ => None,
        }
    }
}

/// Collision footprint of an obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Rect { length: f32, thickness: f32 },
    Circle { radius: f32 },
}

/// Per-kind mutable state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variant {
    SolidWall,
    BreakableWall,
    ReflectiveWall,
    RicochetWall,
    Mine {
        arm_timer: f32,
        revealed: bool,
    },
    AutoTurret {
        turret_angle: f32,
        reload_timer: f32,
    },
    Pit {
        revealed: bool,
    },
    Portal,
    Flag {
        captured_by: Option<PlayerId>,
        awarded: bool,
    },
    HealthPack {
        collected_by: Option<PlayerId>,
        applied: bool,
    },
    Powerup {
        kind: PowerupKind,
        collected_by: Option<PlayerId>,
        applied: bool,
    },
    Electromagnet {
        cycle_timer: f32,
        /// This magnet's period relative to the tuned duty cycle
        period_scale: f32,
        active: bool,
    },
    Fan,
}

/// Outcome of a shell touching an obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShellHit {
    Miss,
    /// Shell absorbed; the obstacle takes its damage
    Destroyed { point: Vec2, normal: Vec2 },
    /// Shell bounces off `normal`
    Reflected { point: Vec2, normal: Vec2 },
    /// Shell bursts into fragments
    Ricochet { point: Vec2, normal: Vec2 },
}

/// What a tank touching an obstacle did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TankContact {
    /// Ordinary solid contact
    Push,
    Trapped,
    Teleported { to: Vec2 },
    /// Contact with no effect (cooldown, pass-through)
    Ignored,
}

impl TankContact {
    /// Whether the caller should apply the physical push
    pub fn applies_push(self) -> bool {
        matches!(self, TankContact::Push)
    }
}

/// One-shot pickup payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollectionEffect {
    pub player: PlayerId,
    pub score: i32,
    /// Fraction of max health to restore
    pub heal_fraction: f32,
    pub powerup: Option<PowerupKind>,
}

/// How the renderer should draw an obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance {
    pub kind: ObstacleKind,
    pub shape: Shape,
    pub pos: Vec2,
    pub angle: f32,
    /// 0 = invisible, 1 = opaque
    pub opacity: f32,
    /// Color multiplier: 1 = base tint, lower is darker
    pub shade: f32,
    /// Range ring to show, if any
    pub range: Option<f32>,
    /// Turret barrel direction or fan blow direction
    pub facing: Option<f32>,
}

/// Ghost shown while a player chooses where to place
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preview {
    pub kind: ObstacleKind,
    pub shape: Shape,
    pub pos: Vec2,
    pub angle: f32,
    pub valid: bool,
    pub range: Option<f32>,
}

/// A placed obstacle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub pos: Vec2,
    pub angle: f32,
    /// Player who placed it
    pub owner: PlayerId,
    pub variant: Variant,
    alive: bool,
    health: f32,
    pending_shells: Vec<Shell>,
}

impl Obstacle {
    pub fn new(kind: ObstacleKind, pos: Vec2, angle: f32, owner: PlayerId, tuning: &Tuning, rng: &mut impl Rng) -> Self {
        let o = &tuning.obstacles;
        let (variant, health) = match kind {
            ObstacleKind::SolidWall => (Variant::SolidWall, INDESTRUCTIBLE_HEALTH),
            ObstacleKind::BreakableWall => (Variant::BreakableWall, o.breakable_wall_health),
            ObstacleKind::ReflectiveWall => (Variant::ReflectiveWall, INDESTRUCTIBLE_HEALTH),
            ObstacleKind::RicochetWall => (Variant::RicochetWall, INDESTRUCTIBLE_HEALTH),
            ObstacleKind::Mine => (
                Variant::Mine {
                    arm_timer: 0.0,
                    revealed: false,
                },
                1.0,
            ),
            ObstacleKind::AutoTurret => (
                Variant::AutoTurret {
                    turret_angle: angle,
                    // Start loaded
                    reload_timer: o.turret_fire_interval,
                },
                o.turret_health,
            ),
            ObstacleKind::Pit => (Variant::Pit { revealed: false }, INDESTRUCTIBLE_HEALTH),
            ObstacleKind::Portal => (Variant::Portal, INDESTRUCTIBLE_HEALTH),
            ObstacleKind::Flag => (
                Variant::Flag {
                    captured_by: None,
                    awarded: false,
                },
                INDESTRUCTIBLE_HEALTH,
            ),
            ObstacleKind::HealthPack => (
                Variant::HealthPack {
                    collected_by: None,
                    applied: false,
                },
                INDESTRUCTIBLE_HEALTH,
            ),
            ObstacleKind::Powerup => {
                let kind = PowerupKind::ALL[rng.random_range(0..PowerupKind::ALL.len())];
                (
                    Variant::Powerup {
                        kind,
                        collected_by: None,
                        applied: false,
                    },
                    INDESTRUCTIBLE_HEALTH,
                )
            }
            ObstacleKind::Electromagnet => {
                // Random phase and period so several magnets don't pulse in step
                let period_scale = rng.random_range(0.8..1.2);
                let cycle_timer = rng.random_range(0.0..1.0) * o.electromagnet_duty_cycle * period_scale;
                (
                    Variant::Electromagnet {
                        cycle_timer,
                        period_scale,
                        active: true,
                    },
                    INDESTRUCTIBLE_HEALTH,
                )
            }
            ObstacleKind::Fan => (Variant::Fan, INDESTRUCTIBLE_HEALTH),
        };

        Self {
            pos,
            angle,
            owner,
            variant,
            alive: true,
            health,
            pending_shells: Vec::new(),
        }
    }

    pub fn kind(&self) -> ObstacleKind {
        match self.variant {
            Variant::SolidWall => ObstacleKind::SolidWall,
            Variant::BreakableWall => ObstacleKind::BreakableWall,
            Variant::ReflectiveWall => ObstacleKind::ReflectiveWall,
            Variant::RicochetWall => ObstacleKind::RicochetWall,
            Variant::Mine { .. } => ObstacleKind::Mine,
            Variant::AutoTurret { .. } => ObstacleKind::AutoTurret,
            Variant::Pit { .. } => ObstacleKind::Pit,
            Variant::Portal => ObstacleKind::Portal,
            Variant::Flag { .. } => ObstacleKind::Flag,
            Variant::HealthPack { .. } => ObstacleKind::HealthPack,
            Variant::Powerup { .. } => ObstacleKind::Powerup,
            Variant::Electromagnet { .. } => ObstacleKind::Electromagnet,
            Variant::Fan => ObstacleKind::Fan,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self, tuning: &Tuning) -> f32 {
        match self.kind() {
            ObstacleKind::BreakableWall => tuning.obstacles.breakable_wall_health,
            ObstacleKind::AutoTurret => tuning.obstacles.turret_health,
            ObstacleKind::Mine => 1.0,
            _ => INDESTRUCTIBLE_HEALTH,
        }
    }

    pub fn is_destructible(&self) -> bool {
        matches!(
            self.kind(),
            ObstacleKind::BreakableWall | ObstacleKind::AutoTurret | ObstacleKind::Mine
        )
    }

    /// Whether a shell impact shows an explosion
    pub fn explodes_on_hit(&self) -> bool {
        matches!(self.kind(), ObstacleKind::AutoTurret | ObstacleKind::Mine)
    }

    /// Subtract health. Returns true on the hit that destroys it.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if !self.alive || !self.is_destructible() {
            return false;
        }
        self.health = (self.health - amount.max(0.0)).max(0.0);
        if self.health <= 0.0 {
            self.alive = false;
            return true;
        }
        false
    }

    /// Remove immediately (a mine going off)
    pub fn destroy(&mut self) {
        self.health = 0.0;
        self.alive = false;
    }

    pub fn is_armed(&self, tuning: &Tuning) -> bool {
        match self.variant {
            Variant::Mine { arm_timer, .. } => arm_timer >= tuning.obstacles.mine_arm_time,
            _ => false,
        }
    }

    /// Wall corners, `None` for circular kinds
    pub fn corners(&self, tuning: &Tuning) -> Option<[Vec2; 4]> {
        match self.kind().shape(tuning) {
            Shape::Rect { length, thickness } => Some(rect_corners(self.pos, self.angle, length * 0.5, thickness * 0.5)),
            Shape::Circle { .. } => None,
        }
    }

    pub fn radius(&self, tuning: &Tuning) -> Option<f32> {
        match self.kind().shape(tuning) {
            Shape::Circle { radius } => Some(radius),
            Shape::Rect { .. } => None,
        }
    }

    pub fn take_pending_shells(&mut self) -> Vec<Shell> {
        std::mem::take(&mut self.pending_shells)
    }

    /// Advance timers, turret gunnery and pickup capture
    pub fn update(&mut self, dt: f32, tanks: &[Tank], tuning: &Tuning) {
        if !self.alive {
            return;
        }
        let o = &tuning.obstacles;
        let pos = self.pos;

        match &mut self.variant {
            Variant::Mine { arm_timer, .. } => *arm_timer += dt,
            Variant::AutoTurret {
                turret_angle,
                reload_timer,
            } => {
                *reload_timer = (*reload_timer + dt).min(o.turret_fire_interval);
                let Some(target) = nearest_enemy(pos, self.owner, tanks, o.turret_range) else {
                    return;
                };
                let to_target = target.pos - pos;
                let bearing = heading(to_target);
                *turret_angle = rotate_toward(*turret_angle, bearing, o.turret_rotation_speed * dt);

                if *reload_timer >= o.turret_fire_interval
                    && angle_delta(*turret_angle, bearing).abs() < o.turret_aim_tolerance
                {
                    let dir = Vec2::from_angle(*turret_angle);
                    let muzzle = pos + dir * (o.turret_radius + TURRET_BARREL_OVERHANG);
                    self.pending_shells.push(Shell::new(
                        muzzle,
                        dir * tuning.shells.speed * o.turret_shell_speed_factor,
                        self.owner,
                        o.turret_range,
                        o.turret_damage,
                        tuning.shells.radius,
                    ));
                    *reload_timer = 0.0;
                }
            }
            Variant::Electromagnet {
                cycle_timer,
                period_scale,
                active,
            } => {
                let period = (o.electromagnet_duty_cycle * *period_scale).max(MIN_DIVISOR);
                *cycle_timer = (*cycle_timer + dt).rem_euclid(period);
                // On for the first half of each period
                *active = *cycle_timer < period * 0.5;
            }
            Variant::Flag { captured_by, .. } => {
                if let Some(player) = first_toucher(pos, o.flag_radius, tanks) {
                    *captured_by = Some(player);
                    self.alive = false;
                }
            }
            Variant::HealthPack { collected_by, .. } => {
                if let Some(player) = first_toucher(pos, o.health_pack_radius, tanks) {
                    *collected_by = Some(player);
                    self.alive = false;
                }
            }
            Variant::Powerup { collected_by, .. } => {
                if let Some(player) = first_toucher(pos, tuning.powerups.radius, tanks) {
                    *collected_by = Some(player);
                    self.alive = false;
                }
            }
            _ => {}
        }
    }

    /// Test a shell's swept path against this obstacle
    pub fn check_shell_collision(&self, shell: &Shell, tuning: &Tuning) -> ShellHit {
        if !self.alive {
            return ShellHit::Miss;
        }

        match self.kind() {
            ObstacleKind::SolidWall
            | ObstacleKind::BreakableWall
            | ObstacleKind::ReflectiveWall
            | ObstacleKind::RicochetWall => {
                let Some(corners) = self.corners(tuning) else {
                    return ShellHit::Miss;
                };
                let hit = segment_rect_hit(shell.prev_pos, shell.pos, &corners, self.pos, shell.vel);
                if !hit.hit {
                    return ShellHit::Miss;
                }
                let (point, normal) = (hit.point, hit.normal);
                match self.kind() {
                    ObstacleKind::ReflectiveWall if shell.can_reflect(tuning.shells.max_bounces) => {
                        ShellHit::Reflected { point, normal }
                    }
                    ObstacleKind::RicochetWall => ShellHit::Ricochet { point, normal },
                    _ => ShellHit::Destroyed { point, normal },
                }
            }
            ObstacleKind::Mine | ObstacleKind::AutoTurret => {
                let radius = self.radius(tuning).unwrap_or(0.0) + shell.radius;
                match segment_circle_hit(shell.prev_pos, shell.pos, self.pos, radius) {
                    Some(point) => ShellHit::Destroyed {
                        point,
                        normal: (point - self.pos).normalize_or_zero(),
                    },
                    None => ShellHit::Miss,
                }
            }
            // Shells pass over pits, through portals, pickups and fields
            _ => ShellHit::Miss,
        }
    }

    /// Overlap with a tank. `normal` is the push direction for the tank and
    /// `penetration` the push distance.
    pub fn check_tank_collision(&self, tank: &Tank, tuning: &Tuning) -> CollisionResult {
        if !self.alive {
            return CollisionResult::miss();
        }

        match self.kind() {
            ObstacleKind::SolidWall
            | ObstacleKind::BreakableWall
            | ObstacleKind::ReflectiveWall
            | ObstacleKind::RicochetWall => {
                let Some(corners) = self.corners(tuning) else {
                    return CollisionResult::miss();
                };
                let mut result = obb_overlap(&corners, self.pos, &tank.corners(), tank.pos);
                if result.hit {
                    result.penetration = result.penetration * 0.5 + WALL_PUSH_SLOP;
                }
                result
            }
            ObstacleKind::Mine | ObstacleKind::AutoTurret => {
                let radius = self.radius(tuning).unwrap_or(0.0);
                circle_overlap(self.pos, radius, tank.pos, tank.body_radius())
            }
            ObstacleKind::Pit | ObstacleKind::Portal => {
                // Center must be over the hole; no push
                let radius = self.radius(tuning).unwrap_or(0.0);
                let diff = tank.pos - self.pos;
                if diff.length() < radius {
                    CollisionResult {
                        hit: true,
                        point: tank.pos,
                        normal: diff.normalize_or_zero(),
                        penetration: 0.0,
                    }
                } else {
                    CollisionResult::miss()
                }
            }
            _ => CollisionResult::miss(),
        }
    }

    /// Side effects of a tank touching this obstacle. `portal_exits` lists the
    /// positions of every other live portal.
    pub fn handle_tank_collision(
        &mut self,
        tank: &mut Tank,
        portal_exits: &[Vec2],
        rng: &mut impl Rng,
        tuning: &Tuning,
    ) -> TankContact {
        match &mut self.variant {
            Variant::Mine { revealed, .. } => {
                *revealed = true;
                TankContact::Push
            }
            Variant::Pit { revealed } => {
                *revealed = true;
                if tank.trap_in_pit(tuning) {
                    TankContact::Trapped
                } else {
                    TankContact::Ignored
                }
            }
            Variant::Portal => {
                if !tank.can_use_teleporter() || portal_exits.is_empty() {
                    return TankContact::Ignored;
                }
                let to = portal_exits[rng.random_range(0..portal_exits.len())];
                tank.teleport_to(to, tuning);
                TankContact::Teleported { to }
            }
            Variant::Flag { .. }
            | Variant::HealthPack { .. }
            | Variant::Powerup { .. }
            | Variant::Electromagnet { .. }
            | Variant::Fan => TankContact::Ignored,
            _ => TankContact::Push,
        }
    }

    /// Field force on a tank at `pos`
    pub fn tank_force(&self, pos: Vec2, tuning: &Tuning) -> Vec2 {
        let o = &tuning.obstacles;
        match self.kind() {
            ObstacleKind::Electromagnet => self.magnet_pull(pos, o.electromagnet_force, tuning),
            ObstacleKind::Fan => self.fan_push(pos, o.fan_force, tuning),
            _ => Vec2::ZERO,
        }
    }

    /// Field force on a shell at `pos`; shells are pulled harder than tanks
    pub fn shell_force(&self, pos: Vec2, tuning: &Tuning) -> Vec2 {
        let o = &tuning.obstacles;
        match self.kind() {
            ObstacleKind::Electromagnet => {
                self.magnet_pull(pos, o.electromagnet_force * o.electromagnet_shell_factor, tuning)
            }
            ObstacleKind::Fan => self.fan_push(pos, o.fan_force * o.fan_shell_factor, tuning),
            _ => Vec2::ZERO,
        }
    }

    fn magnet_pull(&self, pos: Vec2, force: f32, tuning: &Tuning) -> Vec2 {
        let Variant::Electromagnet { active: true, .. } = self.variant else {
            return Vec2::ZERO;
        };
        if !self.alive {
            return Vec2::ZERO;
        }
        let o = &tuning.obstacles;
        let to_magnet = self.pos - pos;
        let dist = to_magnet.length();
        if dist >= o.electromagnet_range || dist <= o.electromagnet_radius {
            return Vec2::ZERO;
        }
        let falloff = 1.0 - dist / o.electromagnet_range.max(MIN_DIVISOR);
        to_magnet.normalize_or_zero() * force * falloff * falloff
    }

    fn fan_push(&self, pos: Vec2, force: f32, tuning: &Tuning) -> Vec2 {
        if !self.alive {
            return Vec2::ZERO;
        }
        let o = &tuning.obstacles;
        let dir = Vec2::from_angle(self.angle);
        let to_target = pos - self.pos;
        let dist = to_target.length();
        if dist < o.fan_radius || dist > o.fan_range {
            return Vec2::ZERO;
        }
        if to_target.normalize_or_zero().dot(dir) < FAN_CONE_MIN_DOT {
            return Vec2::ZERO;
        }
        // Cone widens linearly to fan_width at full range
        let lateral = to_target.reject_from_normalized(dir).length();
        let range = o.fan_range.max(MIN_DIVISOR);
        if lateral > dist / range * o.fan_width * 0.5 {
            return Vec2::ZERO;
        }
        dir * force * (1.0 - dist / range)
    }

    /// Hand over a pickup's payload exactly once
    pub fn take_collection_effect(&mut self, tuning: &Tuning) -> Option<CollectionEffect> {
        match &mut self.variant {
            Variant::Flag {
                captured_by: Some(player),
                awarded,
            } if !*awarded => {
                *awarded = true;
                Some(CollectionEffect {
                    player: *player,
                    score: tuning.obstacles.flag_points,
                    heal_fraction: 0.0,
                    powerup: None,
                })
            }
            Variant::HealthPack {
                collected_by: Some(player),
                applied,
            } if !*applied => {
                *applied = true;
                Some(CollectionEffect {
                    player: *player,
                    score: 0,
                    heal_fraction: tuning.obstacles.health_pack_heal,
                    powerup: None,
                })
            }
            Variant::Powerup {
                kind,
                collected_by: Some(player),
                applied,
            } if !*applied => {
                *applied = true;
                Some(CollectionEffect {
                    player: *player,
                    score: 0,
                    heal_fraction: 0.0,
                    powerup: Some(*kind),
                })
            }
            _ => None,
        }
    }

    /// Whether this obstacle may stay where it is
    pub fn is_valid_placement(&self, obstacles: &[Obstacle], tanks: &[Tank], arena: &Arena, tuning: &Tuning) -> bool {
        let others = obstacles.iter().filter(|other| !std::ptr::eq(*other, self));
        placement_is_valid(self.kind(), self.pos, self.angle, others, tanks, arena, tuning)
    }

    /// Draw descriptor for the renderer
    pub fn appearance(&self, tuning: &Tuning) -> Appearance {
        let kind = self.kind();
        let (opacity, shade, facing) = match &self.variant {
            Variant::Mine { revealed, .. } | Variant::Pit { revealed } => {
                (if *revealed { 1.0 } else { HIDDEN_OPACITY }, 1.0, None)
            }
            Variant::BreakableWall => {
                let shade = (self.health / self.max_health(tuning).max(MIN_DIVISOR)).clamp(0.0, 1.0);
                (1.0, shade, None)
            }
            Variant::AutoTurret { turret_angle, .. } => (1.0, 1.0, Some(*turret_angle)),
            Variant::Electromagnet { active, .. } => (1.0, if *active { 1.0 } else { 0.5 }, None),
            Variant::Fan => (1.0, 1.0, Some(self.angle)),
            _ => (1.0, 1.0, None),
        };
        let range = match &self.variant {
            Variant::Electromagnet { active: false, .. } => None,
            _ => kind.range(tuning),
        };

        Appearance {
            kind,
            shape: kind.shape(tuning),
            pos: self.pos,
            angle: self.angle,
            opacity: if self.alive { opacity } else { 0.0 },
            shade,
            range,
            facing,
        }
    }
}

impl Preview {
    pub fn new(kind: ObstacleKind, pos: Vec2, angle: f32, valid: bool, tuning: &Tuning) -> Self {
        Self {
            kind,
            shape: kind.shape(tuning),
            pos,
            angle,
            valid,
            range: kind.range(tuning),
        }
    }
}

/// Placement rule shared by every kind: the footprint stays inside the arena
/// margin, and the center keeps its distance from other live obstacles and
/// from live tanks.
pub fn placement_is_valid<'a>(
    kind: ObstacleKind,
    pos: Vec2,
    angle: f32,
    others: impl IntoIterator<Item = &'a Obstacle>,
    tanks: &[Tank],
    arena: &Arena,
    tuning: &Tuning,
) -> bool {
    let o = &tuning.obstacles;
    let margin = o.placement_edge_margin;

    let inside = match kind.shape(tuning) {
        Shape::Rect { length, thickness } => rect_corners(pos, angle, length * 0.5, thickness * 0.5)
            .iter()
            .all(|c| arena.contains_with_margin(*c, margin)),
        Shape::Circle { radius } => arena.contains_with_margin(pos, margin + radius),
    };
    if !inside {
        return false;
    }

    let crowded = others
        .into_iter()
        .filter(|other| other.is_alive())
        .any(|other| other.pos.distance(pos) < o.placement_min_spacing);
    if crowded {
        return false;
    }

    tanks
        .iter()
        .filter(|t| t.is_alive())
        .all(|t| t.pos.distance(pos) >= o.placement_tank_clearance)
}

/// Closest live tank not owned by `owner`, strictly within `range`
fn nearest_enemy(pos: Vec2, owner: PlayerId, tanks: &[Tank], range: f32) -> Option<&Tank> {
    tanks
        .iter()
        .filter(|t| t.is_alive() && t.player != owner)
        .map(|t| (t, t.pos.distance(pos)))
        .filter(|(_, d)| *d < range)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(t, _)| t)
}

/// First live tank (in slot order) close enough to grab a pickup
fn first_toucher(pos: Vec2, radius: f32, tanks: &[Tank]) -> Option<PlayerId> {
    tanks
        .iter()
        .find(|t| t.is_alive() && t.pos.distance(pos) < radius + t.size)
        .map(|t| t.player)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::f32::consts::FRAC_PI_2;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(42)
    }

    fn make(kind: ObstacleKind, pos: Vec2, angle: f32, owner: PlayerId) -> Obstacle {
        Obstacle::new(kind, pos, angle, owner, &Tuning::default(), &mut rng())
    }

    fn tank_at(player: PlayerId, pos: Vec2) -> Tank {
        Tank::new(player, pos, 0.0, &Tuning::default())
    }

    #[test]
    fn test_kind_round_trips_through_variant() {
        let mut r = rng();
        let tuning = Tuning::default();
        for kind in ObstacleKind::ALL {
            let o = Obstacle::new(kind, Vec2::new(300.0, 300.0), 0.0, 0, &tuning, &mut r);
            assert_eq!(o.kind(), kind);
            assert_eq!(o.corners(&tuning).is_some(), kind.is_wall());
        }
    }

    #[test]
    fn test_mine_arms_exactly_at_threshold() {
        let tuning = Tuning::default();
        let mut mine = make(ObstacleKind::Mine, Vec2::new(300.0, 300.0), 0.0, 0);
        mine.variant = Variant::Mine {
            arm_timer: tuning.obstacles.mine_arm_time - 0.001,
            revealed: false,
        };
        assert!(!mine.is_armed(&tuning));
        mine.variant = Variant::Mine {
            arm_timer: tuning.obstacles.mine_arm_time,
            revealed: false,
        };
        assert!(mine.is_armed(&tuning));
    }

    #[test]
    fn test_mine_arms_over_time() {
        let tuning = Tuning::default();
        let mut mine = make(ObstacleKind::Mine, Vec2::new(300.0, 300.0), 0.0, 0);
        assert!(!mine.is_armed(&tuning));
        for _ in 0..130 {
            mine.update(SIM_DT, &[], &tuning);
        }
        assert!(mine.is_armed(&tuning));
    }

    #[test]
    fn test_shell_destroyed_by_solid_wall() {
        let tuning = Tuning::default();
        let arena = Arena::new(1000.0, 1000.0);
        // Vertical wall whose left face is at x = 500
        let wall = make(ObstacleKind::SolidWall, Vec2::new(510.0, 500.0), FRAC_PI_2, 0);
        let mut shell = Shell::new(Vec2::new(490.0, 500.0), Vec2::new(400.0, 0.0), 1, 400.0, 50.0, 4.0);

        let mut result = ShellHit::Miss;
        for _ in 0..5 {
            shell.update(SIM_DT, &arena);
            result = wall.check_shell_collision(&shell, &tuning);
            if result != ShellHit::Miss {
                break;
            }
        }
        let ShellHit::Destroyed { point, normal } = result else {
            panic!("expected Destroyed, got {result:?}");
        };
        assert!((point.x - 500.0).abs() < 1e-2);
        assert!((normal - Vec2::new(-1.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_reflective_wall_honours_bounce_budget() {
        let tuning = Tuning::default();
        let wall = make(ObstacleKind::ReflectiveWall, Vec2::new(510.0, 500.0), FRAC_PI_2, 0);
        let mut shell = Shell::new(Vec2::new(495.0, 500.0), Vec2::new(400.0, 0.0), 1, 400.0, 50.0, 4.0);
        shell.prev_pos = Vec2::new(490.0, 500.0);
        shell.pos = Vec2::new(505.0, 500.0);
        assert!(matches!(wall.check_shell_collision(&shell, &tuning), ShellHit::Reflected { .. }));
        shell.bounces = tuning.shells.max_bounces;
        assert!(matches!(wall.check_shell_collision(&shell, &tuning), ShellHit::Destroyed { .. }));
    }

    #[test]
    fn test_pass_through_kinds_ignore_shells() {
        let tuning = Tuning::default();
        let mut shell = Shell::new(Vec2::new(300.0, 300.0), Vec2::new(400.0, 0.0), 1, 400.0, 50.0, 4.0);
        shell.prev_pos = Vec2::new(290.0, 300.0);
        for kind in [
            ObstacleKind::Pit,
            ObstacleKind::Portal,
            ObstacleKind::Flag,
            ObstacleKind::HealthPack,
            ObstacleKind::Powerup,
            ObstacleKind::Electromagnet,
            ObstacleKind::Fan,
        ] {
            let o = make(kind, Vec2::new(300.0, 300.0), 0.0, 0);
            assert_eq!(o.check_shell_collision(&shell, &tuning), ShellHit::Miss, "{kind:?}");
        }
        let turret = make(ObstacleKind::AutoTurret, Vec2::new(300.0, 300.0), 0.0, 0);
        assert!(matches!(turret.check_shell_collision(&shell, &tuning), ShellHit::Destroyed { .. }));
    }

    #[test]
    fn test_fast_shell_cannot_skip_past_mine() {
        let tuning = Tuning::default();
        let mine = make(ObstacleKind::Mine, Vec2::new(300.0, 300.0), 0.0, 0);
        // One long step at the frame-dt clamp jumps clean over the circle
        let mut shell = Shell::new(Vec2::new(280.0, 305.0), Vec2::new(400.0, 0.0), 1, 400.0, 50.0, 4.0);
        shell.prev_pos = Vec2::new(280.0, 305.0);
        shell.pos = Vec2::new(320.0, 305.0);
        assert!((shell.pos - mine.pos).length() > tuning.obstacles.mine_radius + shell.radius);

        let ShellHit::Destroyed { point, normal } = mine.check_shell_collision(&shell, &tuning) else {
            panic!("shell should hit the mine");
        };
        assert!(point.x < 300.0);
        assert!(normal.x < 0.0);

        // A parallel pass outside the circle still misses
        shell.prev_pos = Vec2::new(280.0, 330.0);
        shell.pos = Vec2::new(320.0, 330.0);
        assert_eq!(mine.check_shell_collision(&shell, &tuning), ShellHit::Miss);
    }

    #[test]
    fn test_wall_pushes_tank_out() {
        let tuning = Tuning::default();
        let wall = make(ObstacleKind::SolidWall, Vec2::new(300.0, 300.0), 0.0, 0);
        // Wall spans y 290..310; tank hull half-width 16 centered at y 320
        let tank = tank_at(1, Vec2::new(300.0, 320.0));
        let push = wall.check_tank_collision(&tank, &tuning);
        assert!(push.hit);
        assert!((push.normal - Vec2::Y).length() < 1e-4);
        assert!((push.penetration - (6.0 * 0.5 + 1.0)).abs() < 1e-3);

        let clear = tank_at(1, Vec2::new(300.0, 400.0));
        assert!(!wall.check_tank_collision(&clear, &tuning).hit);
    }

    #[test]
    fn test_breakable_wall_takes_damage() {
        let mut wall = make(ObstacleKind::BreakableWall, Vec2::new(300.0, 300.0), 0.0, 0);
        assert!(!wall.take_damage(20.0));
        assert!(wall.is_alive());
        assert!(wall.take_damage(40.0));
        assert!(!wall.is_alive());
        assert_eq!(wall.health(), 0.0);

        let mut solid = make(ObstacleKind::SolidWall, Vec2::new(300.0, 300.0), 0.0, 0);
        assert!(!solid.take_damage(1.0e6));
        assert!(solid.is_alive());
    }

    #[test]
    fn test_pit_traps_and_reveals() {
        let tuning = Tuning::default();
        let mut pit = make(ObstacleKind::Pit, Vec2::new(300.0, 300.0), 0.0, 0);
        let mut tank = tank_at(1, Vec2::new(310.0, 300.0));
        assert!(pit.check_tank_collision(&tank, &tuning).hit);
        assert_eq!(pit.appearance(&tuning).opacity, HIDDEN_OPACITY);

        let contact = pit.handle_tank_collision(&mut tank, &[], &mut rng(), &tuning);
        assert_eq!(contact, TankContact::Trapped);
        assert!(!contact.applies_push());
        assert!(tank.is_trapped());
        assert_eq!(pit.appearance(&tuning).opacity, 1.0);

        // Already held: no second trap
        let again = pit.handle_tank_collision(&mut tank, &[], &mut rng(), &tuning);
        assert_eq!(again, TankContact::Ignored);
    }

    #[test]
    fn test_portal_teleports_to_another_portal() {
        let tuning = Tuning::default();
        let mut portal = make(ObstacleKind::Portal, Vec2::new(300.0, 300.0), 0.0, 0);
        let mut tank = tank_at(1, Vec2::new(305.0, 300.0));
        let exit = Vec2::new(800.0, 500.0);

        let contact = portal.handle_tank_collision(&mut tank, &[exit], &mut rng(), &tuning);
        assert_eq!(contact, TankContact::Teleported { to: exit });
        assert_eq!(tank.pos, exit);
        assert!(!tank.can_use_teleporter());

        // Cooldown blocks the return trip
        let back = portal.handle_tank_collision(&mut tank, &[Vec2::new(300.0, 300.0)], &mut rng(), &tuning);
        assert_eq!(back, TankContact::Ignored);

        // A lone portal does nothing
        let mut fresh = tank_at(2, Vec2::new(305.0, 300.0));
        assert_eq!(
            portal.handle_tank_collision(&mut fresh, &[], &mut rng(), &tuning),
            TankContact::Ignored
        );
    }

    #[test]
    fn test_flag_capture_effect_is_one_shot() {
        let tuning = Tuning::default();
        let mut flag = make(ObstacleKind::Flag, Vec2::new(300.0, 300.0), 0.0, 0);
        let far = tank_at(0, Vec2::new(600.0, 600.0));
        let near = tank_at(2, Vec2::new(330.0, 300.0));

        flag.update(SIM_DT, &[far.clone()], &tuning);
        assert!(flag.is_alive());
        assert_eq!(flag.take_collection_effect(&tuning), None);

        flag.update(SIM_DT, &[far, near], &tuning);
        assert!(!flag.is_alive());
        let effect = flag.take_collection_effect(&tuning).unwrap();
        assert_eq!(effect.player, 2);
        assert_eq!(effect.score, tuning.obstacles.flag_points);
        assert_eq!(flag.take_collection_effect(&tuning), None);
        assert_eq!(flag.take_collection_effect(&tuning), None);
    }

    #[test]
    fn test_health_pack_and_powerup_effects() {
        let tuning = Tuning::default();
        let tanks = [tank_at(1, Vec2::new(300.0, 300.0))];

        let mut pack = make(ObstacleKind::HealthPack, Vec2::new(310.0, 300.0), 0.0, 0);
        pack.update(SIM_DT, &tanks, &tuning);
        let effect = pack.take_collection_effect(&tuning).unwrap();
        assert_eq!(effect.heal_fraction, tuning.obstacles.health_pack_heal);
        assert!(pack.take_collection_effect(&tuning).is_none());

        let mut power = make(ObstacleKind::Powerup, Vec2::new(310.0, 300.0), 0.0, 0);
        power.update(SIM_DT, &tanks, &tuning);
        let effect = power.take_collection_effect(&tuning).unwrap();
        assert_eq!(effect.player, 1);
        assert!(effect.powerup.is_some());
        assert!(power.take_collection_effect(&tuning).is_none());
    }

    #[test]
    fn test_dead_tank_cannot_collect() {
        let tuning = Tuning::default();
        let mut tank = tank_at(1, Vec2::new(300.0, 300.0));
        tank.take_damage(1.0e6, 0, &tuning);
        let mut flag = make(ObstacleKind::Flag, Vec2::new(300.0, 300.0), 0.0, 0);
        flag.update(SIM_DT, &[tank], &tuning);
        assert!(flag.is_alive());
    }

    #[test]
    fn test_electromagnet_pull_falls_off() {
        let tuning = Tuning::default();
        let mut magnet = make(ObstacleKind::Electromagnet, Vec2::new(500.0, 500.0), 0.0, 0);
        magnet.variant = Variant::Electromagnet {
            cycle_timer: 0.0,
            period_scale: 1.0,
            active: true,
        };
        let near = magnet.tank_force(Vec2::new(600.0, 500.0), &tuning);
        let far = magnet.tank_force(Vec2::new(900.0, 500.0), &tuning);
        assert!(near.x < 0.0 && far.x < 0.0);
        assert!(near.length() > far.length());
        // Inside its own body and beyond range: nothing
        assert_eq!(magnet.tank_force(Vec2::new(510.0, 500.0), &tuning), Vec2::ZERO);
        assert_eq!(magnet.tank_force(Vec2::new(1400.0, 500.0), &tuning), Vec2::ZERO);
        // Shells feel a stronger pull
        let shell = magnet.shell_force(Vec2::new(600.0, 500.0), &tuning);
        assert!((shell.length() - near.length() * tuning.obstacles.electromagnet_shell_factor).abs() < 1e-3);

        // Off for the second half of the cycle
        let period = tuning.obstacles.electromagnet_duty_cycle;
        magnet.update(period * 0.6, &[], &tuning);
        assert_eq!(magnet.tank_force(Vec2::new(600.0, 500.0), &tuning), Vec2::ZERO);
        magnet.update(period * 0.5, &[], &tuning);
        assert_ne!(magnet.tank_force(Vec2::new(600.0, 500.0), &tuning), Vec2::ZERO);
    }

    #[test]
    fn test_fan_pushes_only_inside_cone() {
        let tuning = Tuning::default();
        let fan = make(ObstacleKind::Fan, Vec2::new(100.0, 300.0), 0.0, 0);
        let ahead = fan.tank_force(Vec2::new(250.0, 300.0), &tuning);
        assert!(ahead.x > 0.0 && ahead.y.abs() < 1e-4);
        let closer = fan.tank_force(Vec2::new(150.0, 300.0), &tuning);
        assert!(closer.x > ahead.x);
        // Behind, off to the side, and past range
        assert_eq!(fan.tank_force(Vec2::new(0.0, 300.0), &tuning), Vec2::ZERO);
        assert_eq!(fan.tank_force(Vec2::new(150.0, 400.0), &tuning), Vec2::ZERO);
        assert_eq!(fan.tank_force(Vec2::new(450.0, 300.0), &tuning), Vec2::ZERO);
        // Fans don't block
        assert!(!fan.check_tank_collision(&tank_at(0, Vec2::new(100.0, 300.0)), &tuning).hit);
    }

    #[test]
    fn test_turret_targets_nearest_enemy_not_owner() {
        let tuning = Tuning::default();
        let mut turret = make(ObstacleKind::AutoTurret, Vec2::new(300.0, 300.0), 0.0, 0);
        let owner = tank_at(0, Vec2::new(320.0, 300.0));
        let enemy = tank_at(1, Vec2::new(300.0, 450.0));

        let mut fired = Vec::new();
        for _ in 0..120 {
            turret.update(SIM_DT, &[owner.clone(), enemy.clone()], &tuning);
            fired.extend(turret.take_pending_shells());
        }
        assert_eq!(fired.len(), 1);
        let shell = &fired[0];
        assert_eq!(shell.owner, 0);
        assert!(shell.vel.y > 0.0 && shell.vel.x.abs() < shell.vel.y * 0.15);
        assert!((shell.vel.length() - tuning.shells.speed * tuning.obstacles.turret_shell_speed_factor).abs() < 1e-2);
        assert_eq!(shell.damage, tuning.obstacles.turret_damage);
        assert_eq!(shell.max_range, tuning.obstacles.turret_range);
    }

    #[test]
    fn test_turret_ignores_out_of_range() {
        let tuning = Tuning::default();
        let mut turret = make(ObstacleKind::AutoTurret, Vec2::new(300.0, 300.0), 0.0, 0);
        let enemy = tank_at(1, Vec2::new(900.0, 300.0));
        for _ in 0..60 {
            turret.update(SIM_DT, std::slice::from_ref(&enemy), &tuning);
        }
        assert!(turret.take_pending_shells().is_empty());
    }

    #[test]
    fn test_placement_rules() {
        let tuning = Tuning::default();
        let arena = Arena::new(1280.0, 720.0);

        let ok = make(ObstacleKind::Mine, Vec2::new(640.0, 360.0), 0.0, 0);
        assert!(ok.is_valid_placement(&[], &[], &arena, &tuning));

        let edge = make(ObstacleKind::Mine, Vec2::new(25.0, 360.0), 0.0, 0);
        assert!(!edge.is_valid_placement(&[], &[], &arena, &tuning));

        // Wall corners must clear the margin too
        let wall = make(ObstacleKind::SolidWall, Vec2::new(60.0, 360.0), 0.0, 0);
        assert!(!wall.is_valid_placement(&[], &[], &arena, &tuning));

        let neighbour = make(ObstacleKind::Pit, Vec2::new(670.0, 360.0), 0.0, 1);
        assert!(!ok.is_valid_placement(std::slice::from_ref(&neighbour), &[], &arena, &tuning));

        let tank = tank_at(1, Vec2::new(700.0, 360.0));
        assert!(!ok.is_valid_placement(&[], std::slice::from_ref(&tank), &arena, &tuning));

        // An obstacle doesn't crowd itself
        let placed = vec![ok.clone()];
        assert!(placed[0].is_valid_placement(&placed, &[], &arena, &tuning));
    }

    #[test]
    fn test_appearance_darkens_breakable_wall() {
        let tuning = Tuning::default();
        let mut wall = make(ObstacleKind::BreakableWall, Vec2::new(300.0, 300.0), 0.3, 0);
        assert_eq!(wall.appearance(&tuning).shade, 1.0);
        wall.take_damage(25.0);
        let look = wall.appearance(&tuning);
        assert!((look.shade - 0.5).abs() < 1e-4);
        assert!(matches!(look.shape, Shape::Rect { .. }));

        let preview = Preview::new(ObstacleKind::Fan, Vec2::new(300.0, 300.0), 0.0, false, &tuning);
        assert!(!preview.valid);
        assert_eq!(preview.range, Some(tuning.obstacles.fan_range));
    }
}
