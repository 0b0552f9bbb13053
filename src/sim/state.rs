//! World state and round flow
//!
//! Owns every frame-global container (tanks, shells, obstacles, explosions),
//! the single seeded RNG, the AI controllers and the round/match phase.

use glam::Vec2;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::ai::AiController;
use super::obstacle::{CollectionEffect, Obstacle, ObstacleKind, Preview, placement_is_valid};
use super::shell::Shell;
use super::tank::Tank;
use crate::consts::{MAX_TANKS, MIN_DIVISOR};
use crate::scoreboard::Scoreboard;
use crate::tuning::Tuning;
use crate::{Arena, PlayerId};

/// Where the match is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Tanks are parked; players place obstacles
    Placement,
    /// Fighting
    Playing,
    /// Round decided, field still animating
    RoundOver,
    /// All rounds played
    MatchOver,
}

/// Who drives a tank slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    Human,
    Ai,
}

/// Something that happened this frame, for audio and scoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    RoundStarted { round: u32 },
    ShellFired { owner: PlayerId, pos: Vec2, from_turret: bool },
    ShellImpact { pos: Vec2 },
    ShellReflected { pos: Vec2 },
    Ricochet { pos: Vec2, fragments: usize },
    TankHit { victim: PlayerId, attacker: PlayerId, damage: f32 },
    TankDestroyed { victim: PlayerId, killer: Option<PlayerId> },
    /// Kill worth points (never a self-kill)
    KillCredited { killer: PlayerId, victim: PlayerId },
    ObstacleDestroyed { kind: ObstacleKind, pos: Vec2 },
    MineDetonated { owner: PlayerId, victim: PlayerId, pos: Vec2 },
    PickupCollected { kind: ObstacleKind, effect: CollectionEffect },
    TankCollision { a: PlayerId, b: PlayerId, impact_speed: f32 },
    Teleported { player: PlayerId, to: Vec2 },
    Trapped { player: PlayerId },
    RoundOver { round: u32, winner: Option<PlayerId> },
    MatchOver { winner: Option<PlayerId> },
}

/// Expanding fireball, purely visual
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Explosion {
    pub pos: Vec2,
    pub timer: f32,
    pub duration: f32,
    pub max_radius: f32,
}

impl Explosion {
    pub fn new(pos: Vec2, duration: f32, max_radius: f32) -> Self {
        Self {
            pos,
            timer: 0.0,
            duration: duration.max(MIN_DIVISOR),
            max_radius,
        }
    }

    /// Impact-sized burst
    pub fn small(pos: Vec2, tuning: &Tuning) -> Self {
        Self::new(pos, tuning.effects.explosion_duration, tuning.effects.explosion_max_radius)
    }

    /// Tank or turret going up
    pub fn large(pos: Vec2, tuning: &Tuning) -> Self {
        Self::new(
            pos,
            tuning.effects.destroy_explosion_duration,
            tuning.effects.destroy_explosion_max_radius,
        )
    }

    pub fn update(&mut self, dt: f32) {
        self.timer += dt;
    }

    /// 0 at spawn, 1 when finished
    pub fn progress(&self) -> f32 {
        (self.timer / self.duration).clamp(0.0, 1.0)
    }

    pub fn radius(&self) -> f32 {
        self.max_radius * self.progress()
    }

    pub fn alpha(&self) -> f32 {
        1.0 - self.progress()
    }

    pub fn is_done(&self) -> bool {
        self.timer >= self.duration
    }
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct World {
    pub seed: u64,
    pub rng: Pcg32,
    pub arena: Arena,
    /// Slot order; `tanks[i].player == i`
    pub tanks: Vec<Tank>,
    pub controllers: Vec<Controller>,
    /// Indexed by slot, `None` for human slots
    pub ai: Vec<Option<AiController>>,
    pub shells: Vec<Shell>,
    pub obstacles: Vec<Obstacle>,
    pub explosions: Vec<Explosion>,
    pub scoreboard: Scoreboard,
    pub phase: RoundPhase,
    /// 1-based once the first placement starts
    pub round: u32,
    /// Seconds spent in the current phase
    pub phase_timer: f32,
    /// Seconds since any tank last lost health
    pub stalemate_timer: f32,
    /// Per-slot health as of the previous frame
    pub(crate) last_health: Vec<f32>,
    pub round_winner: Option<PlayerId>,
}

impl World {
    /// New match with one slot per controller (at most `MAX_TANKS`), already
    /// in the first placement phase
    pub fn new(seed: u64, controllers: &[Controller], arena: Arena, tuning: &Tuning) -> Self {
        let controllers: Vec<Controller> = controllers.iter().copied().take(MAX_TANKS).collect();
        let mut rng = Pcg32::seed_from_u64(seed);
        let ai = controllers
            .iter()
            .enumerate()
            .map(|(slot, c)| (*c == Controller::Ai).then(|| AiController::new(slot, tuning, &mut rng)))
            .collect();

        let mut world = Self {
            seed,
            rng,
            arena,
            tanks: Vec::new(),
            scoreboard: Scoreboard::new(controllers.len()),
            controllers,
            ai,
            shells: Vec::new(),
            obstacles: Vec::new(),
            explosions: Vec::new(),
            phase: RoundPhase::Placement,
            round: 0,
            phase_timer: 0.0,
            stalemate_timer: 0.0,
            last_health: Vec::new(),
            round_winner: None,
        };
        world.start_placement(tuning);
        world
    }

    pub fn player_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn tank(&self, player: PlayerId) -> Option<&Tank> {
        self.tanks.get(player)
    }

    pub fn alive_count(&self) -> usize {
        self.tanks.iter().filter(|t| t.is_alive()).count()
    }

    pub fn is_match_over(&self) -> bool {
        self.phase == RoundPhase::MatchOver
    }

    /// Begin the next round's placement: fresh tanks on shuffled corners,
    /// no shells or explosions, dead obstacles cleared (all of them on the
    /// first round)
    pub fn start_placement(&mut self, tuning: &Tuning) {
        self.round += 1;

        let mut corners: Vec<usize> = (0..MAX_TANKS).collect();
        corners.shuffle(&mut self.rng);
        let margin = tuning.flow.spawn_margin;
        self.tanks = (0..self.player_count())
            .map(|slot| {
                let corner = corners[slot];
                Tank::new(
                    slot,
                    self.arena.spawn_point(corner, margin),
                    self.arena.spawn_angle(corner),
                    tuning,
                )
            })
            .collect();

        self.shells.clear();
        self.explosions.clear();
        if self.round <= 1 {
            self.obstacles.clear();
        } else {
            self.obstacles.retain(|o| o.is_alive());
        }

        self.phase = RoundPhase::Placement;
        self.phase_timer = 0.0;
        self.round_winner = None;
        log::info!("Round {} placement ({} obstacles carried over)", self.round, self.obstacles.len());
    }

    /// Whether `kind` could go at `pos` right now
    pub fn preview(&self, kind: ObstacleKind, pos: Vec2, angle: f32, tuning: &Tuning) -> Preview {
        let valid = placement_is_valid(kind, pos, angle, &self.obstacles, &self.tanks, &self.arena, tuning);
        Preview::new(kind, pos, angle, valid, tuning)
    }

    /// Validate and accept a candidate obstacle. Returns false (and places
    /// nothing) if the spot is not allowed.
    pub fn try_place(
        &mut self,
        kind: ObstacleKind,
        pos: Vec2,
        angle: f32,
        owner: PlayerId,
        tuning: &Tuning,
    ) -> bool {
        if !placement_is_valid(kind, pos, angle, &self.obstacles, &self.tanks, &self.arena, tuning) {
            log::debug!("Player {} can't place {:?} at ({:.0}, {:.0})", owner, kind, pos.x, pos.y);
            return false;
        }
        let obstacle = Obstacle::new(kind, pos, angle, owner, tuning, &mut self.rng);
        self.obstacles.push(obstacle);
        log::debug!("Player {} placed {:?} at ({:.0}, {:.0})", owner, kind, pos.x, pos.y);
        true
    }

    /// Random placement for an AI slot, giving up after the configured number
    /// of attempts
    pub fn place_for_ai(&mut self, owner: PlayerId, kind: ObstacleKind, tuning: &Tuning) -> bool {
        for _ in 0..tuning.ai.placement_attempts {
            let pos = AiController::placement_position(&self.arena, tuning, &mut self.rng);
            let angle = AiController::placement_angle(&mut self.rng);
            if self.try_place(kind, pos, angle, owner, tuning) {
                return true;
            }
        }
        log::warn!("Player {} found no room for {:?}; skipping", owner, kind);
        false
    }

    /// Let every AI slot pick and place one obstacle
    pub fn place_all_ai(&mut self, tuning: &Tuning) {
        for slot in 0..self.player_count() {
            if self.controllers[slot] == Controller::Ai {
                let kind = AiController::choose_obstacle(&mut self.rng);
                self.place_for_ai(slot, kind, tuning);
            }
        }
    }

    /// Placement done: start fighting. The returned event is already on the
    /// scoreboard.
    pub fn start_round(&mut self, tuning: &Tuning) -> GameEvent {
        self.phase = RoundPhase::Playing;
        self.phase_timer = 0.0;
        self.stalemate_timer = 0.0;
        self.last_health = self.tanks.iter().map(|t| t.health()).collect();
        log::info!("Round {} started", self.round);
        let event = GameEvent::RoundStarted { round: self.round };
        self.scoreboard.record(&event, &tuning.flow);
        event
    }

    /// Whether any tank has lost health since the last call, remembering the
    /// current values for the next one
    pub(crate) fn any_health_lost(&mut self) -> bool {
        let mut lost = false;
        for (slot, tank) in self.tanks.iter().enumerate() {
            let health = tank.health();
            match self.last_health.get_mut(slot) {
                Some(last) => {
                    lost |= health < *last;
                    *last = health;
                }
                None => self.last_health.push(health),
            }
        }
        lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(seed: u64) -> World {
        World::new(
            seed,
            &[Controller::Human, Controller::Ai, Controller::Ai, Controller::Ai],
            Arena::default(),
            &Tuning::default(),
        )
    }

    #[test]
    fn test_new_world_is_in_first_placement() {
        let w = world(1);
        assert_eq!(w.round, 1);
        assert_eq!(w.phase, RoundPhase::Placement);
        assert_eq!(w.tanks.len(), 4);
        assert!(w.ai[0].is_none());
        assert!(w.ai[1..].iter().all(|a| a.is_some()));
        for (slot, tank) in w.tanks.iter().enumerate() {
            assert_eq!(tank.player, slot);
        }
    }

    #[test]
    fn test_spawn_corners_are_distinct() {
        let tuning = Tuning::default();
        let w = world(5);
        for (i, a) in w.tanks.iter().enumerate() {
            assert!(w.arena.contains_with_margin(a.pos, tuning.flow.spawn_margin - 1.0));
            for b in &w.tanks[i + 1..] {
                assert!(a.pos.distance(b.pos) > 100.0);
            }
        }
    }

    #[test]
    fn test_too_many_controllers_truncated() {
        let w = World::new(3, &[Controller::Ai; 6], Arena::default(), &Tuning::default());
        assert_eq!(w.player_count(), MAX_TANKS);
        assert_eq!(w.scoreboard.players.len(), MAX_TANKS);
    }

    #[test]
    fn test_try_place_validates() {
        let tuning = Tuning::default();
        let mut w = world(2);
        let center = w.arena.center();
        assert!(w.try_place(ObstacleKind::SolidWall, center, 0.0, 0, &tuning));
        // Too close to the first one
        assert!(!w.try_place(ObstacleKind::Mine, center + Vec2::new(20.0, 0.0), 0.0, 1, &tuning));
        assert!(!w.preview(ObstacleKind::Mine, center + Vec2::new(20.0, 0.0), 0.0, &tuning).valid);
        // Outside the arena
        assert!(!w.try_place(ObstacleKind::Mine, Vec2::new(-50.0, 300.0), 0.0, 1, &tuning));
        assert_eq!(w.obstacles.len(), 1);
    }

    #[test]
    fn test_place_for_ai_gives_up_quietly() {
        let tuning = Tuning::default();
        let mut w = world(3);
        // Too small to fit anything past the placement margin
        w.arena = Arena::new(60.0, 60.0);
        w.tanks.clear();
        assert!(!w.place_for_ai(1, ObstacleKind::Pit, &tuning));
        assert!(w.obstacles.is_empty());
    }

    #[test]
    fn test_place_all_ai_skips_humans() {
        let tuning = Tuning::default();
        let mut w = world(4);
        w.place_all_ai(&tuning);
        assert!(w.obstacles.iter().all(|o| o.owner != 0));
        assert!(!w.obstacles.is_empty());
    }

    #[test]
    fn test_next_placement_prunes_dead_obstacles() {
        let tuning = Tuning::default();
        let mut w = world(6);
        let center = w.arena.center();
        assert!(w.try_place(ObstacleKind::BreakableWall, center, 0.0, 0, &tuning));
        assert!(w.try_place(ObstacleKind::Pit, center + Vec2::new(200.0, 0.0), 0.0, 1, &tuning));
        w.obstacles[0].take_damage(1.0e6);
        w.start_placement(&tuning);
        assert_eq!(w.round, 2);
        assert_eq!(w.obstacles.len(), 1);
        assert_eq!(w.obstacles[0].kind(), ObstacleKind::Pit);
    }

    #[test]
    fn test_start_round() {
        let tuning = Tuning::default();
        let mut w = world(7);
        let event = w.start_round(&tuning);
        assert_eq!(event, GameEvent::RoundStarted { round: 1 });
        assert_eq!(w.phase, RoundPhase::Playing);
        assert_eq!(w.last_health, vec![tuning.tank.max_health; 4]);
    }

    #[test]
    fn test_start_round_resets_round_kills() {
        let tuning = Tuning::default();
        let mut w = world(8);
        w.start_round(&tuning);
        w.scoreboard.record(&GameEvent::KillCredited { killer: 2, victim: 1 }, &tuning.flow);
        assert_eq!(w.scoreboard.get(2).unwrap().round_kills, 1);

        w.start_placement(&tuning);
        w.start_round(&tuning);
        let p = w.scoreboard.get(2).unwrap();
        assert_eq!(p.round_kills, 0);
        assert_eq!(p.kills, 1);
    }

    #[test]
    fn test_health_loss_tracked_per_tank() {
        let tuning = Tuning::default();
        let mut w = world(9);
        w.start_round(&tuning);
        assert!(!w.any_health_lost());

        // A heal elsewhere doesn't mask damage to another tank
        w.tanks[1].take_damage(200.0, 0, &tuning);
        assert!(w.any_health_lost());
        w.tanks[0].take_damage(5.0, 1, &tuning);
        w.tanks[1].heal(0.5, &tuning);
        assert!(w.any_health_lost());

        w.tanks[2].heal(0.5, &tuning);
        assert!(!w.any_health_lost());
    }

    #[test]
    fn test_explosion_lifecycle() {
        let tuning = Tuning::default();
        let mut e = Explosion::small(Vec2::ZERO, &tuning);
        assert_eq!(e.radius(), 0.0);
        e.update(tuning.effects.explosion_duration * 0.5);
        assert!((e.radius() - tuning.effects.explosion_max_radius * 0.5).abs() < 1e-3);
        assert!(!e.is_done());
        e.update(tuning.effects.explosion_duration);
        assert!(e.is_done());
        assert_eq!(e.alpha(), 0.0);
    }
}
