//! Match scoreboard
//!
//! Fed by simulation events: kill credit, pickup score and round wins.

use serde::{Deserialize, Serialize};

use crate::PlayerId;
use crate::sim::GameEvent;
use crate::tuning::FlowTuning;

/// One player's tally
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub score: i32,
    pub kills: u32,
    /// Kills in the current round
    pub round_kills: u32,
    pub rounds_won: u32,
}

/// Scores for every player slot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scoreboard {
    pub players: Vec<PlayerScore>,
}

impl Scoreboard {
    /// Create a zeroed board for `players` slots
    pub fn new(players: usize) -> Self {
        Self {
            players: vec![PlayerScore::default(); players],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, player: PlayerId) -> Option<&PlayerScore> {
        self.players.get(player)
    }

    pub fn score(&self, player: PlayerId) -> i32 {
        self.players.get(player).map(|p| p.score).unwrap_or(0)
    }

    /// Add points (may be negative). Unknown slots are ignored.
    pub fn add_points(&mut self, player: PlayerId, points: i32) {
        if let Some(p) = self.players.get_mut(player) {
            p.score += points;
        }
    }

    /// Apply one simulation event
    pub fn record(&mut self, event: &GameEvent, flow: &FlowTuning) {
        match *event {
            GameEvent::RoundStarted { .. } => {
                for p in &mut self.players {
                    p.round_kills = 0;
                }
            }
            GameEvent::KillCredited { killer, .. } => {
                if let Some(p) = self.players.get_mut(killer) {
                    p.score += flow.points_for_kill;
                    p.kills += 1;
                    p.round_kills += 1;
                }
            }
            GameEvent::PickupCollected { effect, .. } if effect.score != 0 => {
                self.add_points(effect.player, effect.score);
            }
            GameEvent::RoundOver {
                winner: Some(winner), ..
            } => {
                if let Some(p) = self.players.get_mut(winner) {
                    p.score += flow.points_for_surviving;
                    p.rounds_won += 1;
                }
            }
            _ => {}
        }
    }

    /// Players by score, highest first; ties keep slot order
    pub fn standings(&self) -> Vec<(PlayerId, i32)> {
        let mut order: Vec<(PlayerId, i32)> = self.players.iter().map(|p| p.score).enumerate().collect();
        order.sort_by(|a, b| b.1.cmp(&a.1));
        order
    }

    /// Sole leader, or None on a tie for first
    pub fn leader(&self) -> Option<PlayerId> {
        let standings = self.standings();
        match standings.as_slice() {
            [] => None,
            [(only, _)] => Some(*only),
            [(first, top), (_, second), ..] => (top > second).then_some(*first),
        }
    }
}
