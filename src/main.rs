//! Tank Arena entry point
//!
//! Runs a headless all-AI match and logs the results.
//!
//! Usage: `tank-arena [seed] [tuning.json]`

use std::path::Path;

use tank_arena::consts::{MAX_TANKS, SIM_DT};
use tank_arena::sim::{Controller, GameEvent, RoundPhase, World, tick};
use tank_arena::{Arena, Tuning};

/// Safety valve for rounds that never resolve (20 simulated minutes)
const MAX_FRAMES_PER_ROUND: u32 = 60 * 60 * 20;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed = match args.next() {
        Some(arg) => arg.parse().unwrap_or_else(|_| {
            log::warn!("Seed {:?} is not a number, using 0", arg);
            0
        }),
        None => 0,
    };
    let tuning = match args.next() {
        Some(path) => Tuning::load(Path::new(&path)),
        None => Tuning::default(),
    };

    log::info!("Tank Arena (headless) starting with seed {}", seed);
    let mut world = World::new(seed, &[Controller::Ai; MAX_TANKS], Arena::default(), &tuning);

    while !world.is_match_over() {
        world.place_all_ai(&tuning);
        world.start_round(&tuning);
        let round = world.round;

        let mut frames = 0;
        while matches!(world.phase, RoundPhase::Playing | RoundPhase::RoundOver) && world.round == round {
            for event in tick(&mut world, &[], &tuning, SIM_DT) {
                log_event(&event);
            }
            frames += 1;
            if frames >= MAX_FRAMES_PER_ROUND {
                log::error!("Round {} did not finish after {} frames; aborting match", round, frames);
                report(&world);
                return;
            }
        }
    }

    report(&world);
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::KillCredited { killer, victim } => {
            log::info!("Player {} destroyed player {}", killer, victim);
        }
        GameEvent::RoundOver { round, winner } => match winner {
            Some(w) => log::info!("Round {} won by player {}", round, w),
            None => log::info!("Round {} ended in a draw", round),
        },
        GameEvent::MatchOver { winner } => match winner {
            Some(w) => log::info!("Match won by player {}", w),
            None => log::info!("Match tied"),
        },
        other => log::trace!("{:?}", other),
    }
}

fn report(world: &World) {
    for (rank, (player, score)) in world.scoreboard.standings().into_iter().enumerate() {
        let rounds = world.scoreboard.get(player).map(|p| p.rounds_won).unwrap_or(0);
        println!("{}. player {} - {} points, {} rounds won", rank + 1, player, score, rounds);
    }
}
