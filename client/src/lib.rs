//! # Monty Hall Client Library
//!
//! This library provides a reference player for the Monty Hall game server
//! and a local simulation of the same game.
//!
//! ## Door Strategies
//!
//! After picking a door the server reveals an empty one among the rest. The
//! player then either sticks with the first pick, switches to the one
//! remaining closed door, or flips a coin between the two. Switching wins
//! two games out of three, staying wins one in three, and the coin flip
//! lands in between at one in two.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! Plays complete games against a server over TCP:
//! - `PLAY` / `GUES` / `OPEN` / `DONE` request sequence
//! - Backing off when the server throttles with `WAIT`
//! - Per-game outcome reporting
//!
//! ### Simulation
//! `simulate` plays rounds locally with the shared game rules and reports
//! the observed win rate, a quick sanity check of the strategies above.
//!
//! ## Usage Example
//!
//! ```rust
//! use client::{simulate, Strategy};
//!
//! let report = simulate(Strategy::Switch, 1000);
//! assert_eq!(report.rounds, 1000);
//! println!("switching won {:.1}% of games", 100.0 * report.win_rate());
//! ```

pub mod network;

use clap::ValueEnum;
use rand::Rng;
use shared::{Game, DOOR_COUNT};

/// How the player picks the door to open after receiving a hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Always open the originally selected door
    Stay,
    /// Flip a coin between the selected door and the remaining one
    Random,
    /// Always open the remaining closed door
    Switch,
}

/// Picks the door to open given the first guess and the server's hint
pub fn choose_door(strategy: Strategy, guess: usize, hint: Option<usize>) -> usize {
    let remaining = (0..DOOR_COUNT)
        .find(|door| *door != guess && Some(*door) != hint)
        .unwrap_or(guess);

    match strategy {
        Strategy::Stay => guess,
        Strategy::Switch => remaining,
        Strategy::Random => {
            if rand::thread_rng().gen_bool(0.5) {
                guess
            } else {
                remaining
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub rounds: u32,
    pub wins: u32,
    pub total_prize: i64,
}

impl SimulationReport {
    pub fn win_rate(&self) -> f64 {
        if self.rounds == 0 {
            return 0.0;
        }
        self.wins as f64 / self.rounds as f64
    }
}

/// Plays `rounds` games locally with the given strategy
pub fn simulate(strategy: Strategy, rounds: u32) -> SimulationReport {
    let mut report = SimulationReport {
        rounds,
        ..SimulationReport::default()
    };
    let mut rng = rand::thread_rng();

    for _ in 0..rounds {
        let mut game = Game::new();
        let guess = game.select(rng.gen_range(0..DOOR_COUNT));
        let hint = game.hint();
        let prize = game.open(choose_door(strategy, guess, hint));

        report.total_prize += prize;
        if prize > 0 {
            report.wins += 1;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_choose_door_stay() {
        assert_eq!(choose_door(Strategy::Stay, 1, Some(2)), 1);
    }

    #[test]
    fn test_choose_door_switch() {
        assert_eq!(choose_door(Strategy::Switch, 0, Some(1)), 2);
        assert_eq!(choose_door(Strategy::Switch, 2, Some(0)), 1);
        assert_eq!(choose_door(Strategy::Switch, 1, Some(2)), 0);
    }

    #[test]
    fn test_choose_door_random_stays_in_play() {
        for _ in 0..100 {
            let door = choose_door(Strategy::Random, 0, Some(2));
            assert!(door == 0 || door == 1);
        }
    }

    #[test]
    fn test_choose_door_without_hint() {
        assert_eq!(choose_door(Strategy::Switch, 0, None), 1);
    }

    #[test]
    fn test_simulation_odds() {
        let rounds = 20_000;

        assert_approx_eq!(simulate(Strategy::Stay, rounds).win_rate(), 1.0 / 3.0, 0.03);
        assert_approx_eq!(simulate(Strategy::Random, rounds).win_rate(), 0.5, 0.03);
        assert_approx_eq!(simulate(Strategy::Switch, rounds).win_rate(), 2.0 / 3.0, 0.03);
    }

    #[test]
    fn test_simulation_totals() {
        let report = simulate(Strategy::Switch, 500);
        assert_eq!(report.rounds, 500);
        assert_eq!(report.total_prize, report.wins as i64 * shared::PRIZE_VALUE);
    }

    #[test]
    fn test_empty_simulation() {
        let report = simulate(Strategy::Stay, 0);
        assert_eq!(report.win_rate(), 0.0);
    }
}
