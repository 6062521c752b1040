//! Per-game outcome frequencies across scenarios.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{GameId, Outcome, TeamId};
use crate::simulator::SimulatedGame;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePrediction {
    pub game: GameId,
    pub week: u32,
    pub home: TeamId,
    pub away: TeamId,
    pub scenarios: u32,
    /// Fraction of scenarios the home side won.
    pub home_win_freq: f64,
    /// Mean model probability across scenarios (the snapshot value in cold mode).
    pub model_home_prob: f64,
    /// The real result was spliced in rather than simulated.
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct GameTally {
    week: u32,
    home: TeamId,
    away: TeamId,
    scenarios: u32,
    home_wins: u32,
    ties: u32,
    prob_sum: f64,
    completed: bool,
}

/// Accumulates `SimulatedGame`s keyed by game id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionAccumulator {
    games: BTreeMap<GameId, GameTally>,
}

impl PredictionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, games: &[SimulatedGame]) {
        for g in games {
            let tally = self.games.entry(g.game).or_insert_with(|| GameTally {
                week: g.week,
                home: g.home.clone(),
                away: g.away.clone(),
                scenarios: 0,
                home_wins: 0,
                ties: 0,
                prob_sum: 0.0,
                completed: !g.simulated,
            });
            tally.scenarios += 1;
            match g.outcome {
                Outcome::HomeWin => tally.home_wins += 1,
                Outcome::Tie => tally.ties += 1,
                Outcome::AwayWin => {}
            }
            tally.prob_sum += g.home_win_prob;
        }
    }

    pub fn merge(mut self, other: PredictionAccumulator) -> Self {
        for (id, theirs) in other.games {
            match self.games.get_mut(&id) {
                Some(mine) => {
                    mine.scenarios += theirs.scenarios;
                    mine.home_wins += theirs.home_wins;
                    mine.ties += theirs.ties;
                    mine.prob_sum += theirs.prob_sum;
                }
                None => {
                    self.games.insert(id, theirs);
                }
            }
        }
        self
    }

    /// Predictions in game id order. Ties count half a home win.
    pub fn finish(self) -> Vec<GamePrediction> {
        self.games
            .into_iter()
            .map(|(game, t)| {
                let n = t.scenarios.max(1) as f64;
                GamePrediction {
                    game,
                    week: t.week,
                    home: t.home,
                    away: t.away,
                    scenarios: t.scenarios,
                    home_win_freq: (t.home_wins as f64 + 0.5 * t.ties as f64) / n,
                    model_home_prob: t.prob_sum / n,
                    completed: t.completed,
                }
            })
            .collect()
    }
}

/// The predictions of one week.
pub fn for_week(predictions: &[GamePrediction], week: u32) -> Vec<&GamePrediction> {
    predictions.iter().filter(|p| p.week == week).collect()
}
