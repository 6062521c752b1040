//! Monte Carlo season simulation.
//!
//! A `SeasonSimulator` is built once from validated inputs and is then
//! immutable; `simulate` is a pure function of the scenario id, so any
//! number of scenarios can run concurrently against one simulator.

use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, SimulationMode};
use crate::domain::{validate_schedule, Game, GameId, League, Outcome, RatingMap, ScenarioId, TeamId};
use crate::error::{DataIntegrityError, Result};
use crate::rating::{expected_home_win, rate_game, RatingParams};
use crate::sampler::ScenarioSampler;
use crate::standings::{ScenarioStandings, StandingsAccumulator};

/// How one game resolved inside one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedGame {
    pub game: GameId,
    pub week: u32,
    pub home: TeamId,
    pub away: TeamId,
    /// Model home-win probability at the moment the game was resolved.
    pub home_win_prob: f64,
    pub outcome: Outcome,
    pub margin: f64,
    /// False when the real result was spliced in.
    pub simulated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioOutcome {
    pub standings: ScenarioStandings,
    pub games: Vec<SimulatedGame>,
}

#[derive(Debug, Clone)]
struct PreparedGame {
    home: usize,
    away: usize,
    home_advantage: f64,
    actual: Option<(Outcome, f64)>,
}

/// Walks the full schedule once per scenario.
#[derive(Debug, Clone)]
pub struct SeasonSimulator<'a> {
    league: &'a League,
    schedule: &'a [Game],
    prepared: Vec<PreparedGame>,
    /// Rating snapshot by league index.
    ratings: Vec<f64>,
    params: RatingParams,
    sampler: ScenarioSampler,
    mode: SimulationMode,
    include_actuals: bool,
    margin_mean: f64,
}

impl<'a> SeasonSimulator<'a> {
    /// Validate the inputs and take the rating snapshot.
    pub fn new(
        league: &'a League,
        schedule: &'a [Game],
        ratings: &RatingMap,
        config: &ModelConfig,
    ) -> Result<Self> {
        config.validate()?;
        validate_schedule(league, schedule)?;

        let snapshot = league
            .teams()
            .iter()
            .map(|t| {
                ratings
                    .get(&t.id)
                    .copied()
                    .ok_or_else(|| DataIntegrityError::MissingRating { team: t.id.clone() })
            })
            .collect::<std::result::Result<Vec<f64>, _>>()?;

        let params = RatingParams::from(config);
        let mut prepared = Vec::with_capacity(schedule.len());
        for game in schedule {
            let index = |team: &TeamId| {
                league.index_of(team).ok_or_else(|| DataIntegrityError::UnknownTeam {
                    game: game.id,
                    team: team.clone(),
                })
            };
            prepared.push(PreparedGame {
                home: index(&game.home)?,
                away: index(&game.away)?,
                home_advantage: game.effective_home_advantage(params.home_advantage),
                actual: game.actual()?,
            });
        }

        Ok(Self {
            league,
            schedule,
            prepared,
            ratings: snapshot,
            params,
            sampler: ScenarioSampler::new(config.random_seed),
            mode: config.simulation_mode,
            include_actuals: config.include_actuals,
            margin_mean: config.simulated_margin_mean,
        })
    }

    pub fn league(&self) -> &League {
        self.league
    }

    pub fn schedule(&self) -> &[Game] {
        self.schedule
    }

    /// Home-win probability of a scheduled game under the snapshot.
    pub fn snapshot_probability(&self, index: usize) -> Option<f64> {
        let p = self.prepared.get(index)?;
        Some(expected_home_win(
            self.ratings[p.home],
            self.ratings[p.away],
            p.home_advantage,
            self.params.elo_scale,
        ))
    }

    /// Exponential margin of at least one point from a uniform draw.
    fn margin_from(&self, u: f64) -> f64 {
        1.0 + (-(1.0 - u).ln() * self.margin_mean).floor()
    }

    /// Play out one scenario.
    pub fn simulate(&self, scenario: ScenarioId) -> ScenarioOutcome {
        let mut standings = StandingsAccumulator::new(self.league, scenario);
        let mut games = Vec::with_capacity(self.schedule.len());
        let mut ratings = match self.mode {
            SimulationMode::Cold => None,
            SimulationMode::Hot => Some(self.ratings.clone()),
        };

        for (game, p) in self.schedule.iter().zip(&self.prepared) {
            let current = ratings.as_deref().unwrap_or(&self.ratings);
            let (home_rating, away_rating) = (current[p.home], current[p.away]);
            let prob = expected_home_win(home_rating, away_rating, p.home_advantage, self.params.elo_scale);

            let (outcome, margin, simulated) = match p.actual {
                Some((outcome, margin)) if self.include_actuals => (outcome, margin, false),
                _ => {
                    let u = self.sampler.outcome(scenario, game.id);
                    let outcome = if u < prob { Outcome::HomeWin } else { Outcome::AwayWin };
                    let margin = self.margin_from(self.sampler.margin(scenario, game.id));
                    if let Some(private) = ratings.as_mut() {
                        let rated = rate_game(
                            &self.params,
                            home_rating,
                            away_rating,
                            p.home_advantage,
                            outcome,
                            margin,
                        );
                        private[p.home] += rated.delta;
                        private[p.away] -= rated.delta;
                    }
                    (outcome, margin, true)
                }
            };

            standings.record_game(p.home, p.away, outcome, margin);
            games.push(SimulatedGame {
                game: game.id,
                week: game.week,
                home: game.home.clone(),
                away: game.away.clone(),
                home_win_prob: prob,
                outcome,
                margin,
                simulated,
            });
        }

        ScenarioOutcome {
            standings: standings.finish(),
            games,
        }
    }
}
