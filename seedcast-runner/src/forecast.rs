//! Forecast pipeline: ratings fold, parallel scenarios, aggregation.
//!
//! Stages:
//! 1. Fold every completed game into the ratings (sequential).
//! 2. Simulate and seed each scenario (parallel, scenario-local state only).
//! 3. Reduce per-scenario results into estimates and game predictions.
//!
//! Scenarios are folded in fixed-size chunks and the chunks merged in
//! scenario order, so the output is identical for any thread count.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use seedcast_core::aggregate::{AggregateEstimate, EstimateAccumulator};
use seedcast_core::calibration::{calibrate, CalibrationReport};
use seedcast_core::domain::{RatingMap, ScenarioId, TeamId};
use seedcast_core::predictions::{GamePrediction, PredictionAccumulator};
use seedcast_core::rating::{RatingEngine, RatingParams, RatingUpdate};
use seedcast_core::simulator::{ScenarioOutcome, SeasonSimulator};
use seedcast_core::standings::ScenarioStandings;
use seedcast_core::tiebreak::{SeedAssignment, TiebreakResolver};
use seedcast_core::{ConfigurationError, ForecastError};

use crate::config::ForecastConfig;
use crate::data_loader::ForecastInputs;

/// Errors from the forecast pipeline.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("build scenario thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("fingerprint inputs: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

impl From<ConfigurationError> for RunError {
    fn from(err: ConfigurationError) -> Self {
        RunError::Forecast(err.into())
    }
}

/// One row of the standings stream: one team in one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRecord {
    pub scenario: ScenarioId,
    pub team: TeamId,
    pub conference: String,
    pub division: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub division_wins: u32,
    pub division_losses: u32,
    pub conference_wins: u32,
    pub conference_losses: u32,
    pub points_for: f64,
    pub points_against: f64,
    pub seed: Option<u32>,
    pub conference_rank: u32,
    pub division_winner: bool,
}

impl StandingRecord {
    fn rows(standings: &ScenarioStandings, seeds: &[SeedAssignment]) -> Vec<StandingRecord> {
        // Both are in team id order.
        standings
            .teams
            .iter()
            .zip(seeds)
            .map(|(line, seed)| StandingRecord {
                scenario: standings.scenario,
                team: line.team.clone(),
                conference: line.conference.clone(),
                division: line.division.clone(),
                wins: line.overall.wins,
                losses: line.overall.losses,
                ties: line.overall.ties,
                division_wins: line.division_record.wins,
                division_losses: line.division_record.losses,
                conference_wins: line.conference_record.wins,
                conference_losses: line.conference_record.losses,
                points_for: line.points_for,
                points_against: line.points_against,
                seed: seed.seed,
                conference_rank: seed.conference_rank,
                division_winner: seed.division_winner,
            })
            .collect()
    }
}

/// Scenarios per work unit. Chunk boundaries do not depend on the thread
/// count, so floating-point sums are reduced in the same order every run.
const SCENARIO_CHUNK: usize = 64;

/// Scenario results folded so far. Merging keeps scenario order.
struct Partial {
    estimates: EstimateAccumulator,
    predictions: PredictionAccumulator,
    records: Vec<StandingRecord>,
}

impl Partial {
    fn new(inputs: &ForecastInputs, seeds: u32) -> Self {
        Self {
            estimates: EstimateAccumulator::new(&inputs.league, seeds),
            predictions: PredictionAccumulator::new(),
            records: Vec::new(),
        }
    }

    fn push(
        mut self,
        outcome: ScenarioOutcome,
        seeds: Vec<SeedAssignment>,
        keep_records: bool,
    ) -> Result<Self, ForecastError> {
        self.estimates.push(&outcome.standings, &seeds)?;
        self.predictions.push(&outcome.games);
        if keep_records {
            self.records.extend(StandingRecord::rows(&outcome.standings, &seeds));
        }
        Ok(self)
    }

    fn merge(mut self, other: Partial) -> Self {
        self.estimates = self.estimates.merge(other.estimates);
        self.predictions = self.predictions.merge(other.predictions);
        self.records.extend(other.records);
        self
    }
}

/// Everything a forecast run produces.
#[derive(Debug, Clone)]
pub struct ForecastOutput {
    pub run_id: String,
    pub initial_ratings: RatingMap,
    pub final_ratings: RatingMap,
    pub rating_log: Vec<RatingUpdate>,
    pub estimates: Vec<AggregateEstimate>,
    pub predictions: Vec<GamePrediction>,
    /// Empty when the standings stream was switched off.
    pub standings: Vec<StandingRecord>,
    pub calibration: Option<CalibrationReport>,
    pub warnings: Vec<String>,
}

/// Content hash of the configuration and inputs (BLAKE3, hex).
pub fn fingerprint(config: &ForecastConfig, inputs: &ForecastInputs) -> Result<String, serde_json::Error> {
    let mut hasher = blake3::Hasher::new();
    serde_json::to_writer(&mut hasher, &config.model)?;
    serde_json::to_writer(&mut hasher, &config.seeding)?;
    serde_json::to_writer(&mut hasher, &inputs.league)?;
    serde_json::to_writer(&mut hasher, &inputs.schedule)?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Fold every completed game into the starting ratings.
pub fn fold_ratings(config: &ForecastConfig, inputs: &ForecastInputs) -> Result<RatingEngine, ForecastError> {
    let mut engine = RatingEngine::new(RatingParams::from(&config.model), inputs.league.ratings());
    let applied = engine.apply_all(&inputs.schedule)?;
    info!(games = applied, "ratings folded over completed games");
    Ok(engine)
}

/// Run the full pipeline.
pub fn run_forecast(config: &ForecastConfig, inputs: &ForecastInputs) -> Result<ForecastOutput, RunError> {
    config.validate()?;
    let run_id = fingerprint(config, inputs)?;
    let model = &config.model;
    info!(
        run_id = %&run_id[..12],
        teams = inputs.league.len(),
        games = inputs.schedule.len(),
        completed = inputs.completed_games(),
        scenarios = model.scenario_count,
        "forecast started"
    );

    let mut warnings = Vec::new();
    if model.below_recommended_scenarios() {
        let msg = format!(
            "scenario_count {} is below the recommended {}; intervals will be wide",
            model.scenario_count,
            seedcast_core::config::MIN_RECOMMENDED_SCENARIOS
        );
        warn!("{msg}");
        warnings.push(msg);
    }

    let engine = fold_ratings(config, inputs)?;
    let initial_ratings = inputs.league.ratings();
    let (final_ratings, rating_log) = engine.into_parts();
    let calibration = calibrate(&rating_log);

    let simulator = SeasonSimulator::new(&inputs.league, &inputs.schedule, &final_ratings, model)?;
    let resolver = TiebreakResolver::new(&inputs.league, config.seeding.clone())?;
    let seed_slots = config.seeding.playoff_seeds;
    let keep_records = config.output.standings;

    let scenarios: Vec<ScenarioId> = ScenarioId::range(model.scenario_count).collect();
    let reduce = || -> Result<Partial, ForecastError> {
        let chunks = scenarios
            .par_chunks(SCENARIO_CHUNK)
            .map(|chunk| {
                chunk.iter().try_fold(Partial::new(inputs, seed_slots), |partial, &scenario| {
                    let outcome = simulator.simulate(scenario);
                    let seeds = resolver.resolve(&outcome.standings)?;
                    partial.push(outcome, seeds, keep_records)
                })
            })
            .collect::<Result<Vec<Partial>, ForecastError>>()?;
        Ok(chunks
            .into_iter()
            .fold(Partial::new(inputs, seed_slots), Partial::merge))
    };

    let partial = match config.threads {
        Some(threads) => {
            debug!(threads, "building scenario thread pool");
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()?
                .install(reduce)?
        }
        None => reduce()?,
    };
    info!(scenarios = model.scenario_count, "scenarios simulated and seeded");

    Ok(ForecastOutput {
        run_id,
        initial_ratings,
        final_ratings,
        rating_log,
        estimates: partial.estimates.finish(),
        predictions: partial.predictions.finish(),
        standings: partial.records,
        calibration,
        warnings,
    })
}
