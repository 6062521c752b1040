//! Model and seeding configuration.
//!
//! Both structs deserialize with defaults for every field, so a TOML file
//! only needs the values it wants to change. `validate()` is the single
//! place range checks live; every engine assumes a validated config.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Scenario counts below this still run but produce a warning: Wilson
/// intervals at n < 1000 are wider than most reports assume.
pub const MIN_RECOMMENDED_SCENARIOS: u32 = 1000;

/// How ratings evolve inside one simulated scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationMode {
    /// Every game is evaluated against the rating snapshot taken at
    /// simulation start.
    #[default]
    Cold,
    /// Each scenario carries a private copy of the ratings and updates it
    /// after every simulated game.
    Hot,
}

/// What the tiebreak resolver does when every rule leaves a group tied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiebreakFallback {
    /// Order the remaining teams by ascending team id.
    #[default]
    TeamId,
    /// Abort the run with a tiebreak exhaustion error.
    Error,
}

/// Rating and simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of Monte Carlo scenarios.
    pub scenario_count: u32,
    /// Global reproducibility key for the scenario sampler.
    pub random_seed: u64,
    /// Rating learning rate.
    pub k_factor: f64,
    /// Base home-field bonus in rating points.
    pub home_advantage_points: f64,
    /// Rating gap that corresponds to 10:1 odds.
    pub elo_scale: f64,
    /// Margin-of-victory shape constants.
    pub mov_base: f64,
    pub mov_divisor: f64,
    /// Splice known results into every scenario instead of simulating them.
    pub include_actuals: bool,
    pub simulation_mode: SimulationMode,
    /// Mean of the (exponential) margin drawn for simulated games.
    pub simulated_margin_mean: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            scenario_count: 10_000,
            random_seed: 42,
            k_factor: 20.0,
            home_advantage_points: 48.0,
            elo_scale: 400.0,
            mov_base: 2.2,
            mov_divisor: 0.001,
            include_actuals: true,
            simulation_mode: SimulationMode::Cold,
            simulated_margin_mean: 10.0,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.scenario_count < 1 {
            return Err(ConfigurationError::InvalidScenarioCount(self.scenario_count));
        }
        positive("k_factor", self.k_factor)?;
        positive("elo_scale", self.elo_scale)?;
        positive("mov_base", self.mov_base)?;
        positive("simulated_margin_mean", self.simulated_margin_mean)?;
        if !self.mov_divisor.is_finite() || self.mov_divisor < 0.0 {
            return Err(ConfigurationError::OutOfRange {
                field: "mov_divisor",
                value: self.mov_divisor,
                reason: "must be finite and non-negative",
            });
        }
        if !self.home_advantage_points.is_finite() {
            return Err(ConfigurationError::OutOfRange {
                field: "home_advantage_points",
                value: self.home_advantage_points,
                reason: "must be finite",
            });
        }
        Ok(())
    }

    /// True when the scenario count is valid but statistically thin.
    pub fn below_recommended_scenarios(&self) -> bool {
        self.scenario_count < MIN_RECOMMENDED_SCENARIOS
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::OutOfRange {
            field,
            value,
            reason: "must be finite and greater than zero",
        })
    }
}

/// Playoff structure and tiebreak parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedingConfig {
    /// Playoff seeds per conference (capped at conference size).
    pub playoff_seeds: u32,
    /// Minimum games against common opponents before that rule applies.
    pub min_common_games: u32,
    pub fallback: TiebreakFallback,
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            playoff_seeds: 7,
            min_common_games: 4,
            fallback: TiebreakFallback::TeamId,
        }
    }
}

impl SeedingConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.playoff_seeds == 0 {
            return Err(ConfigurationError::NoPlayoffSeeds);
        }
        Ok(())
    }
}
