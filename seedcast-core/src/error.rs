//! Error taxonomy for the forecasting core.
//!
//! Every error is fatal to the run: the computation is pure, so the caller
//! must fix the input (or configuration) and rerun from scratch. Each variant
//! names the offending game, team or scenario and the violated invariant.

use thiserror::Error;

use crate::domain::{GameId, ScenarioId, TeamId};

/// Top-level error returned by the core engines.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("data integrity violation: {0}")]
    DataIntegrity(#[from] DataIntegrityError),

    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("tiebreak exhausted: {0}")]
    TiebreakExhaustion(#[from] TiebreakExhaustionError),
}

/// Input data violates an invariant the pipeline depends on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataIntegrityError {
    #[error("game {game}: unknown team '{team}'")]
    UnknownTeam { game: GameId, team: TeamId },

    #[error("team '{team}' has no rating")]
    MissingRating { team: TeamId },

    #[error("team '{team}' is listed more than once in the league")]
    DuplicateTeam { team: TeamId },

    #[error("game {game}: duplicate game id")]
    DuplicateGameId { game: GameId },

    #[error("game {game}: id does not increase after game {previous} (ids must follow chronology)")]
    NonIncreasingGameId { previous: GameId, game: GameId },

    #[error("game {game}: non-tie result has no score margin")]
    MissingMargin { game: GameId },

    #[error("game {game}: winner '{winner}' is not a participant")]
    InvalidWinner { game: GameId, winner: TeamId },

    #[error("game {game}: team '{team}' cannot play itself")]
    SelfMatch { game: GameId, team: TeamId },

    #[error("game {game}: has no result to apply")]
    NoResult { game: GameId },

    #[error("game {game}: result references a game that is not on the schedule")]
    UnknownGame { game: GameId },

    #[error("scenario {scenario}: standings missing team '{team}'")]
    MissingStanding { scenario: ScenarioId, team: TeamId },

    #[error("scenario {scenario}: standings list team '{team}' more than once")]
    DuplicateStanding { scenario: ScenarioId, team: TeamId },

    #[error("scenario {scenario}: standings contain unknown team '{team}'")]
    UnexpectedStanding { scenario: ScenarioId, team: TeamId },
}

/// A configuration value is outside its valid range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("scenario_count must be at least 1 (got {0})")]
    InvalidScenarioCount(u32),

    #[error("{field} = {value} is out of range: {reason}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("playoff_seeds must be at least 1")]
    NoPlayoffSeeds,

    #[error("conference '{conference}' has {divisions} divisions but only {seeds} playoff seeds")]
    TooManyDivisions {
        conference: String,
        divisions: usize,
        seeds: u32,
    },

    #[error("thread count must be at least 1")]
    InvalidThreadCount,
}

/// Every tiebreak rule left a group tied and the fallback policy is `Error`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("scenario {scenario}: teams {teams:?} remain tied after every tiebreak rule")]
pub struct TiebreakExhaustionError {
    pub scenario: ScenarioId,
    pub teams: Vec<TeamId>,
}

pub type Result<T> = std::result::Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = ForecastError::from(DataIntegrityError::NonIncreasingGameId {
            previous: GameId(12),
            game: GameId(7),
        });
        let msg = err.to_string();
        assert!(msg.contains("game 7"), "{msg}");
        assert!(msg.contains("game 12"), "{msg}");

        let err = ForecastError::from(ConfigurationError::InvalidScenarioCount(0));
        assert!(err.to_string().contains("scenario_count"));
    }
}
