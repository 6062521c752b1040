//! Domain types: teams, league structure, games and identifiers.

pub mod game;
pub mod ids;
pub mod team;

pub use game::{validate_schedule, Game, GameResult, Outcome};
pub use ids::{GameId, ScenarioId, TeamId};
pub use team::{League, RatingMap, Team};
