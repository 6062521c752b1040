//! Seedcast Core: ratings, season simulation, tiebreak seeding, aggregation.
//!
//! This crate contains the forecasting engines and nothing that touches the
//! filesystem:
//! - Domain types (teams, games, league structure, ids)
//! - Sequential ELO rating engine and off-season carry-over
//! - Keyed BLAKE3 scenario sampler
//! - Per-scenario season simulator and standings accumulator
//! - Tiebreak ladder and playoff seeding
//! - Cross-scenario aggregation, game predictions and calibration

pub mod aggregate;
pub mod calibration;
pub mod config;
pub mod domain;
pub mod error;
pub mod predictions;
pub mod rating;
pub mod sampler;
pub mod simulator;
pub mod standings;
pub mod tiebreak;

pub use config::{ModelConfig, SeedingConfig, SimulationMode, TiebreakFallback};
pub use error::{ConfigurationError, DataIntegrityError, ForecastError, Result, TiebreakExhaustionError};
