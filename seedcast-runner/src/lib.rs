//! Seedcast Runner: configuration, CSV loading, the parallel forecast
//! pipeline and artifact export.
//!
//! This crate builds on `seedcast-core` to provide:
//! - TOML run configuration with validated defaults
//! - CSV loaders for teams, ratings, schedule, results and adjustments
//! - The forecast pipeline (ratings fold, rayon scenario pool, aggregation)
//! - JSON manifest, CSV tables and a Markdown report per run

pub mod config;
pub mod data_loader;
pub mod export;
pub mod forecast;

pub use config::{ConfigError, DataPaths, ForecastConfig, OutputConfig};
pub use data_loader::{load_inputs, ForecastInputs, LoadError};
pub use export::{generate_report, load_manifest, save_artifacts, RunManifest, SCHEMA_VERSION};
pub use forecast::{fingerprint, fold_ratings, run_forecast, ForecastOutput, RunError, StandingRecord};
