//! Forecast configuration file.
//!
//! One TOML file drives a run: model and seeding parameters, where the
//! input CSVs live and where artifacts go. Every section is optional and
//! falls back to its defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use seedcast_core::rating::PreseasonConfig;
use seedcast_core::{ConfigurationError, ModelConfig, SeedingConfig};

/// Errors from loading or validating a `ForecastConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigurationError),
}

/// Input file locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    /// `team,conference,division`
    pub teams: PathBuf,
    /// `team,rating`: ratings at the start of the result log.
    pub ratings: PathBuf,
    /// `game_id,week,home_team,away_team,neutral_site`
    pub schedule: PathBuf,
    /// `game_id,winner,margin`: empty winner is a tie.
    pub results: Option<PathBuf>,
    /// `game_id,adjustment`: rating points favouring the home side.
    pub adjustments: Option<PathBuf>,
    /// `team,win_total`: market win totals for the preseason blend.
    pub win_totals: Option<PathBuf>,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            teams: PathBuf::from("data/teams.csv"),
            ratings: PathBuf::from("data/ratings.csv"),
            schedule: PathBuf::from("data/schedule.csv"),
            results: None,
            adjustments: None,
            win_totals: None,
        }
    }
}

impl DataPaths {
    /// Resolve relative paths against `base` (the config file's directory).
    pub fn relative_to(mut self, base: &Path) -> Self {
        let join = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.teams = join(self.teams);
        self.ratings = join(self.ratings);
        self.schedule = join(self.schedule);
        self.results = self.results.map(join);
        self.adjustments = self.adjustments.map(join);
        self.win_totals = self.win_totals.map(join);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Keep the per-scenario standings stream (one row per team per scenario).
    pub standings: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("forecast-output"),
            standings: true,
        }
    }
}

/// Everything one forecast run needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub model: ModelConfig,
    pub seeding: SeedingConfig,
    pub preseason: PreseasonConfig,
    pub data: DataPaths,
    pub output: OutputConfig,
    /// Worker threads for the scenario pool; `None` uses rayon's global pool.
    pub threads: Option<usize>,
}

impl ForecastConfig {
    /// Load a config from a TOML file. Relative data paths resolve against
    /// the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.data = config.data.relative_to(base);
        }
        Ok(config)
    }

    /// Parse a config from a TOML string and validate it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.model.validate()?;
        self.seeding.validate()?;
        self.preseason.validate()?;
        if self.threads == Some(0) {
            return Err(ConfigurationError::InvalidThreadCount);
        }
        Ok(())
    }
}
