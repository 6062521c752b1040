//! Off-season carry-over: pull last season's ratings back toward the league
//! mean and optionally blend in a market win-total view of each team.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{RatingMap, TeamId};
use crate::error::{ConfigurationError, DataIntegrityError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreseasonConfig {
    /// League mean rating the carry-over regresses toward.
    pub mean: f64,
    /// Fraction of the distance to the mean removed each off-season.
    pub reversion_factor: f64,
    /// Win total that maps onto the mean rating.
    pub average_wins: f64,
    /// Rating points per projected win above or below average.
    pub points_per_win: f64,
    /// Weight of the market rating in the blend; the regressed rating gets
    /// the remainder.
    pub market_weight: f64,
}

impl Default for PreseasonConfig {
    fn default() -> Self {
        Self {
            mean: 1505.0,
            reversion_factor: 1.0 / 3.0,
            average_wins: 8.5,
            points_per_win: 25.0,
            market_weight: 2.0 / 3.0,
        }
    }
}

impl PreseasonConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("reversion_factor", self.reversion_factor),
            ("market_weight", self.market_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::OutOfRange {
                    field,
                    value,
                    reason: "must lie in [0, 1]",
                });
            }
        }
        for (field, value) in [
            ("mean", self.mean),
            ("average_wins", self.average_wins),
            ("points_per_win", self.points_per_win),
        ] {
            if !value.is_finite() {
                return Err(ConfigurationError::OutOfRange {
                    field,
                    value,
                    reason: "must be finite",
                });
            }
        }
        Ok(())
    }

    /// `old - factor * (old - mean)`
    pub fn regress(&self, old: f64) -> f64 {
        old - self.reversion_factor * (old - self.mean)
    }

    /// Rating implied by a projected win total.
    pub fn market_rating(&self, win_total: f64) -> f64 {
        self.mean + (win_total - self.average_wins) * self.points_per_win
    }

    pub fn preseason_rating(&self, old: f64, win_total: Option<f64>) -> f64 {
        let regressed = self.regress(old);
        match win_total {
            Some(wins) => {
                (1.0 - self.market_weight) * regressed + self.market_weight * self.market_rating(wins)
            }
            None => regressed,
        }
    }
}

/// Carry every team's rating into the new season.
///
/// Teams without a win total are only regressed. A win total for a team
/// that has no rating is an integrity error.
pub fn carry_over(
    config: &PreseasonConfig,
    ratings: &RatingMap,
    win_totals: &BTreeMap<TeamId, f64>,
) -> Result<RatingMap, DataIntegrityError> {
    if let Some(team) = win_totals.keys().find(|t| !ratings.contains_key(*t)) {
        return Err(DataIntegrityError::MissingRating { team: team.clone() });
    }
    Ok(ratings
        .iter()
        .map(|(team, &old)| {
            let wins = win_totals.get(team).copied();
            (team.clone(), config.preseason_rating(old, wins))
        })
        .collect())
}
