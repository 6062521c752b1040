//! Calibration of the pre-game probabilities the rating engine produced
//! for every completed game.

use serde::{Deserialize, Serialize};

use crate::rating::RatingUpdate;

pub const CALIBRATION_BINS: usize = 10;

/// Probabilities are clipped to this distance from 0 and 1 for log loss.
const LOG_LOSS_EPS: f64 = 1e-15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBin {
    pub lower: f64,
    pub upper: f64,
    pub games: u32,
    pub mean_predicted: f64,
    /// Observed home score (ties count half) of the games in this bin.
    pub observed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub games: u32,
    pub brier_score: f64,
    pub log_loss: f64,
    /// Share of decided games the favourite won.
    pub accuracy: f64,
    pub bins: Vec<CalibrationBin>,
}

/// Score the rating log. `None` when no games were rated.
pub fn calibrate(updates: &[RatingUpdate]) -> Option<CalibrationReport> {
    if updates.is_empty() {
        return None;
    }
    let n = updates.len() as f64;

    let mut brier = 0.0;
    let mut log_loss = 0.0;
    let mut correct = 0u32;
    let mut decided = 0u32;
    let mut sums = [(0u32, 0.0f64, 0.0f64); CALIBRATION_BINS];

    for u in updates {
        let p = u.expected_home;
        let actual = u.outcome.home_score();
        brier += (p - actual).powi(2);
        let clipped = p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS);
        log_loss -= actual * clipped.ln() + (1.0 - actual) * (1.0 - clipped).ln();
        if actual != 0.5 {
            decided += 1;
            if (p >= 0.5) == (actual == 1.0) {
                correct += 1;
            }
        }
        let bin = ((p * CALIBRATION_BINS as f64) as usize).min(CALIBRATION_BINS - 1);
        sums[bin].0 += 1;
        sums[bin].1 += p;
        sums[bin].2 += actual;
    }

    let bins = sums
        .iter()
        .enumerate()
        .map(|(i, &(games, predicted, observed))| {
            let width = 1.0 / CALIBRATION_BINS as f64;
            let count = games.max(1) as f64;
            CalibrationBin {
                lower: i as f64 * width,
                upper: (i + 1) as f64 * width,
                games,
                mean_predicted: predicted / count,
                observed: observed / count,
            }
        })
        .collect();

    Some(CalibrationReport {
        games: updates.len() as u32,
        brier_score: brier / n,
        log_loss: log_loss / n,
        accuracy: if decided == 0 { 0.0 } else { correct as f64 / decided as f64 },
        bins,
    })
}
