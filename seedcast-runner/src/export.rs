//! Artifact export: JSON manifest, CSV tables and a Markdown report.
//!
//! Every run directory carries a `manifest.json` with a `schema_version`.
//! Manifests written by a newer version are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use seedcast_core::aggregate::AggregateEstimate;
use seedcast_core::calibration::CalibrationReport;
use seedcast_core::domain::{Outcome, RatingMap, TeamId};
use seedcast_core::predictions::GamePrediction;
use seedcast_core::rating::RatingUpdate;
use seedcast_core::SimulationMode;

use crate::config::ForecastConfig;
use crate::forecast::{ForecastOutput, StandingRecord};

pub const SCHEMA_VERSION: u32 = 1;

/// Summary of one run, written as `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub scenario_count: u32,
    pub random_seed: u64,
    pub simulation_mode: SimulationMode,
    pub teams: usize,
    pub games: usize,
    pub completed_games: usize,
    pub config: ForecastConfig,
    pub final_ratings: RatingMap,
    pub calibration: Option<CalibrationReport>,
    pub warnings: Vec<String>,
    pub files: Vec<String>,
}

impl RunManifest {
    pub fn new(config: &ForecastConfig, output: &ForecastOutput, files: Vec<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id: output.run_id.clone(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            scenario_count: config.model.scenario_count,
            random_seed: config.model.random_seed,
            simulation_mode: config.model.simulation_mode,
            teams: output.final_ratings.len(),
            games: output.predictions.len(),
            completed_games: output.rating_log.len(),
            config: config.clone(),
            final_ratings: output.final_ratings.clone(),
            calibration: output.calibration.clone(),
            warnings: output.warnings.clone(),
            files,
        }
    }
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_manifest_json(manifest: &RunManifest) -> Result<String> {
    serde_json::to_string_pretty(manifest).context("failed to serialize run manifest to JSON")
}

/// Parse a manifest, rejecting schema versions newer than this build.
pub fn import_manifest_json(json: &str) -> Result<RunManifest> {
    let manifest: RunManifest =
        serde_json::from_str(json).context("failed to deserialize run manifest from JSON")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── CSV ────────────────────────────────────────────────────────────

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::HomeWin => "home",
        Outcome::AwayWin => "away",
        Outcome::Tie => "tie",
    }
}

/// One row per team: probabilities with Wilson bounds, wins and seed with
/// percentile bounds.
pub fn export_estimates_csv(estimates: &[AggregateEstimate]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "team",
        "conference",
        "scenarios",
        "playoff_prob",
        "playoff_lower",
        "playoff_upper",
        "bye_prob",
        "bye_lower",
        "bye_upper",
        "division_prob",
        "mean_wins",
        "wins_lower",
        "wins_upper",
        "mean_seed",
        "seed_lower",
        "seed_upper",
    ])?;
    for e in estimates {
        wtr.write_record([
            e.team.as_str(),
            &e.conference,
            &e.scenarios.to_string(),
            &format!("{:.6}", e.playoff_prob),
            &format!("{:.6}", e.playoff_lower),
            &format!("{:.6}", e.playoff_upper),
            &format!("{:.6}", e.bye_prob),
            &format!("{:.6}", e.bye_lower),
            &format!("{:.6}", e.bye_upper),
            &format!("{:.6}", e.division_prob),
            &format!("{:.6}", e.mean_wins),
            &format!("{:.6}", e.wins_lower),
            &format!("{:.6}", e.wins_upper),
            &format!("{:.6}", e.mean_seed),
            &format!("{:.6}", e.seed_lower),
            &format!("{:.6}", e.seed_upper),
        ])?;
    }
    finish_csv(wtr)
}

/// Share of scenarios each team held each seed.
pub fn export_seed_distribution_csv(estimates: &[AggregateEstimate]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["team", "conference", "seed", "scenarios", "share"])?;
    for e in estimates {
        let n = e.scenarios.max(1) as f64;
        for (i, &count) in e.seed_distribution.iter().enumerate() {
            wtr.write_record([
                e.team.as_str(),
                &e.conference,
                &(i + 1).to_string(),
                &count.to_string(),
                &format!("{:.6}", count as f64 / n),
            ])?;
        }
    }
    finish_csv(wtr)
}

/// The standings stream: one row per team per scenario.
pub fn export_standings_csv(records: &[StandingRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "scenario",
        "team",
        "conference",
        "division",
        "wins",
        "losses",
        "ties",
        "division_wins",
        "division_losses",
        "conference_wins",
        "conference_losses",
        "points_for",
        "points_against",
        "seed",
        "conference_rank",
        "division_winner",
    ])?;
    for r in records {
        wtr.write_record([
            r.scenario.to_string().as_str(),
            r.team.as_str(),
            &r.conference,
            &r.division,
            &r.wins.to_string(),
            &r.losses.to_string(),
            &r.ties.to_string(),
            &r.division_wins.to_string(),
            &r.division_losses.to_string(),
            &r.conference_wins.to_string(),
            &r.conference_losses.to_string(),
            &format!("{:.1}", r.points_for),
            &format!("{:.1}", r.points_against),
            &r.seed.map(|s| s.to_string()).unwrap_or_default(),
            &r.conference_rank.to_string(),
            &r.division_winner.to_string(),
        ])?;
    }
    finish_csv(wtr)
}

/// Starting and final rating of every team.
pub fn export_ratings_csv(initial: &RatingMap, final_ratings: &RatingMap) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["team", "initial_rating", "final_rating", "change"])?;
    for (team, &after) in final_ratings {
        let before = initial.get(team).copied().unwrap_or(after);
        wtr.write_record([
            team.as_str(),
            &format!("{:.6}", before),
            &format!("{:.6}", after),
            &format!("{:.6}", after - before),
        ])?;
    }
    finish_csv(wtr)
}

/// Every rating update in application order.
pub fn export_rating_log_csv(updates: &[RatingUpdate]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "game",
        "week",
        "home",
        "away",
        "home_before",
        "away_before",
        "home_advantage",
        "expected_home",
        "outcome",
        "margin",
        "mov_multiplier",
        "delta",
        "home_after",
        "away_after",
    ])?;
    for u in updates {
        wtr.write_record([
            u.game.to_string().as_str(),
            &u.week.to_string(),
            u.home.as_str(),
            u.away.as_str(),
            &format!("{:.6}", u.home_before),
            &format!("{:.6}", u.away_before),
            &format!("{:.6}", u.home_advantage),
            &format!("{:.6}", u.expected_home),
            outcome_label(u.outcome),
            &format!("{:.1}", u.margin),
            &format!("{:.6}", u.mov_multiplier),
            &format!("{:.6}", u.delta),
            &format!("{:.6}", u.home_after()),
            &format!("{:.6}", u.away_after()),
        ])?;
    }
    finish_csv(wtr)
}

/// Per-game home-win frequency across scenarios.
pub fn export_predictions_csv(predictions: &[GamePrediction]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "game",
        "week",
        "home",
        "away",
        "scenarios",
        "home_win_freq",
        "model_home_prob",
        "completed",
    ])?;
    for p in predictions {
        wtr.write_record([
            p.game.to_string().as_str(),
            &p.week.to_string(),
            p.home.as_str(),
            p.away.as_str(),
            &p.scenarios.to_string(),
            &format!("{:.6}", p.home_win_freq),
            &format!("{:.6}", p.model_home_prob),
            &p.completed.to_string(),
        ])?;
    }
    finish_csv(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one run.
///
/// Creates `{run_id prefix}_{timestamp}/` under `output_dir` with
/// `manifest.json`, `estimates.csv`, `seeds.csv`, `ratings.csv`,
/// `rating_log.csv`, `predictions.csv`, `report.md` and, when the stream
/// was kept, `standings.csv`. Returns the created directory.
pub fn save_artifacts(
    config: &ForecastConfig,
    output: &ForecastOutput,
    output_dir: &Path,
) -> Result<PathBuf> {
    let prefix = output.run_id.get(..12).unwrap_or(&output.run_id);
    let dirname = format!("{}_{}", prefix, chrono::Utc::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let mut files = vec![
        ("estimates.csv", export_estimates_csv(&output.estimates)?),
        ("seeds.csv", export_seed_distribution_csv(&output.estimates)?),
        (
            "ratings.csv",
            export_ratings_csv(&output.initial_ratings, &output.final_ratings)?,
        ),
        ("rating_log.csv", export_rating_log_csv(&output.rating_log)?),
        ("predictions.csv", export_predictions_csv(&output.predictions)?),
        ("report.md", generate_report(config, output)),
    ];
    if !output.standings.is_empty() {
        files.push(("standings.csv", export_standings_csv(&output.standings)?));
    }

    for (name, content) in &files {
        let path = run_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let names = files.iter().map(|(name, _)| name.to_string()).collect();
    let manifest = RunManifest::new(config, output, names);
    std::fs::write(run_dir.join("manifest.json"), export_manifest_json(&manifest)?)
        .context("failed to write manifest.json")?;

    Ok(run_dir)
}

/// Load the manifest of an artifact directory.
pub fn load_manifest(dir: &Path) -> Result<RunManifest> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_manifest_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

fn pct(v: f64) -> String {
    format!("{:.1}%", v * 100.0)
}

/// Markdown summary of one run: metadata, playoff odds per conference,
/// rating movers and calibration.
pub fn generate_report(config: &ForecastConfig, output: &ForecastOutput) -> String {
    let mut md = String::with_capacity(4096);
    let model = &config.model;

    md.push_str("# Playoff Forecast\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Run | {} |\n", output.run_id));
    md.push_str(&format!("| Scenarios | {} |\n", model.scenario_count));
    md.push_str(&format!("| Seed | {} |\n", model.random_seed));
    md.push_str(&format!("| Mode | {:?} |\n", model.simulation_mode));
    md.push_str(&format!("| Playoff Seeds | {} |\n", config.seeding.playoff_seeds));
    md.push_str(&format!(
        "| Completed Games | {} of {} |\n",
        output.rating_log.len(),
        output.predictions.len()
    ));
    md.push('\n');

    let mut conferences: Vec<&str> = output.estimates.iter().map(|e| e.conference.as_str()).collect();
    conferences.sort_unstable();
    conferences.dedup();
    for conference in conferences {
        let mut rows: Vec<&AggregateEstimate> = output
            .estimates
            .iter()
            .filter(|e| e.conference == conference)
            .collect();
        rows.sort_by(|a, b| {
            b.playoff_prob
                .total_cmp(&a.playoff_prob)
                .then(a.mean_seed.total_cmp(&b.mean_seed))
                .then(a.team.cmp(&b.team))
        });

        md.push_str(&format!("## {conference}\n\n"));
        md.push_str("| Team | Playoffs | 95% CI | Bye | Division | Wins | Mean Seed |\n");
        md.push_str("| --- | --- | --- | --- | --- | --- | --- |\n");
        for e in rows {
            md.push_str(&format!(
                "| {} | {} | {}-{} | {} | {} | {:.1} ({:.0}-{:.0}) | {:.2} |\n",
                e.team,
                pct(e.playoff_prob),
                pct(e.playoff_lower),
                pct(e.playoff_upper),
                pct(e.bye_prob),
                pct(e.division_prob),
                e.mean_wins,
                e.wins_lower,
                e.wins_upper,
                e.mean_seed,
            ));
        }
        md.push('\n');
    }

    if !output.rating_log.is_empty() {
        let mut movers: Vec<(&TeamId, f64, f64)> = output
            .final_ratings
            .iter()
            .map(|(team, &after)| {
                let before = output.initial_ratings.get(team).copied().unwrap_or(after);
                (team, after, after - before)
            })
            .collect();
        movers.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()).then(a.0.cmp(b.0)));

        md.push_str("## Rating Movers\n\n");
        md.push_str("| Team | Rating | Change |\n");
        md.push_str("| --- | --- | --- |\n");
        for (team, rating, change) in movers.into_iter().take(10) {
            md.push_str(&format!("| {team} | {rating:.1} | {change:+.1} |\n"));
        }
        md.push('\n');
    }

    if let Some(ref c) = output.calibration {
        md.push_str("## Calibration\n\n");
        md.push_str("| Metric | Value |\n");
        md.push_str("| --- | --- |\n");
        md.push_str(&format!("| Games | {} |\n", c.games));
        md.push_str(&format!("| Brier Score | {:.4} |\n", c.brier_score));
        md.push_str(&format!("| Log Loss | {:.4} |\n", c.log_loss));
        md.push_str(&format!("| Favourite Accuracy | {} |\n", pct(c.accuracy)));
        md.push('\n');
    }

    if !output.warnings.is_empty() {
        md.push_str("## Warnings\n\n");
        for warn in &output.warnings {
            md.push_str(&format!("- {warn}\n"));
        }
        md.push('\n');
    }

    md
}
