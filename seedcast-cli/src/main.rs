//! Seedcast CLI: forecast, rating and calibration commands.
//!
//! Commands:
//! - `forecast`: run the full scenario pipeline and save the artifact set
//! - `ratings`: fold completed games into the ratings and print them
//! - `predict-week`: home-win frequencies for one week's games
//! - `calibration`: Brier score, log loss and reliability of the ratings
//! - `preseason`: carry ratings into a new season

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use seedcast_core::aggregate::AggregateEstimate;
use seedcast_core::domain::TeamId;
use seedcast_core::predictions::for_week;
use seedcast_core::rating::{carry_over, PreseasonConfig};
use seedcast_runner::data_loader::{load_ratings, load_win_totals};
use seedcast_runner::{
    fold_ratings, load_inputs, run_forecast, save_artifacts, ForecastConfig, ForecastOutput,
};

#[derive(Parser)]
#[command(
    name = "seedcast",
    about = "Seedcast: rating-driven playoff seeding forecasts"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Run configuration plus the overrides every simulating command accepts.
#[derive(Args)]
struct RunArgs {
    /// Path to a TOML config file.
    #[arg(long, short)]
    config: PathBuf,

    /// Override the number of scenarios.
    #[arg(long)]
    scenarios: Option<u32>,

    /// Override the random seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads for the scenario pool.
    #[arg(long)]
    threads: Option<usize>,
}

impl RunArgs {
    fn load(&self) -> Result<ForecastConfig> {
        let mut config = ForecastConfig::from_file(&self.config)
            .with_context(|| format!("failed to load config {}", self.config.display()))?;
        if let Some(n) = self.scenarios {
            config.model.scenario_count = n;
        }
        if let Some(seed) = self.seed {
            config.model.random_seed = seed;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scenario pipeline and save estimates, standings and a report.
    Forecast {
        #[command(flatten)]
        run: RunArgs,

        /// Output directory. Defaults to the config's `output.dir`.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Skip the per-scenario standings stream.
        #[arg(long, default_value_t = false)]
        no_standings: bool,
    },
    /// Fold completed games into the ratings and print the table.
    Ratings {
        /// Path to a TOML config file.
        #[arg(long, short)]
        config: PathBuf,

        /// Also print every rating update.
        #[arg(long, default_value_t = false)]
        log: bool,
    },
    /// Print home-win frequencies for the games of one week.
    PredictWeek {
        #[command(flatten)]
        run: RunArgs,

        /// Week to print.
        #[arg(long)]
        week: u32,
    },
    /// Score the ratings' pre-game probabilities against the results.
    Calibration {
        /// Path to a TOML config file.
        #[arg(long, short)]
        config: PathBuf,
    },
    /// Regress ratings toward the mean for a new season.
    Preseason {
        /// End-of-season ratings (`team,rating`).
        #[arg(long)]
        ratings: PathBuf,

        /// Market win totals (`team,win_total`).
        #[arg(long)]
        win_totals: Option<PathBuf>,

        /// TOML config whose `[preseason]` table is used. Defaults apply without it.
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Write the new ratings here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Forecast {
            run,
            output_dir,
            no_standings,
        } => run_forecast_cmd(&run, output_dir, no_standings),
        Commands::Ratings { config, log } => run_ratings(&config, log),
        Commands::PredictWeek { run, week } => run_predict_week(&run, week),
        Commands::Calibration { config } => run_calibration(&config),
        Commands::Preseason {
            ratings,
            win_totals,
            config,
            output,
        } => run_preseason(&ratings, win_totals.as_deref(), config.as_deref(), output.as_deref()),
    }
}

/// Log to stderr so stdout stays clean for tables and CSV.
fn init_tracing(verbose: u8) -> Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("seedcast={level},seedcast_runner={level},seedcast_core={level},warn"))
        }))
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;
    Ok(())
}

fn run_forecast_cmd(run: &RunArgs, output_dir: Option<PathBuf>, no_standings: bool) -> Result<()> {
    let mut config = run.load()?;
    if no_standings {
        config.output.standings = false;
    }
    let inputs = load_inputs(&config.data)?;
    let output = run_forecast(&config, &inputs)?;

    print_summary(&output);

    let dir = output_dir.unwrap_or_else(|| config.output.dir.clone());
    let run_dir = save_artifacts(&config, &output, &dir)?;
    info!(dir = %run_dir.display(), "artifacts saved");
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_ratings(config_path: &Path, log: bool) -> Result<()> {
    let config = ForecastConfig::from_file(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let inputs = load_inputs(&config.data)?;
    let engine = fold_ratings(&config, &inputs)?;
    let initial = inputs.league.ratings();

    if log {
        println!("=== Rating Updates ===");
        println!(
            "{:>6} {:>4}  {:<6} {:<6} {:>8} {:>5} {:>6} {:>8}",
            "game", "week", "home", "away", "p(home)", "res", "mov", "delta"
        );
        for u in engine.log() {
            println!(
                "{:>6} {:>4}  {:<6} {:<6} {:>8.3} {:>5} {:>6.3} {:>+8.2}",
                u.game.0,
                u.week,
                u.home.as_str(),
                u.away.as_str(),
                u.expected_home,
                match u.outcome {
                    seedcast_core::domain::Outcome::HomeWin => "H",
                    seedcast_core::domain::Outcome::AwayWin => "A",
                    seedcast_core::domain::Outcome::Tie => "T",
                },
                u.mov_multiplier,
                u.delta,
            );
        }
        println!();
    }

    let mut rows: Vec<(&TeamId, f64)> = engine.ratings().iter().map(|(t, &r)| (t, r)).collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(b.0)));

    println!("=== Ratings after {} games ===", engine.log().len());
    println!("{:>4}  {:<8} {:>9} {:>8}", "rank", "team", "rating", "change");
    for (i, (team, rating)) in rows.into_iter().enumerate() {
        let change = rating - initial.get(team).copied().unwrap_or(rating);
        println!("{:>4}  {:<8} {:>9.1} {:>+8.1}", i + 1, team.as_str(), rating, change);
    }
    Ok(())
}

fn run_predict_week(run: &RunArgs, week: u32) -> Result<()> {
    let mut config = run.load()?;
    config.output.standings = false;
    let inputs = load_inputs(&config.data)?;
    let output = run_forecast(&config, &inputs)?;

    let games = for_week(&output.predictions, week);
    if games.is_empty() {
        println!("No games scheduled in week {week}.");
        return Ok(());
    }
    println!("=== Week {week} ({} scenarios) ===", config.model.scenario_count);
    println!("{:>6}  {:<8} {:<8} {:>8} {:>8}", "game", "home", "away", "home win", "model");
    for p in games {
        let status = if p.completed { "  final" } else { "" };
        println!(
            "{:>6}  {:<8} {:<8} {:>7.1}% {:>7.1}%{status}",
            p.game.0,
            p.home.as_str(),
            p.away.as_str(),
            p.home_win_freq * 100.0,
            p.model_home_prob * 100.0,
        );
    }
    Ok(())
}

fn run_calibration(config_path: &Path) -> Result<()> {
    let config = ForecastConfig::from_file(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let inputs = load_inputs(&config.data)?;
    let engine = fold_ratings(&config, &inputs)?;

    let Some(report) = seedcast_core::calibration::calibrate(engine.log()) else {
        println!("No completed games to score.");
        return Ok(());
    };
    println!("=== Calibration ===");
    println!("Games:          {}", report.games);
    println!("Brier Score:    {:.4}", report.brier_score);
    println!("Log Loss:       {:.4}", report.log_loss);
    println!("Accuracy:       {:.1}%", report.accuracy * 100.0);
    println!();
    println!("{:>11} {:>6} {:>10} {:>9}", "bin", "games", "predicted", "observed");
    for bin in report.bins.iter().filter(|b| b.games > 0) {
        println!(
            "{:>4.1}-{:<4.1}  {:>6} {:>9.1}% {:>8.1}%",
            bin.lower,
            bin.upper,
            bin.games,
            bin.mean_predicted * 100.0,
            bin.observed * 100.0,
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct RatingRow<'a> {
    team: &'a str,
    rating: f64,
}

fn run_preseason(
    ratings: &Path,
    win_totals: Option<&Path>,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => ForecastConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?
            .preseason,
        None => PreseasonConfig::default(),
    };
    config.validate()?;

    let old = load_ratings(ratings)?;
    let totals = match win_totals {
        Some(path) => load_win_totals(path)?,
        None => BTreeMap::new(),
    };
    let new = carry_over(&config, &old, &totals)?;
    info!(teams = new.len(), blended = totals.len(), "preseason ratings computed");

    let writer: Box<dyn std::io::Write> = match output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };
    let mut wtr = csv::Writer::from_writer(writer);
    for (team, &rating) in &new {
        wtr.serialize(RatingRow {
            team: team.as_str(),
            rating: (rating * 1e6).round() / 1e6,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn print_summary(output: &ForecastOutput) {
    println!();
    println!("=== Playoff Forecast ===");
    println!("Run:            {}", output.run_id);
    println!("Completed:      {} games", output.rating_log.len());
    println!("Scheduled:      {} games", output.predictions.len());

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
        println!();
        println!("--- {conference} ---");
        println!(
            "{:<8} {:>8} {:>15} {:>7} {:>7} {:>6} {:>6}",
            "team", "playoff", "95% CI", "bye", "div", "wins", "seed"
        );
        for e in rows {
            println!(
                "{:<8} {:>7.1}% {:>6.1}%-{:>5.1}% {:>6.1}% {:>6.1}% {:>6.1} {:>6.2}",
                e.team.as_str(),
                e.playoff_prob * 100.0,
                e.playoff_lower * 100.0,
                e.playoff_upper * 100.0,
                e.bye_prob * 100.0,
                e.division_prob * 100.0,
                e.mean_wins,
                e.mean_seed,
            );
        }
    }
    for warn in &output.warnings {
        println!();
        println!("WARNING: {warn}");
    }
    println!();
}
