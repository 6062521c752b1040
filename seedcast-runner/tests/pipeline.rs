//! End-to-end tests: CSV files on disk through to estimates.

use std::path::Path;

use proptest::prelude::*;
use seedcast_core::domain::TeamId;
use seedcast_core::{DataIntegrityError, ForecastError, SimulationMode, TiebreakFallback};
use seedcast_runner::{load_inputs, run_forecast, DataPaths, ForecastConfig, LoadError, RunError};

const TEAMS: &str = "team,conference,division
BUF,AFC,East
MIA,AFC,East
KC,AFC,West
LV,AFC,West
DAL,NFC,East
PHI,NFC,East
SF,NFC,West
SEA,NFC,West
";

const RATINGS: &str = "team,rating
BUF,1580
MIA,1520
KC,1610
LV,1450
DAL,1530
PHI,1560
SF,1600
SEA,1490
";

/// Double round robin inside each conference, one cross-conference week.
fn schedule() -> String {
    let conferences = [["BUF", "MIA", "KC", "LV"], ["DAL", "PHI", "SF", "SEA"]];
    let mut rows = vec!["game_id,week,home_team,away_team,neutral_site".to_string()];
    let mut id = 1;
    let mut week = 1;
    for round in 0..2 {
        for conf in &conferences {
            for i in 0..4 {
                for j in (i + 1)..4 {
                    let (h, a) = if round == 0 { (conf[i], conf[j]) } else { (conf[j], conf[i]) };
                    rows.push(format!("{id},{week},{h},{a},false"));
                    id += 1;
                }
            }
        }
        week += 1;
    }
    for (h, a) in [("BUF", "DAL"), ("PHI", "MIA"), ("KC", "SF"), ("SEA", "LV")] {
        rows.push(format!("{id},{week},{h},{a},{}", h == "KC"));
        id += 1;
    }
    rows.join("\n") + "\n"
}

const RESULTS: &str = "game_id,winner,margin
1,BUF,7
2,KC,3
3,BUF,10
4,,
5,LV,14
6,KC,1
";

const ADJUSTMENTS: &str = "game_id,adjustment
13,-20
14,12.5
";

fn write_inputs(dir: &Path, results: &str) -> DataPaths {
    let write = |name: &str, content: &str| {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    };
    DataPaths {
        teams: write("teams.csv", TEAMS),
        ratings: write("ratings.csv", RATINGS),
        schedule: write("schedule.csv", &schedule()),
        results: Some(write("results.csv", results)),
        adjustments: Some(write("adjustments.csv", ADJUSTMENTS)),
        win_totals: None,
    }
}

fn config(paths: DataPaths, scenarios: u32) -> ForecastConfig {
    let mut config = ForecastConfig::default();
    config.data = paths;
    config.model.scenario_count = scenarios;
    config.seeding.playoff_seeds = 3;
    config.seeding.min_common_games = 2;
    config
}

#[test]
fn forecast_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(write_inputs(dir.path(), RESULTS), 400);
    let inputs = load_inputs(&config.data).unwrap();
    assert_eq!(inputs.schedule.len(), 28);
    assert_eq!(inputs.completed_games(), 6);
    assert_eq!(inputs.schedule[12].contextual_adjustment, Some(-20.0));
    assert!(inputs.schedule[26].neutral_site);

    let out = run_forecast(&config, &inputs).unwrap();
    assert_eq!(out.rating_log.len(), 6);
    assert_eq!(out.estimates.len(), 8);
    assert_eq!(out.predictions.len(), 28);

    // The tie at game 4 leaves both ratings where the earlier games put them.
    let tie = &out.rating_log[3];
    assert_eq!(tie.delta, 0.0);

    // Ratings are zero-sum over the log.
    let before: f64 = out.initial_ratings.values().sum();
    let after: f64 = out.final_ratings.values().sum();
    assert!((before - after).abs() < 1e-9);

    for conference in ["AFC", "NFC"] {
        let rows: Vec<_> = out.estimates.iter().filter(|e| e.conference == conference).collect();
        let playoff: f64 = rows.iter().map(|e| e.playoff_prob).sum();
        let bye: f64 = rows.iter().map(|e| e.bye_prob).sum();
        let division: f64 = rows.iter().map(|e| e.division_prob).sum();
        assert!((playoff - 3.0).abs() < 1e-9, "{conference}: {playoff}");
        assert!((bye - 1.0).abs() < 1e-9);
        assert!((division - 2.0).abs() < 1e-9);
    }
    for e in &out.estimates {
        assert!(e.playoff_lower <= e.playoff_prob && e.playoff_prob <= e.playoff_upper);
        assert!(e.wins_lower <= e.mean_wins && e.mean_wins <= e.wins_upper);
        assert!(e.division_prob <= e.playoff_prob);
    }
}

#[test]
fn completed_games_are_fixed_in_every_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(write_inputs(dir.path(), RESULTS), 200);
    let inputs = load_inputs(&config.data).unwrap();
    let out = run_forecast(&config, &inputs).unwrap();

    for p in out.predictions.iter().take(6) {
        assert!(p.completed);
        assert_eq!(p.scenarios, 200);
    }
    assert_eq!(out.predictions[0].home_win_freq, 1.0);
    assert_eq!(out.predictions[1].home_win_freq, 0.0);
    assert_eq!(out.predictions[3].home_win_freq, 0.5);
    assert!(out.predictions[6..].iter().all(|p| !p.completed));
}

#[test]
fn hot_mode_is_thread_independent_too() {
    let dir = tempfile::tempdir().unwrap();
    let mut one = config(write_inputs(dir.path(), RESULTS), 300);
    one.model.simulation_mode = SimulationMode::Hot;
    one.threads = Some(1);
    let mut many = one.clone();
    many.threads = Some(4);

    let inputs = load_inputs(&one.data).unwrap();
    let a = run_forecast(&one, &inputs).unwrap();
    let b = run_forecast(&many, &inputs).unwrap();
    assert_eq!(a.estimates, b.estimates);
    assert_eq!(a.predictions, b.predictions);
    assert_eq!(a.standings, b.standings);
}

#[test]
fn result_for_unscheduled_game_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_inputs(dir.path(), "game_id,winner,margin\n99,BUF,3\n");
    let err = load_inputs(&paths).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Schedule(DataIntegrityError::UnknownGame { .. })
    ));
}

#[test]
fn winner_outside_the_game_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_inputs(dir.path(), "game_id,winner,margin\n1,SF,3\n");
    let err = load_inputs(&paths).unwrap_err();
    assert!(err.to_string().contains("SF"), "{err}");
}

#[test]
fn missing_margin_aborts_before_any_rating_moves() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_inputs(dir.path(), "game_id,winner,margin\n1,BUF,7\n2,KC,\n");
    let err = load_inputs(&paths).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Schedule(DataIntegrityError::MissingMargin { .. })
    ));
}

#[test]
fn exhausted_ladder_can_be_an_error() {
    // Nothing played and every rating equal: the ladder cannot separate anyone.
    let dir = tempfile::tempdir().unwrap();
    let paths = write_inputs(dir.path(), "game_id,winner,margin\n");
    std::fs::write(
        &paths.ratings,
        "team,rating\nBUF,1500\nMIA,1500\nKC,1500\nLV,1500\nDAL,1500\nPHI,1500\nSF,1500\nSEA,1500\n",
    )
    .unwrap();
    std::fs::write(&paths.schedule, "game_id,week,home_team,away_team,neutral_site\n").unwrap();
    let paths = DataPaths {
        adjustments: None,
        ..paths
    };

    let mut config = config(paths, 5);
    let inputs = load_inputs(&config.data).unwrap();

    let out = run_forecast(&config, &inputs).unwrap();
    let buf = out
        .estimates
        .iter()
        .find(|e| e.team == TeamId::from("BUF"))
        .unwrap();
    // BUF sorts first in AFC East and then first among division winners.
    assert_eq!(buf.bye_prob, 1.0);

    config.seeding.fallback = TiebreakFallback::Error;
    let err = run_forecast(&config, &inputs).unwrap_err();
    assert!(matches!(
        err,
        RunError::Forecast(ForecastError::TiebreakExhaustion(_))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn seeds_fill_every_slot(seed in any::<u64>(), scenarios in 1u32..60, threads in 1usize..4) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(write_inputs(dir.path(), RESULTS), scenarios);
        config.model.random_seed = seed;
        config.threads = Some(threads);
        let inputs = load_inputs(&config.data).unwrap();
        let out = run_forecast(&config, &inputs).unwrap();

        let playoff: f64 = out.estimates.iter().map(|e| e.playoff_prob).sum();
        prop_assert!((playoff - 6.0).abs() < 1e-9);
        let seeded = out.standings.iter().filter(|r| r.seed.is_some()).count();
        prop_assert_eq!(seeded, 6 * scenarios as usize);
        for e in &out.estimates {
            prop_assert_eq!(e.scenarios, scenarios);
            prop_assert_eq!(e.seed_distribution.iter().sum::<u32>() as f64 / scenarios as f64, e.playoff_prob);
        }
    }
}
