//! CSV input loading.
//!
//! Reads the league, ratings, schedule, results and optional adjustments
//! into core domain types, then runs the same integrity checks the engines
//! rely on. Nothing here does any forecasting.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use seedcast_core::domain::{validate_schedule, Game, GameId, GameResult, League, RatingMap, Team, TeamId};
use seedcast_core::DataIntegrityError;

use crate::config::DataPaths;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: {source}")]
    Integrity {
        path: PathBuf,
        #[source]
        source: DataIntegrityError,
    },

    #[error(transparent)]
    Schedule(#[from] DataIntegrityError),
}

#[derive(Debug, Deserialize)]
struct TeamRow {
    team: String,
    conference: String,
    division: String,
}

#[derive(Debug, Deserialize)]
struct RatingRow {
    team: String,
    rating: f64,
}

#[derive(Debug, Deserialize)]
struct ScheduleRow {
    game_id: u64,
    week: u32,
    home_team: String,
    away_team: String,
    #[serde(default)]
    neutral_site: bool,
}

#[derive(Debug, Deserialize)]
struct ResultRow {
    game_id: u64,
    winner: Option<String>,
    margin: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AdjustmentRow {
    game_id: u64,
    adjustment: f64,
}

#[derive(Debug, Deserialize)]
struct WinTotalRow {
    team: String,
    win_total: f64,
}

/// Everything a forecast consumes, validated.
#[derive(Debug, Clone)]
pub struct ForecastInputs {
    /// League with each team's starting rating.
    pub league: League,
    /// Full schedule in game id order, results and adjustments merged in.
    pub schedule: Vec<Game>,
    pub win_totals: BTreeMap<TeamId, f64>,
}

impl ForecastInputs {
    pub fn completed_games(&self) -> usize {
        self.schedule.iter().filter(|g| g.is_completed()).count()
    }
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(csv_err)
}

fn integrity(path: &Path) -> impl Fn(DataIntegrityError) -> LoadError + '_ {
    move |source| LoadError::Integrity {
        path: path.to_path_buf(),
        source,
    }
}

pub fn load_ratings(path: &Path) -> Result<RatingMap, LoadError> {
    let mut ratings = RatingMap::new();
    for row in read_rows::<RatingRow>(path)? {
        let team = TeamId::from(row.team);
        if ratings.insert(team.clone(), row.rating).is_some() {
            return Err(integrity(path)(DataIntegrityError::DuplicateTeam { team }));
        }
    }
    Ok(ratings)
}

pub fn load_win_totals(path: &Path) -> Result<BTreeMap<TeamId, f64>, LoadError> {
    let mut totals = BTreeMap::new();
    for row in read_rows::<WinTotalRow>(path)? {
        let team = TeamId::from(row.team);
        if totals.insert(team.clone(), row.win_total).is_some() {
            return Err(integrity(path)(DataIntegrityError::DuplicateTeam { team }));
        }
    }
    Ok(totals)
}

/// League from the team file with ratings attached.
pub fn load_league(teams: &Path, ratings: &RatingMap) -> Result<League, LoadError> {
    let rows = read_rows::<TeamRow>(teams)?;
    let mut built = Vec::with_capacity(rows.len());
    for row in rows {
        let id = TeamId::from(row.team);
        let rating = *ratings
            .get(&id)
            .ok_or_else(|| integrity(teams)(DataIntegrityError::MissingRating { team: id.clone() }))?;
        built.push(Team::new(id, row.conference, row.division, rating));
    }
    League::new(built).map_err(integrity(teams))
}

/// Schedule in file order. Ordering is checked later against the league.
pub fn load_schedule(path: &Path) -> Result<Vec<Game>, LoadError> {
    Ok(read_rows::<ScheduleRow>(path)?
        .into_iter()
        .map(|row| {
            let game = Game::new(row.game_id, row.week, row.home_team, row.away_team);
            if row.neutral_site {
                game.neutral()
            } else {
                game
            }
        })
        .collect())
}

pub fn load_results(path: &Path) -> Result<BTreeMap<GameId, GameResult>, LoadError> {
    let mut results = BTreeMap::new();
    for row in read_rows::<ResultRow>(path)? {
        let game = GameId(row.game_id);
        let result = GameResult {
            winner: row.winner.filter(|w| !w.is_empty()).map(TeamId::from),
            margin: row.margin,
        };
        if results.insert(game, result).is_some() {
            return Err(integrity(path)(DataIntegrityError::DuplicateGameId { game }));
        }
    }
    Ok(results)
}

pub fn load_adjustments(path: &Path) -> Result<BTreeMap<GameId, f64>, LoadError> {
    let mut adjustments = BTreeMap::new();
    for row in read_rows::<AdjustmentRow>(path)? {
        let game = GameId(row.game_id);
        if adjustments.insert(game, row.adjustment).is_some() {
            return Err(integrity(path)(DataIntegrityError::DuplicateGameId { game }));
        }
    }
    Ok(adjustments)
}

/// Attach results and adjustments to their scheduled games. Every id must
/// exist on the schedule.
pub fn merge_into_schedule(
    schedule: &mut [Game],
    results: BTreeMap<GameId, GameResult>,
    adjustments: BTreeMap<GameId, f64>,
) -> Result<(), DataIntegrityError> {
    let index: BTreeMap<GameId, usize> = schedule.iter().enumerate().map(|(i, g)| (g.id, i)).collect();
    let slot = |game: GameId| index.get(&game).copied().ok_or(DataIntegrityError::UnknownGame { game });
    for (game, result) in results {
        schedule[slot(game)?].result = Some(result);
    }
    for (game, points) in adjustments {
        schedule[slot(game)?].contextual_adjustment = Some(points);
    }
    Ok(())
}

/// Load and validate every input a forecast needs.
pub fn load_inputs(paths: &DataPaths) -> Result<ForecastInputs, LoadError> {
    let ratings = load_ratings(&paths.ratings)?;
    let league = load_league(&paths.teams, &ratings)?;
    let mut schedule = load_schedule(&paths.schedule)?;

    let results = match &paths.results {
        Some(path) => load_results(path)?,
        None => BTreeMap::new(),
    };
    let adjustments = match &paths.adjustments {
        Some(path) => load_adjustments(path)?,
        None => BTreeMap::new(),
    };
    merge_into_schedule(&mut schedule, results, adjustments)?;
    validate_schedule(&league, &schedule)?;

    let win_totals = match &paths.win_totals {
        Some(path) => load_win_totals(path)?,
        None => BTreeMap::new(),
    };

    Ok(ForecastInputs {
        league,
        schedule,
        win_totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn paths(dir: &Path) -> DataPaths {
        DataPaths {
            teams: write(dir, "teams.csv", "team,conference,division\nA,East,North\nB,East,North\nC,East,South\n"),
            ratings: write(dir, "ratings.csv", "team,rating\nA,1550\nB,1500\nC,1480\n"),
            schedule: write(
                dir,
                "schedule.csv",
                "game_id,week,home_team,away_team,neutral_site\n1,1,A,B,false\n2,1,C,A,true\n3,2,B,C,false\n",
            ),
            results: Some(write(dir, "results.csv", "game_id,winner,margin\n1,A,7\n2,,\n")),
            adjustments: Some(write(dir, "adjustments.csv", "game_id,adjustment\n3,-12.5\n")),
            win_totals: None,
        }
    }

    #[test]
    fn loads_and_merges_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = load_inputs(&paths(dir.path())).unwrap();
        assert_eq!(inputs.league.len(), 3);
        assert_eq!(inputs.league.get(&TeamId::from("A")).unwrap().rating, 1550.0);
        assert_eq!(inputs.schedule.len(), 3);
        assert_eq!(inputs.completed_games(), 2);
        assert!(inputs.schedule[1].neutral_site);
        // Empty winner and margin is a tie.
        assert_eq!(inputs.schedule[1].result, Some(GameResult { winner: None, margin: None }));
        assert_eq!(inputs.schedule[2].contextual_adjustment, Some(-12.5));
    }

    #[test]
    fn result_for_unscheduled_game_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = paths(dir.path());
        p.results = Some(write(dir.path(), "results.csv", "game_id,winner,margin\n9,A,3\n"));
        assert!(matches!(
            load_inputs(&p),
            Err(LoadError::Schedule(DataIntegrityError::UnknownGame { game: GameId(9) }))
        ));
    }

    #[test]
    fn team_without_rating_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = paths(dir.path());
        p.ratings = write(dir.path(), "ratings.csv", "team,rating\nA,1550\nB,1500\n");
        let err = load_inputs(&p).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Integrity {
                source: DataIntegrityError::MissingRating { .. },
                ..
            }
        ));
        assert!(err.to_string().contains("teams.csv"));
    }

    #[test]
    fn out_of_order_schedule_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = paths(dir.path());
        p.schedule = write(
            dir.path(),
            "schedule.csv",
            "game_id,week,home_team,away_team\n2,1,A,B\n1,1,C,A\n",
        );
        p.results = None;
        p.adjustments = None;
        assert!(matches!(
            load_inputs(&p),
            Err(LoadError::Schedule(DataIntegrityError::NonIncreasingGameId { .. }))
        ));
    }

    #[test]
    fn malformed_csv_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "ratings.csv", "team,rating\nA,not-a-number\n");
        let err = load_ratings(&path).unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
        assert!(err.to_string().contains("ratings.csv"));
    }
}
