use serde::{Deserialize, Serialize};

use super::{GameId, League, TeamId};
use crate::error::DataIntegrityError;

/// Result of a game from the home team's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    HomeWin,
    AwayWin,
    Tie,
}

impl Outcome {
    /// Actual score for the home side: 1, 0 or 0.5.
    pub fn home_score(self) -> f64 {
        match self {
            Outcome::HomeWin => 1.0,
            Outcome::AwayWin => 0.0,
            Outcome::Tie => 0.5,
        }
    }
}

/// A completed game as reported by the results feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    /// `None` for a tie.
    pub winner: Option<TeamId>,
    /// Absolute score margin. Required unless the game was a tie.
    pub margin: Option<f64>,
}

impl GameResult {
    pub fn win(winner: impl Into<TeamId>, margin: f64) -> Self {
        Self {
            winner: Some(winner.into()),
            margin: Some(margin),
        }
    }

    pub fn tie() -> Self {
        Self {
            winner: None,
            margin: Some(0.0),
        }
    }
}

/// One scheduled game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub week: u32,
    pub home: TeamId,
    pub away: TeamId,
    #[serde(default)]
    pub neutral_site: bool,
    #[serde(default)]
    pub result: Option<GameResult>,
    /// Externally computed rating-point adjustment favouring the home side
    /// (rest, weather, injuries). Fixed per game for the whole run.
    #[serde(default)]
    pub contextual_adjustment: Option<f64>,
}

impl Game {
    pub fn new(id: u64, week: u32, home: impl Into<TeamId>, away: impl Into<TeamId>) -> Self {
        Self {
            id: GameId(id),
            week,
            home: home.into(),
            away: away.into(),
            neutral_site: false,
            result: None,
            contextual_adjustment: None,
        }
    }

    pub fn neutral(mut self) -> Self {
        self.neutral_site = true;
        self
    }

    pub fn with_result(mut self, result: GameResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_adjustment(mut self, points: f64) -> Self {
        self.contextual_adjustment = Some(points);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.result.is_some()
    }

    pub fn involves(&self, team: &TeamId) -> bool {
        &self.home == team || &self.away == team
    }

    /// Home advantage in rating points for this game: the base constant
    /// (zero at a neutral site) plus any contextual adjustment.
    pub fn effective_home_advantage(&self, base: f64) -> f64 {
        let site = if self.neutral_site { 0.0 } else { base };
        site + self.contextual_adjustment.unwrap_or(0.0)
    }

    /// Decode the actual result into an outcome and absolute margin.
    ///
    /// Returns `Ok(None)` for unplayed games. A tie without a margin is
    /// read as margin 0.
    pub fn actual(&self) -> Result<Option<(Outcome, f64)>, DataIntegrityError> {
        let Some(result) = &self.result else {
            return Ok(None);
        };
        let outcome = match &result.winner {
            None => Outcome::Tie,
            Some(w) if w == &self.home => Outcome::HomeWin,
            Some(w) if w == &self.away => Outcome::AwayWin,
            Some(w) => {
                return Err(DataIntegrityError::InvalidWinner {
                    game: self.id,
                    winner: w.clone(),
                })
            }
        };
        let margin = match (outcome, result.margin) {
            (_, Some(m)) => m.abs(),
            (Outcome::Tie, None) => 0.0,
            (_, None) => return Err(DataIntegrityError::MissingMargin { game: self.id }),
        };
        Ok(Some((outcome, margin)))
    }
}

/// Check a schedule against the league: known teams, no self-matches, ids
/// strictly increasing, and decodable results.
pub fn validate_schedule(league: &League, games: &[Game]) -> Result<(), DataIntegrityError> {
    let mut previous: Option<GameId> = None;
    for game in games {
        for team in [&game.home, &game.away] {
            if !league.contains(team) {
                return Err(DataIntegrityError::UnknownTeam {
                    game: game.id,
                    team: team.clone(),
                });
            }
        }
        if game.home == game.away {
            return Err(DataIntegrityError::SelfMatch {
                game: game.id,
                team: game.home.clone(),
            });
        }
        if let Some(prev) = previous {
            if game.id == prev {
                return Err(DataIntegrityError::DuplicateGameId { game: game.id });
            }
            if game.id < prev {
                return Err(DataIntegrityError::NonIncreasingGameId {
                    previous: prev,
                    game: game.id,
                });
            }
        }
        game.actual()?;
        previous = Some(game.id);
    }
    Ok(())
}
