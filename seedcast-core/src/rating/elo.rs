//! Sequential ELO rating updates with a margin-of-victory multiplier.
//!
//! The engine is a fold over completed games in strictly increasing game-id
//! order. Each update is zero-sum: the away team receives the exact negation
//! of the home team's delta.

use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::domain::{Game, GameId, Outcome, RatingMap, TeamId};
use crate::error::DataIntegrityError;

/// Constants of the rating model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingParams {
    pub k_factor: f64,
    pub home_advantage: f64,
    pub elo_scale: f64,
    pub mov_base: f64,
    pub mov_divisor: f64,
}

impl Default for RatingParams {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

impl From<&ModelConfig> for RatingParams {
    fn from(config: &ModelConfig) -> Self {
        Self {
            k_factor: config.k_factor,
            home_advantage: config.home_advantage_points,
            elo_scale: config.elo_scale,
            mov_base: config.mov_base,
            mov_divisor: config.mov_divisor,
        }
    }
}

/// Probability that the home side wins, given both ratings and the effective
/// home advantage for this game.
pub fn expected_home_win(home: f64, away: f64, home_advantage: f64, elo_scale: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf(-(home + home_advantage - away) / elo_scale))
}

/// `ln(|margin| + 1) * base / (|rating_diff| * divisor + base)`.
pub fn mov_multiplier(margin: f64, rating_diff: f64, base: f64, divisor: f64) -> f64 {
    (margin.abs() + 1.0).ln() * (base / (rating_diff.abs() * divisor + base))
}

/// The pieces of one rating change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingDelta {
    pub expected_home: f64,
    pub mov_multiplier: f64,
    /// Change applied to the home team; the away team gets `-delta`.
    pub delta: f64,
}

/// Rate one game outcome. Pure; used by the engine and by hot simulation.
pub fn rate_game(
    params: &RatingParams,
    home_rating: f64,
    away_rating: f64,
    home_advantage: f64,
    outcome: Outcome,
    margin: f64,
) -> RatingDelta {
    let expected_home = expected_home_win(home_rating, away_rating, home_advantage, params.elo_scale);
    let rating_diff = home_rating + home_advantage - away_rating;
    let mov = mov_multiplier(margin, rating_diff, params.mov_base, params.mov_divisor);
    RatingDelta {
        expected_home,
        mov_multiplier: mov,
        delta: params.k_factor * mov * (outcome.home_score() - expected_home),
    }
}

/// Log entry for one applied game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub game: GameId,
    pub week: u32,
    pub home: TeamId,
    pub away: TeamId,
    pub home_before: f64,
    pub away_before: f64,
    pub home_advantage: f64,
    pub expected_home: f64,
    pub outcome: Outcome,
    pub margin: f64,
    pub mov_multiplier: f64,
    pub delta: f64,
}

impl RatingUpdate {
    pub fn home_after(&self) -> f64 {
        self.home_before + self.delta
    }

    pub fn away_after(&self) -> f64 {
        self.away_before - self.delta
    }
}

fn rating_of(ratings: &RatingMap, game: GameId, team: &TeamId) -> Result<f64, DataIntegrityError> {
    ratings
        .get(team)
        .copied()
        .ok_or_else(|| DataIntegrityError::UnknownTeam {
            game,
            team: team.clone(),
        })
}

/// Compute the update a completed game would apply, without mutating.
///
/// This is the `apply(ratings, game) -> (new_home, new_away)` contract;
/// the new ratings are `update.home_after()` / `update.away_after()`.
pub fn apply(
    params: &RatingParams,
    ratings: &RatingMap,
    game: &Game,
) -> Result<RatingUpdate, DataIntegrityError> {
    let home_before = rating_of(ratings, game.id, &game.home)?;
    let away_before = rating_of(ratings, game.id, &game.away)?;
    if game.home == game.away {
        return Err(DataIntegrityError::SelfMatch {
            game: game.id,
            team: game.home.clone(),
        });
    }
    let (outcome, margin) = game
        .actual()?
        .ok_or(DataIntegrityError::NoResult { game: game.id })?;
    let home_advantage = game.effective_home_advantage(params.home_advantage);
    let rated = rate_game(params, home_before, away_before, home_advantage, outcome, margin);

    Ok(RatingUpdate {
        game: game.id,
        week: game.week,
        home: game.home.clone(),
        away: game.away.clone(),
        home_before,
        away_before,
        home_advantage,
        expected_home: rated.expected_home,
        outcome,
        margin,
        mov_multiplier: rated.mov_multiplier,
        delta: rated.delta,
    })
}

/// Stateful fold over the completed-game log.
#[derive(Debug, Clone)]
pub struct RatingEngine {
    params: RatingParams,
    ratings: RatingMap,
    last_game: Option<GameId>,
    log: Vec<RatingUpdate>,
}

impl RatingEngine {
    pub fn new(params: RatingParams, initial: RatingMap) -> Self {
        Self {
            params,
            ratings: initial,
            last_game: None,
            log: Vec::new(),
        }
    }

    pub fn params(&self) -> &RatingParams {
        &self.params
    }

    pub fn ratings(&self) -> &RatingMap {
        &self.ratings
    }

    pub fn log(&self) -> &[RatingUpdate] {
        &self.log
    }

    pub fn last_game(&self) -> Option<GameId> {
        self.last_game
    }

    fn check_order(&self, previous: Option<GameId>, game: GameId) -> Result<(), DataIntegrityError> {
        match previous {
            Some(prev) if game == prev => Err(DataIntegrityError::DuplicateGameId { game }),
            Some(prev) if game < prev => {
                Err(DataIntegrityError::NonIncreasingGameId { previous: prev, game })
            }
            _ => Ok(()),
        }
    }

    /// Apply one completed game. On error nothing changes.
    pub fn apply(&mut self, game: &Game) -> Result<&RatingUpdate, DataIntegrityError> {
        self.check_order(self.last_game, game.id)?;
        let update = apply(&self.params, &self.ratings, game)?;
        Ok(self.commit(update))
    }

    /// Apply every completed game of `games`, skipping unplayed ones.
    ///
    /// The whole batch is validated first (ordering, team references,
    /// results), so a bad game anywhere leaves the ratings untouched.
    /// Returns the number of games applied.
    pub fn apply_all(&mut self, games: &[Game]) -> Result<usize, DataIntegrityError> {
        let mut previous = self.last_game;
        for game in games.iter().filter(|g| g.is_completed()) {
            self.check_order(previous, game.id)?;
            // Team, self-match and result checks do not depend on rating values.
            apply(&self.params, &self.ratings, game)?;
            previous = Some(game.id);
        }

        let mut applied = 0;
        for game in games.iter().filter(|g| g.is_completed()) {
            let update = apply(&self.params, &self.ratings, game)?;
            self.commit(update);
            applied += 1;
        }
        Ok(applied)
    }

    fn commit(&mut self, update: RatingUpdate) -> &RatingUpdate {
        self.ratings.insert(update.home.clone(), update.home_after());
        self.ratings.insert(update.away.clone(), update.away_after());
        self.last_game = Some(update.game);
        let at = self.log.len();
        self.log.push(update);
        &self.log[at]
    }

    pub fn into_parts(self) -> (RatingMap, Vec<RatingUpdate>) {
        (self.ratings, self.log)
    }
}
