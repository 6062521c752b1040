//! Team-strength ratings: the sequential ELO engine and off-season carry-over.

mod elo;
mod preseason;

pub use elo::{
    apply, expected_home_win, mov_multiplier, rate_game, RatingDelta, RatingEngine, RatingParams,
    RatingUpdate,
};
pub use preseason::{carry_over, PreseasonConfig};
