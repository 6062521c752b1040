//! Playoff seeding from one scenario's final standings.
//!
//! Each division is ranked with the tiebreak ladder and its leader becomes
//! the division winner. Division winners take the top seeds, then every
//! other conference team is ranked for the wild cards.

mod resolver;
mod rules;

pub use resolver::{Ranked, SeedAssignment, TiebreakResolver};
pub use rules::{tiers_by, TiebreakContext, TiebreakRule};
