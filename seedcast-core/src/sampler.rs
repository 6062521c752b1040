//! Keyed deterministic draws.
//!
//! Every random value in a simulation is a pure function of
//! `(seed, scenario, game, stream)`: the key is hashed with BLAKE3 and the
//! first eight bytes of the digest become a uniform float. Nothing is
//! advanced sequentially, so scenarios can run on any thread in any order
//! and still reproduce bit for bit.

use crate::domain::{GameId, ScenarioId};

/// Domain separation tag, versioned so a future key layout cannot collide.
const DRAW_TAG: &[u8] = b"seedcast.draw.v1";

/// Stream index of the draw that decides a game's winner.
pub const OUTCOME_STREAM: u32 = 0;
/// Stream index of the draw that sizes a simulated margin.
pub const MARGIN_STREAM: u32 = 1;

/// Uniform draw in `[0, 1)` for the outcome of `game` in `scenario`.
pub fn draw(scenario: ScenarioId, game: GameId, seed: u64) -> f64 {
    draw_stream(scenario, game, seed, OUTCOME_STREAM)
}

/// Uniform draw in `[0, 1)` on an explicit stream.
pub fn draw_stream(scenario: ScenarioId, game: GameId, seed: u64, stream: u32) -> f64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DRAW_TAG);
    hasher.update(&seed.to_le_bytes());
    hasher.update(&scenario.0.to_le_bytes());
    hasher.update(&game.0.to_le_bytes());
    hasher.update(&stream.to_le_bytes());
    let hash = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&hash.as_bytes()[..8]);
    unit_interval(u64::from_le_bytes(head))
}

/// Top 53 bits of `bits` as a float in `[0, 1)`.
fn unit_interval(bits: u64) -> f64 {
    (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// A sampler bound to one master seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioSampler {
    master_seed: u64,
}

impl ScenarioSampler {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn outcome(&self, scenario: ScenarioId, game: GameId) -> f64 {
        draw_stream(scenario, game, self.master_seed, OUTCOME_STREAM)
    }

    pub fn margin(&self, scenario: ScenarioId, game: GameId) -> f64 {
        draw_stream(scenario, game, self.master_seed, MARGIN_STREAM)
    }
}
