//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Zero-sum rating updates for any ratings, margin and outcome
//! 2. Sampler draws are deterministic and inside [0, 1)
//! 3. Wilson intervals contain their point estimate
//! 4. Every simulated scenario credits each game exactly twice
//! 5. Seeds form a permutation per conference, bye iff seed 1

use proptest::prelude::*;

use seedcast_core::aggregate::{percentile_sorted, wilson_interval, Z_95};
use seedcast_core::domain::{
    Game, GameId, GameResult, League, Outcome, RatingMap, ScenarioId, Team, TeamId,
};
use seedcast_core::rating::{apply, RatingParams};
use seedcast_core::sampler::draw_stream;
use seedcast_core::simulator::SeasonSimulator;
use seedcast_core::tiebreak::TiebreakResolver;
use seedcast_core::{ModelConfig, SeedingConfig};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_rating() -> impl Strategy<Value = f64> {
    1200.0..1800.0_f64
}

fn arb_outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![Just(Outcome::HomeWin), Just(Outcome::AwayWin), Just(Outcome::Tie)]
}

/// 2 conferences x 2 divisions x 3 teams with the given ratings.
fn league(ratings: &[f64]) -> League {
    let mut teams = Vec::new();
    for (i, rating) in ratings.iter().enumerate() {
        let conference = if i < 6 { "East" } else { "West" };
        let division = if i % 6 < 3 { "One" } else { "Two" };
        teams.push(Team::new(format!("T{i:02}"), conference, division, *rating));
    }
    League::new(teams).unwrap()
}

/// Double round robin within each conference plus a few cross games.
fn schedule(league: &League) -> Vec<Game> {
    let ids: Vec<TeamId> = league.teams().iter().map(|t| t.id.clone()).collect();
    let mut games = Vec::new();
    let mut next = 1u64;
    for leg in 0..2u32 {
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let same_conf = league.same_conference(&ids[i], &ids[j]);
                if !same_conf && (i + j) % 4 != 0 {
                    continue;
                }
                let (home, away) = if leg == 0 { (i, j) } else { (j, i) };
                games.push(Game::new(next, leg + 1, ids[home].clone(), ids[away].clone()));
                next += 1;
            }
        }
    }
    games
}

// ── 1. Zero-sum ratings ──────────────────────────────────────────────

proptest! {
    #[test]
    fn rating_updates_are_zero_sum(
        home in arb_rating(),
        away in arb_rating(),
        margin in 0.0..50.0_f64,
        outcome in arb_outcome(),
        neutral in any::<bool>(),
    ) {
        let mut game = Game::new(1, 1, "H", "A");
        if neutral {
            game = game.neutral();
        }
        let result = match outcome {
            Outcome::HomeWin => GameResult::win("H", margin),
            Outcome::AwayWin => GameResult::win("A", margin),
            Outcome::Tie => GameResult::tie(),
        };
        let game = game.with_result(result);
        let ratings: RatingMap = [(TeamId::from("H"), home), (TeamId::from("A"), away)]
            .into_iter()
            .collect();

        let update = apply(&RatingParams::default(), &ratings, &game).unwrap();
        let total_before = home + away;
        let total_after = update.home_after() + update.away_after();
        prop_assert!((total_before - total_after).abs() < 1e-9);
        prop_assert!(update.expected_home > 0.0 && update.expected_home < 1.0);
        // The winner never loses rating.
        match outcome {
            Outcome::HomeWin => prop_assert!(update.delta >= 0.0),
            Outcome::AwayWin => prop_assert!(update.delta <= 0.0),
            Outcome::Tie => {}
        }
    }
}

// ── 2. Sampler ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn draws_are_pure_and_bounded(
        scenario in 1..1_000_000u32,
        game in any::<u64>(),
        seed in any::<u64>(),
        stream in 0..4u32,
    ) {
        let a = draw_stream(ScenarioId(scenario), GameId(game), seed, stream);
        let b = draw_stream(ScenarioId(scenario), GameId(game), seed, stream);
        prop_assert_eq!(a.to_bits(), b.to_bits());
        prop_assert!((0.0..1.0).contains(&a));
    }
}

// ── 3. Intervals ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn wilson_contains_estimate(n in 1..20_000u32, frac in 0.0..=1.0_f64) {
        let k = ((n as f64) * frac).round() as u32;
        let p = k as f64 / n as f64;
        let (lo, hi) = wilson_interval(k, n, Z_95);
        prop_assert!(0.0 <= lo && lo <= p && p <= hi && hi <= 1.0, "{} <= {} <= {}", lo, p, hi);
    }

    #[test]
    fn percentiles_are_ordered(mut data in prop::collection::vec(0.0..17.0_f64, 1..200)) {
        data.sort_by(f64::total_cmp);
        let lo = percentile_sorted(&data, 2.5);
        let hi = percentile_sorted(&data, 97.5);
        prop_assert!(data[0] <= lo && lo <= hi && hi <= data[data.len() - 1]);
    }
}

// ── 4 & 5. Simulation and seeding ────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn scenarios_conserve_games_and_seed_cleanly(
        ratings in prop::collection::vec(arb_rating(), 12),
        seed in any::<u64>(),
        scenario in 1..10_000u32,
        playoff_seeds in 2..7u32,
    ) {
        let league = league(&ratings);
        let schedule = schedule(&league);
        let config = ModelConfig { random_seed: seed, scenario_count: 1, ..Default::default() };
        let sim = SeasonSimulator::new(&league, &schedule, &league.ratings(), &config).unwrap();
        let outcome = sim.simulate(ScenarioId(scenario));

        prop_assert_eq!(outcome.standings.team_games(), 2 * schedule.len() as u32);
        for line in &outcome.standings.teams {
            let scheduled = schedule.iter().filter(|g| g.involves(&line.team)).count() as u32;
            prop_assert_eq!(line.overall.games(), scheduled);
        }

        let seeding = SeedingConfig { playoff_seeds, ..Default::default() };
        let resolver = TiebreakResolver::new(&league, seeding).unwrap();
        let seeds = resolver.resolve(&outcome.standings).unwrap();
        for conference in ["East", "West"] {
            let mut got: Vec<u32> = seeds
                .iter()
                .filter(|s| s.conference == conference)
                .filter_map(|s| s.seed)
                .collect();
            got.sort_unstable();
            prop_assert_eq!(got, (1..=playoff_seeds).collect::<Vec<u32>>());

            let mut ranks: Vec<u32> = seeds
                .iter()
                .filter(|s| s.conference == conference)
                .map(|s| s.conference_rank)
                .collect();
            ranks.sort_unstable();
            prop_assert_eq!(ranks, (1..=6).collect::<Vec<u32>>());
        }
        for s in &seeds {
            prop_assert_eq!(s.bye, s.seed == Some(1));
        }
        prop_assert_eq!(seeds.iter().filter(|s| s.division_winner).count(), 4);
    }
}
