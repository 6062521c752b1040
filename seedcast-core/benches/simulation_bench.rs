//! Criterion benchmarks for the per-scenario hot path.
//!
//! Benchmarks:
//! 1. Keyed draws (BLAKE3 per game)
//! 2. One full season simulation (32 teams, 272 games)
//! 3. Tiebreak seeding of one scenario
//! 4. Rating engine fold over a full season of results

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use seedcast_core::domain::{Game, GameId, GameResult, League, ScenarioId, Team};
use seedcast_core::rating::{RatingEngine, RatingParams};
use seedcast_core::sampler::draw;
use seedcast_core::simulator::SeasonSimulator;
use seedcast_core::tiebreak::TiebreakResolver;
use seedcast_core::{ModelConfig, SeedingConfig};

// ── Helpers ──────────────────────────────────────────────────────────

/// 2 conferences x 4 divisions x 4 teams.
fn make_league(rng: &mut StdRng) -> League {
    let mut teams = Vec::with_capacity(32);
    for conf in ["AFC", "NFC"] {
        for div in ["East", "North", "South", "West"] {
            for slot in 0..4 {
                let id = format!("{conf}-{div}-{slot}");
                teams.push(Team::new(id, conf, div, rng.gen_range(1350.0..1700.0)));
            }
        }
    }
    League::new(teams).unwrap()
}

/// 17 weeks of random pairings (every team plays once a week).
fn make_schedule(league: &League, rng: &mut StdRng) -> Vec<Game> {
    let ids: Vec<_> = league.teams().iter().map(|t| t.id.clone()).collect();
    let mut games = Vec::new();
    let mut next = 1u64;
    for week in 1..=17u32 {
        let mut order: Vec<usize> = (0..ids.len()).collect();
        for i in (1..order.len()).rev() {
            order.swap(i, rng.gen_range(0..=i));
        }
        for pair in order.chunks(2) {
            games.push(Game::new(next, week, ids[pair[0]].clone(), ids[pair[1]].clone()));
            next += 1;
        }
    }
    games
}

fn with_results(schedule: &[Game], rng: &mut StdRng) -> Vec<Game> {
    schedule
        .iter()
        .map(|g| {
            let winner = if rng.gen_bool(0.55) { g.home.clone() } else { g.away.clone() };
            g.clone()
                .with_result(GameResult::win(winner, rng.gen_range(1..30) as f64))
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_draws(c: &mut Criterion) {
    c.bench_function("draw_272_games", |b| {
        b.iter(|| {
            (1..=272u64)
                .map(|g| draw(black_box(ScenarioId(7)), GameId(g), 42))
                .sum::<f64>()
        })
    });
}

fn bench_simulation(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let league = make_league(&mut rng);
    let schedule = make_schedule(&league, &mut rng);
    let ratings = league.ratings();

    let mut group = c.benchmark_group("simulate_season");
    for mode in ["cold", "hot"] {
        let config = ModelConfig {
            simulation_mode: if mode == "hot" {
                seedcast_core::SimulationMode::Hot
            } else {
                seedcast_core::SimulationMode::Cold
            },
            ..Default::default()
        };
        let sim = SeasonSimulator::new(&league, &schedule, &ratings, &config).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(mode), &sim, |b, sim| {
            let mut scenario = 0u32;
            b.iter(|| {
                scenario += 1;
                sim.simulate(black_box(ScenarioId(scenario)))
            })
        });
    }
    group.finish();
}

fn bench_seeding(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let league = make_league(&mut rng);
    let schedule = make_schedule(&league, &mut rng);
    let sim = SeasonSimulator::new(&league, &schedule, &league.ratings(), &ModelConfig::default()).unwrap();
    let standings = sim.simulate(ScenarioId(1)).standings;
    let resolver = TiebreakResolver::new(&league, SeedingConfig::default()).unwrap();

    c.bench_function("resolve_32_teams", |b| {
        b.iter(|| resolver.resolve(black_box(&standings)).unwrap())
    });
}

fn bench_rating_fold(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let league = make_league(&mut rng);
    let schedule = make_schedule(&league, &mut rng);
    let results = with_results(&schedule, &mut rng);
    let initial = league.ratings();

    c.bench_function("rating_fold_272_games", |b| {
        b.iter(|| {
            let mut engine = RatingEngine::new(RatingParams::default(), initial.clone());
            engine.apply_all(black_box(&results)).unwrap()
        })
    });
}

criterion_group!(benches, bench_draws, bench_simulation, bench_seeding, bench_rating_fold);
criterion_main!(benches);
