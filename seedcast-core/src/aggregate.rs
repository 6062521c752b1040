//! Cross-scenario aggregation: probabilities with Wilson intervals and
//! empirical percentile intervals.
//!
//! The accumulator keeps integer counts and raw samples only. Means are
//! computed from integer sums and percentiles from sorted samples, so the
//! final estimates do not depend on the order scenarios were pushed or
//! partial accumulators were merged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{League, ScenarioId, TeamId};
use crate::error::DataIntegrityError;
use crate::standings::ScenarioStandings;
use crate::tiebreak::SeedAssignment;

/// Two-sided 95% normal quantile.
pub const Z_95: f64 = 1.96;

/// Percentile bounds of the empirical interval.
pub const LOWER_PERCENTILE: f64 = 2.5;
pub const UPPER_PERCENTILE: f64 = 97.5;

/// Per-team summary across every scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateEstimate {
    pub team: TeamId,
    pub conference: String,
    pub scenarios: u32,
    pub playoff_prob: f64,
    pub playoff_lower: f64,
    pub playoff_upper: f64,
    pub bye_prob: f64,
    pub bye_lower: f64,
    pub bye_upper: f64,
    pub division_prob: f64,
    pub mean_wins: f64,
    pub wins_lower: f64,
    pub wins_upper: f64,
    /// Mean conference rank; missed-playoff scenarios count at their rank.
    pub mean_seed: f64,
    pub seed_lower: f64,
    pub seed_upper: f64,
    /// `seed_distribution[i]` = scenarios in which the team held seed `i + 1`.
    pub seed_distribution: Vec<u32>,
}

/// Wilson score interval for `successes` out of `n`, clamped so the point
/// estimate always lies inside. `n = 0` gives the uninformative `(0, 1)`.
pub fn wilson_interval(successes: u32, n: u32, z: f64) -> (f64, f64) {
    if n == 0 {
        return (0.0, 1.0);
    }
    let n_f = n as f64;
    let p = successes as f64 / n_f;
    let z2 = z * z;
    let denom = 1.0 + z2 / n_f;
    let centre = p + z2 / (2.0 * n_f);
    let spread = z * (p * (1.0 - p) / n_f + z2 / (4.0 * n_f * n_f)).sqrt();
    let lower = ((centre - spread) / denom).clamp(0.0, 1.0).min(p);
    let upper = ((centre + spread) / denom).clamp(0.0, 1.0).max(p);
    (lower, upper)
}

/// Linear-interpolation percentile of pre-sorted data, `p` in [0, 100].
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

#[derive(Debug, Clone, PartialEq)]
struct TeamTally {
    conference: String,
    scenarios: u32,
    playoff: u32,
    bye: u32,
    division: u32,
    wins: Vec<u32>,
    ranks: Vec<u32>,
    seed_counts: Vec<u32>,
}

impl TeamTally {
    fn merge(&mut self, other: TeamTally) {
        self.scenarios += other.scenarios;
        self.playoff += other.playoff;
        self.bye += other.bye;
        self.division += other.division;
        self.wins.extend(other.wins);
        self.ranks.extend(other.ranks);
        for (mine, theirs) in self.seed_counts.iter_mut().zip(other.seed_counts) {
            *mine += theirs;
        }
    }
}

/// Commutative, associative accumulator over scenarios.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateAccumulator {
    tallies: BTreeMap<TeamId, TeamTally>,
}

impl EstimateAccumulator {
    /// Empty accumulator for `league` with `playoff_seeds` seed slots.
    pub fn new(league: &League, playoff_seeds: u32) -> Self {
        let tallies = league
            .teams()
            .iter()
            .map(|t| {
                (
                    t.id.clone(),
                    TeamTally {
                        conference: t.conference.clone(),
                        scenarios: 0,
                        playoff: 0,
                        bye: 0,
                        division: 0,
                        wins: Vec::new(),
                        ranks: Vec::new(),
                        seed_counts: vec![0; playoff_seeds as usize],
                    },
                )
            })
            .collect();
        Self { tallies }
    }

    /// Add one scenario's standings and seeds.
    pub fn push(
        &mut self,
        standings: &ScenarioStandings,
        seeds: &[SeedAssignment],
    ) -> Result<(), DataIntegrityError> {
        let scenario = standings.scenario;
        for line in &standings.teams {
            self.tally(scenario, &line.team)?.wins.push(line.overall.wins);
        }
        for assignment in seeds {
            let tally = self.tally(scenario, &assignment.team)?;
            tally.scenarios += 1;
            tally.ranks.push(assignment.conference_rank);
            if let Some(seed) = assignment.seed {
                tally.playoff += 1;
                let slot = (seed as usize)
                    .checked_sub(1)
                    .and_then(|i| tally.seed_counts.get_mut(i));
                if let Some(slot) = slot {
                    *slot += 1;
                }
            }
            tally.bye += u32::from(assignment.bye);
            tally.division += u32::from(assignment.division_winner);
        }
        Ok(())
    }

    fn tally(&mut self, scenario: ScenarioId, team: &TeamId) -> Result<&mut TeamTally, DataIntegrityError> {
        self.tallies
            .get_mut(team)
            .ok_or_else(|| DataIntegrityError::UnexpectedStanding {
                scenario,
                team: team.clone(),
            })
    }

    /// Combine two partial accumulators over the same league.
    pub fn merge(mut self, other: EstimateAccumulator) -> Self {
        for (team, theirs) in other.tallies {
            match self.tallies.get_mut(&team) {
                Some(mine) => mine.merge(theirs),
                None => {
                    self.tallies.insert(team, theirs);
                }
            }
        }
        self
    }

    pub fn scenarios(&self) -> u32 {
        self.tallies.values().map(|t| t.scenarios).max().unwrap_or(0)
    }

    /// One estimate per team, in team id order.
    pub fn finish(self) -> Vec<AggregateEstimate> {
        self.tallies
            .into_iter()
            .map(|(team, tally)| estimate(team, tally))
            .collect()
    }
}

fn mean(samples: &[u32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&x| x as u64).sum::<u64>() as f64 / samples.len() as f64
}

fn sorted_f64(samples: &[u32]) -> Vec<f64> {
    let mut sorted: Vec<f64> = samples.iter().map(|&x| x as f64).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

fn estimate(team: TeamId, tally: TeamTally) -> AggregateEstimate {
    let n = tally.scenarios;
    let prob = |k: u32| if n == 0 { 0.0 } else { k as f64 / n as f64 };
    let (playoff_lower, playoff_upper) = wilson_interval(tally.playoff, n, Z_95);
    let (bye_lower, bye_upper) = wilson_interval(tally.bye, n, Z_95);
    let wins = sorted_f64(&tally.wins);
    let ranks = sorted_f64(&tally.ranks);

    AggregateEstimate {
        team,
        conference: tally.conference,
        scenarios: n,
        playoff_prob: prob(tally.playoff),
        playoff_lower,
        playoff_upper,
        bye_prob: prob(tally.bye),
        bye_lower,
        bye_upper,
        division_prob: prob(tally.division),
        mean_wins: mean(&tally.wins),
        wins_lower: percentile_sorted(&wins, LOWER_PERCENTILE),
        wins_upper: percentile_sorted(&wins, UPPER_PERCENTILE),
        mean_seed: mean(&tally.ranks),
        seed_lower: percentile_sorted(&ranks, LOWER_PERCENTILE),
        seed_upper: percentile_sorted(&ranks, UPPER_PERCENTILE),
        seed_distribution: tally.seed_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Team;
    use crate::standings::{Record, TeamStanding};

    #[test]
    fn wilson_known_value() {
        // 50/100 at z = 1.96.
        let (lo, hi) = wilson_interval(50, 100, Z_95);
        assert!((lo - 0.4038298).abs() < 1e-5, "{lo}");
        assert!((hi - 0.5961702).abs() < 1e-5, "{hi}");
    }

    #[test]
    fn wilson_edges_contain_the_estimate() {
        let (lo, hi) = wilson_interval(0, 10, Z_95);
        assert_eq!(lo, 0.0);
        assert!(hi > 0.0 && hi < 1.0);
        let (lo, hi) = wilson_interval(10, 10, Z_95);
        assert_eq!(hi, 1.0);
        assert!(lo < 1.0);
        assert_eq!(wilson_interval(0, 0, Z_95), (0.0, 1.0));
    }

    #[test]
    fn percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&data, 50.0), 3.0);
        assert_eq!(percentile_sorted(&data, 0.0), 1.0);
        assert_eq!(percentile_sorted(&data, 100.0), 5.0);
        assert!((percentile_sorted(&data, 2.5) - 1.1).abs() < 1e-12);
        assert_eq!(percentile_sorted(&[], 50.0), 0.0);
    }

    fn league() -> League {
        League::new(vec![
            Team::new("A", "East", "North", 1500.0),
            Team::new("B", "East", "North", 1500.0),
        ])
        .unwrap()
    }

    fn scenario(id: u32, a_wins: u32) -> (ScenarioStandings, Vec<SeedAssignment>) {
        let line = |team: &str, wins: u32| {
            let mut s = TeamStanding::new(TeamId::from(team), "East".into(), "North".into());
            s.overall = Record { wins, losses: 2 - wins, ties: 0 };
            s
        };
        let a_first = a_wins >= 1;
        let seed = |team: &str, first: bool| SeedAssignment {
            team: TeamId::from(team),
            conference: "East".into(),
            seed: first.then_some(1),
            division_winner: first,
            bye: first,
            conference_rank: if first { 1 } else { 2 },
            decided_by: None,
        };
        (
            ScenarioStandings {
                scenario: ScenarioId(id),
                teams: vec![line("A", a_wins), line("B", 2 - a_wins)],
            },
            vec![seed("A", a_first), seed("B", !a_first)],
        )
    }

    #[test]
    fn estimates_match_hand_counts() {
        let league = league();
        let mut acc = EstimateAccumulator::new(&league, 1);
        for (id, a_wins) in [(1, 2), (2, 1), (3, 0), (4, 2)] {
            let (standings, seeds) = scenario(id, a_wins);
            acc.push(&standings, &seeds).unwrap();
        }
        let estimates = acc.finish();
        let a = &estimates[0];
        assert_eq!(a.team, TeamId::from("A"));
        assert_eq!(a.scenarios, 4);
        assert_eq!(a.playoff_prob, 0.75);
        assert_eq!(a.bye_prob, 0.75);
        assert_eq!(a.division_prob, 0.75);
        assert_eq!(a.mean_wins, 1.25);
        assert_eq!(a.mean_seed, 1.25);
        assert_eq!(a.seed_distribution, vec![3]);
        assert!(a.playoff_lower <= a.playoff_prob && a.playoff_prob <= a.playoff_upper);
        assert!(a.wins_lower <= a.mean_wins && a.mean_wins <= a.wins_upper);
    }

    #[test]
    fn merge_order_does_not_matter() {
        let league = league();
        let build = |ids: &[(u32, u32)]| {
            let mut acc = EstimateAccumulator::new(&league, 1);
            for &(id, a_wins) in ids {
                let (standings, seeds) = scenario(id, a_wins);
                acc.push(&standings, &seeds).unwrap();
            }
            acc
        };
        let left = build(&[(1, 2), (2, 0)]);
        let right = build(&[(3, 1), (4, 1), (5, 2)]);
        let whole = build(&[(1, 2), (2, 0), (3, 1), (4, 1), (5, 2)]);

        let ab = left.clone().merge(right.clone()).finish();
        let ba = right.merge(left).finish();
        assert_eq!(ab, ba);
        assert_eq!(ab, whole.finish());
    }

    #[test]
    fn unknown_team_rejected() {
        let league = league();
        let mut acc = EstimateAccumulator::new(&league, 1);
        let (mut standings, seeds) = scenario(1, 1);
        standings.teams[0].team = TeamId::from("Z");
        assert!(matches!(
            acc.push(&standings, &seeds),
            Err(DataIntegrityError::UnexpectedStanding { .. })
        ));
    }
}
