use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use super::rules::{TiebreakContext, TiebreakRule};
use crate::config::{SeedingConfig, TiebreakFallback};
use crate::domain::{League, ScenarioId, TeamId};
use crate::error::{ConfigurationError, DataIntegrityError, Result, TiebreakExhaustionError};
use crate::standings::ScenarioStandings;

/// One team's playoff position in one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedAssignment {
    pub team: TeamId,
    pub conference: String,
    /// `None` when the team missed the playoffs.
    pub seed: Option<u32>,
    pub division_winner: bool,
    pub bye: bool,
    /// Position within the conference, 1-based; equals `seed` for playoff teams.
    pub conference_rank: u32,
    /// Rule that separated the team in the conference ranking, if it was tied.
    pub decided_by: Option<TiebreakRule>,
}

/// A team ranked within some group, with the rule that placed it.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub team: TeamId,
    pub decided_by: Option<TiebreakRule>,
}

/// Seeds every conference of one scenario.
#[derive(Debug, Clone)]
pub struct TiebreakResolver<'a> {
    league: &'a League,
    config: SeedingConfig,
}

impl<'a> TiebreakResolver<'a> {
    /// Check the seeding structure against the league once, up front.
    pub fn new(league: &'a League, config: SeedingConfig) -> std::result::Result<Self, ConfigurationError> {
        config.validate()?;
        for conference in league.conferences() {
            let size = league.teams().iter().filter(|t| t.conference == conference).count();
            let divisions = league.divisions(conference).len();
            let seeds = (config.playoff_seeds as usize).min(size);
            if divisions > seeds {
                return Err(ConfigurationError::TooManyDivisions {
                    conference: conference.to_string(),
                    divisions,
                    seeds: seeds as u32,
                });
            }
        }
        Ok(Self { league, config })
    }

    pub fn config(&self) -> &SeedingConfig {
        &self.config
    }

    /// Standings must list every league team exactly once.
    fn check_standings(&self, standings: &ScenarioStandings) -> std::result::Result<(), DataIntegrityError> {
        let scenario = standings.scenario;
        let mut seen = BTreeSet::new();
        for line in &standings.teams {
            if !self.league.contains(&line.team) {
                return Err(DataIntegrityError::UnexpectedStanding {
                    scenario,
                    team: line.team.clone(),
                });
            }
            if !seen.insert(&line.team) {
                return Err(DataIntegrityError::DuplicateStanding {
                    scenario,
                    team: line.team.clone(),
                });
            }
        }
        if let Some(team) = self.league.teams().iter().find(|t| !seen.contains(&t.id)) {
            return Err(DataIntegrityError::MissingStanding {
                scenario,
                team: team.id.clone(),
            });
        }
        Ok(())
    }

    /// Rank `group` best first by walking the ladder from rule `start`.
    ///
    /// A tier that a rule leaves tied continues with the next rule; teams a
    /// rule has separated never meet the earlier rules again.
    pub fn rank(
        &self,
        scenario: ScenarioId,
        group: &[TeamId],
        ctx: &TiebreakContext<'_>,
    ) -> Result<Vec<Ranked>> {
        let mut out = Vec::with_capacity(group.len());
        self.rank_from(scenario, group.to_vec(), 0, None, ctx, &mut out)?;
        Ok(out)
    }

    fn rank_from(
        &self,
        scenario: ScenarioId,
        group: Vec<TeamId>,
        start: usize,
        placed_by: Option<TiebreakRule>,
        ctx: &TiebreakContext<'_>,
        out: &mut Vec<Ranked>,
    ) -> Result<()> {
        if group.is_empty() {
            return Ok(());
        }
        if let [team] = group.as_slice() {
            out.push(Ranked {
                team: team.clone(),
                decided_by: placed_by,
            });
            return Ok(());
        }

        for (offset, rule) in TiebreakRule::LADDER.iter().enumerate().skip(start) {
            let tiers = rule.apply(&group, ctx);
            if tiers.len() > 1 {
                for tier in tiers {
                    self.rank_from(scenario, tier, offset + 1, Some(*rule), ctx, out)?;
                }
                return Ok(());
            }
        }

        match self.config.fallback {
            TiebreakFallback::TeamId => {
                for tier in TiebreakRule::Fallback.apply(&group, ctx) {
                    out.extend(tier.into_iter().map(|team| Ranked {
                        team,
                        decided_by: Some(TiebreakRule::Fallback),
                    }));
                }
                Ok(())
            }
            TiebreakFallback::Error => {
                let mut teams = group;
                teams.sort();
                Err(TiebreakExhaustionError { scenario, teams }.into())
            }
        }
    }

    /// Order the non-winners of one conference.
    ///
    /// Each round compares only the best remaining team of every division,
    /// takes the one the ladder puts first and repeats, so division-mates
    /// always keep their division order.
    fn rank_wildcards(
        &self,
        scenario: ScenarioId,
        mut remainders: Vec<VecDeque<TeamId>>,
        ctx: &TiebreakContext<'_>,
    ) -> Result<Vec<Ranked>> {
        let mut out = Vec::with_capacity(remainders.iter().map(VecDeque::len).sum());
        loop {
            let heads: Vec<TeamId> = remainders.iter().filter_map(|d| d.front().cloned()).collect();
            let Some(best) = self.rank(scenario, &heads, ctx)?.into_iter().next() else {
                return Ok(out);
            };
            if let Some(division) = remainders.iter_mut().find(|d| d.front() == Some(&best.team)) {
                division.pop_front();
            }
            out.push(best);
        }
    }

    /// Seed every conference. Output is in league (team id) order.
    pub fn resolve(&self, standings: &ScenarioStandings) -> Result<Vec<SeedAssignment>> {
        self.check_standings(standings)?;
        let scenario = standings.scenario;
        let ctx = TiebreakContext::new(standings, self.config.min_common_games);
        let mut assignments: Vec<SeedAssignment> = Vec::with_capacity(self.league.len());

        for conference in self.league.conferences() {
            let divisions = self.league.divisions(conference);
            let size: usize = divisions.values().map(Vec::len).sum();
            let seeds = (self.config.playoff_seeds as usize).min(size);

            let mut winners = Vec::with_capacity(divisions.len());
            let mut remainders = Vec::with_capacity(divisions.len());
            for members in divisions.values() {
                let ranked = self.rank(scenario, members, &ctx)?;
                let mut ranked = ranked.into_iter().map(|r| r.team);
                if let Some(winner) = ranked.next() {
                    winners.push(winner);
                }
                remainders.push(ranked.collect::<VecDeque<_>>());
            }

            let winner_set: BTreeSet<TeamId> = winners.iter().cloned().collect();
            let mut order = self.rank(scenario, &winners, &ctx)?;
            order.extend(self.rank_wildcards(scenario, remainders, &ctx)?);

            for (i, ranked) in order.into_iter().enumerate() {
                let rank = i as u32 + 1;
                let seed = (i < seeds).then_some(rank);
                assignments.push(SeedAssignment {
                    division_winner: winner_set.contains(&ranked.team),
                    team: ranked.team,
                    conference: conference.to_string(),
                    seed,
                    bye: seed == Some(1),
                    conference_rank: rank,
                    decided_by: ranked.decided_by,
                });
            }
        }

        assignments.sort_by(|a, b| a.team.cmp(&b.team));
        Ok(assignments)
    }
}
