//! The tiebreak ladder.
//!
//! Each rule is a pure function from a tied group to ordered tiers (best
//! first). A rule that does not apply, or cannot separate anyone, returns
//! the whole group as a single tier.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::domain::TeamId;
use crate::standings::{Record, ScenarioStandings, TeamStanding};

/// Which rule separated a team from its tied group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiebreakRule {
    WinPct,
    HeadToHead,
    DivisionRecord,
    CommonGames,
    ConferenceRecord,
    StrengthOfVictory,
    StrengthOfSchedule,
    ConferenceNetPoints,
    NetPoints,
    Fallback,
}

impl TiebreakRule {
    /// The ladder in application order. `Fallback` is not a rule function.
    pub const LADDER: [TiebreakRule; 9] = [
        TiebreakRule::WinPct,
        TiebreakRule::HeadToHead,
        TiebreakRule::DivisionRecord,
        TiebreakRule::CommonGames,
        TiebreakRule::ConferenceRecord,
        TiebreakRule::StrengthOfVictory,
        TiebreakRule::StrengthOfSchedule,
        TiebreakRule::ConferenceNetPoints,
        TiebreakRule::NetPoints,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TiebreakRule::WinPct => "win_pct",
            TiebreakRule::HeadToHead => "head_to_head",
            TiebreakRule::DivisionRecord => "division_record",
            TiebreakRule::CommonGames => "common_games",
            TiebreakRule::ConferenceRecord => "conference_record",
            TiebreakRule::StrengthOfVictory => "strength_of_victory",
            TiebreakRule::StrengthOfSchedule => "strength_of_schedule",
            TiebreakRule::ConferenceNetPoints => "conference_net_points",
            TiebreakRule::NetPoints => "net_points",
            TiebreakRule::Fallback => "fallback",
        }
    }

    /// Apply this rule to a tied group.
    pub fn apply(self, group: &[TeamId], ctx: &TiebreakContext<'_>) -> Vec<Vec<TeamId>> {
        match self {
            TiebreakRule::WinPct => win_pct(group, ctx),
            TiebreakRule::HeadToHead => head_to_head(group, ctx),
            TiebreakRule::DivisionRecord => division_record(group, ctx),
            TiebreakRule::CommonGames => common_games(group, ctx),
            TiebreakRule::ConferenceRecord => conference_record(group, ctx),
            TiebreakRule::StrengthOfVictory => strength_of_victory(group, ctx),
            TiebreakRule::StrengthOfSchedule => strength_of_schedule(group, ctx),
            TiebreakRule::ConferenceNetPoints => conference_net_points(group, ctx),
            TiebreakRule::NetPoints => net_points(group, ctx),
            TiebreakRule::Fallback => fallback(group),
        }
    }
}

impl fmt::Display for TiebreakRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of one scenario's standings for the rule functions.
#[derive(Debug)]
pub struct TiebreakContext<'a> {
    by_team: BTreeMap<&'a TeamId, &'a TeamStanding>,
    min_common_games: u32,
}

impl<'a> TiebreakContext<'a> {
    /// Index standings by team. Callers validate the standings first, so
    /// later lookups of group members cannot miss.
    pub fn new(standings: &'a ScenarioStandings, min_common_games: u32) -> Self {
        Self {
            by_team: standings.teams.iter().map(|s| (&s.team, s)).collect(),
            min_common_games,
        }
    }

    pub fn standing(&self, team: &TeamId) -> Option<&'a TeamStanding> {
        self.by_team.get(team).copied()
    }

    fn overall(&self, team: &TeamId) -> Record {
        self.standing(team).map(|s| s.overall).unwrap_or_default()
    }
}

// ─── Tiering ────────────────────────────────────────────────────────

/// Order `group` by `key` descending and split into tiers of equal key.
/// Ties inside a tier keep ascending team-id order.
pub fn tiers_by(group: &[TeamId], key: impl Fn(&TeamId) -> f64) -> Vec<Vec<TeamId>> {
    let mut keyed: Vec<(f64, &TeamId)> = group.iter().map(|t| (key(t), t)).collect();
    keyed.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));

    let mut tiers: Vec<Vec<TeamId>> = Vec::new();
    let mut last: Option<f64> = None;
    for (value, team) in keyed {
        let same = last.is_some_and(|prev| prev.total_cmp(&value) == Ordering::Equal);
        last = Some(value);
        if same {
            if let Some(tier) = tiers.last_mut() {
                tier.push(team.clone());
                continue;
            }
        }
        tiers.push(vec![team.clone()]);
    }
    tiers
}

fn unchanged(group: &[TeamId]) -> Vec<Vec<TeamId>> {
    let mut tier = group.to_vec();
    tier.sort();
    vec![tier]
}

/// Combined win percentage of `opponents`, each weighted by `weight`.
fn combined_pct<'t>(
    ctx: &TiebreakContext<'_>,
    opponents: impl Iterator<Item = (&'t TeamId, u32)>,
) -> f64 {
    let (points, games) = opponents.fold((0.0, 0u64), |(points, games), (team, weight)| {
        let record = ctx.overall(team);
        (
            points + weight as f64 * record.points(),
            games + weight as u64 * record.games() as u64,
        )
    });
    if games == 0 {
        0.0
    } else {
        points / games as f64
    }
}

// ─── Rules ──────────────────────────────────────────────────────────

fn win_pct(group: &[TeamId], ctx: &TiebreakContext<'_>) -> Vec<Vec<TeamId>> {
    tiers_by(group, |t| ctx.overall(t).pct())
}

/// Decisive only when every pair in the group has met.
fn head_to_head(group: &[TeamId], ctx: &TiebreakContext<'_>) -> Vec<Vec<TeamId>> {
    let all_met = group.iter().enumerate().all(|(i, a)| {
        group[i + 1..].iter().all(|b| {
            ctx.standing(a)
                .map(|s| s.against(b).games() > 0)
                .unwrap_or(false)
        })
    });
    if !all_met {
        return unchanged(group);
    }
    tiers_by(group, |team| {
        ctx.standing(team)
            .map(|s| group.iter().filter(|o| *o != team).map(|o| s.against(o)).sum::<Record>().pct())
            .unwrap_or(0.0)
    })
}

fn division_record(group: &[TeamId], ctx: &TiebreakContext<'_>) -> Vec<Vec<TeamId>> {
    let shared: BTreeSet<(&str, &str)> = group
        .iter()
        .filter_map(|t| ctx.standing(t))
        .map(|s| (s.conference.as_str(), s.division.as_str()))
        .collect();
    if shared.len() != 1 {
        return unchanged(group);
    }
    tiers_by(group, |t| {
        ctx.standing(t).map(|s| s.division_record.pct()).unwrap_or(0.0)
    })
}

fn common_games(group: &[TeamId], ctx: &TiebreakContext<'_>) -> Vec<Vec<TeamId>> {
    let members: BTreeSet<&TeamId> = group.iter().collect();
    let mut common: Option<BTreeSet<&TeamId>> = None;
    for team in group {
        let Some(standing) = ctx.standing(team) else {
            return unchanged(group);
        };
        let faced: BTreeSet<&TeamId> = standing
            .head_to_head
            .keys()
            .filter(|o| !members.contains(o))
            .collect();
        common = Some(match common {
            None => faced,
            Some(acc) => acc.intersection(&faced).copied().collect(),
        });
    }
    let common = common.unwrap_or_default();
    if common.is_empty() {
        return unchanged(group);
    }

    let record = |team: &TeamId| -> Record {
        ctx.standing(team)
            .map(|s| common.iter().map(|o| s.against(o)).sum())
            .unwrap_or_default()
    };
    if group.iter().any(|t| record(t).games() < ctx.min_common_games) {
        return unchanged(group);
    }
    tiers_by(group, |t| record(t).pct())
}

fn conference_record(group: &[TeamId], ctx: &TiebreakContext<'_>) -> Vec<Vec<TeamId>> {
    tiers_by(group, |t| {
        ctx.standing(t).map(|s| s.conference_record.pct()).unwrap_or(0.0)
    })
}

/// Combined win percentage of beaten opponents, once per victory.
fn strength_of_victory(group: &[TeamId], ctx: &TiebreakContext<'_>) -> Vec<Vec<TeamId>> {
    tiers_by(group, |t| {
        ctx.standing(t)
            .map(|s| combined_pct(ctx, s.head_to_head.iter().map(|(o, r)| (o, r.wins))))
            .unwrap_or(0.0)
    })
}

/// Combined win percentage of every opponent, once per meeting.
fn strength_of_schedule(group: &[TeamId], ctx: &TiebreakContext<'_>) -> Vec<Vec<TeamId>> {
    tiers_by(group, |t| {
        ctx.standing(t)
            .map(|s| combined_pct(ctx, s.head_to_head.iter().map(|(o, r)| (o, r.games()))))
            .unwrap_or(0.0)
    })
}

fn conference_net_points(group: &[TeamId], ctx: &TiebreakContext<'_>) -> Vec<Vec<TeamId>> {
    tiers_by(group, |t| {
        ctx.standing(t).map(|s| s.conference_net_points()).unwrap_or(0.0)
    })
}

fn net_points(group: &[TeamId], ctx: &TiebreakContext<'_>) -> Vec<Vec<TeamId>> {
    tiers_by(group, |t| ctx.standing(t).map(|s| s.net_points()).unwrap_or(0.0))
}

/// Ascending team id, one team per tier.
fn fallback(group: &[TeamId]) -> Vec<Vec<TeamId>> {
    let mut ordered = group.to_vec();
    ordered.sort();
    ordered.into_iter().map(|t| vec![t]).collect()
}
