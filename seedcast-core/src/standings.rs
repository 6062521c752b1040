//! Per-scenario standings accumulator.
//!
//! One `StandingsAccumulator` lives for exactly one scenario. It is indexed
//! by the league's dense team index, so recording a game is two vector
//! writes plus two map updates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{League, Outcome, ScenarioId, TeamId};

/// Win/loss/tie tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl Record {
    pub fn games(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// Win percentage with ties counted as half a win. Zero games gives 0.
    pub fn pct(&self) -> f64 {
        match self.games() {
            0 => 0.0,
            n => (self.wins as f64 + 0.5 * self.ties as f64) / n as f64,
        }
    }

    /// `wins + ties / 2`, the numerator of `pct`.
    pub fn points(&self) -> f64 {
        self.wins as f64 + 0.5 * self.ties as f64
    }

    fn tally(&mut self, result: Side) {
        match result {
            Side::Win => self.wins += 1,
            Side::Loss => self.losses += 1,
            Side::Tie => self.ties += 1,
        }
    }
}

impl std::ops::Add for Record {
    type Output = Record;

    fn add(self, rhs: Record) -> Record {
        Record {
            wins: self.wins + rhs.wins,
            losses: self.losses + rhs.losses,
            ties: self.ties + rhs.ties,
        }
    }
}

impl std::iter::Sum for Record {
    fn sum<I: Iterator<Item = Record>>(iter: I) -> Record {
        iter.fold(Record::default(), |acc, r| acc + r)
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Win,
    Loss,
    Tie,
}

impl Side {
    fn flip(self) -> Side {
        match self {
            Side::Win => Side::Loss,
            Side::Loss => Side::Win,
            Side::Tie => Side::Tie,
        }
    }
}

/// One team's final line in one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub team: TeamId,
    pub conference: String,
    pub division: String,
    pub overall: Record,
    pub division_record: Record,
    pub conference_record: Record,
    /// Record against every opponent faced, keyed by opponent.
    pub head_to_head: BTreeMap<TeamId, Record>,
    /// Sum of margins won by.
    pub points_for: f64,
    /// Sum of margins lost by.
    pub points_against: f64,
    pub conference_points_for: f64,
    pub conference_points_against: f64,
}

impl TeamStanding {
    pub fn new(team: TeamId, conference: String, division: String) -> Self {
        Self {
            team,
            conference,
            division,
            overall: Record::default(),
            division_record: Record::default(),
            conference_record: Record::default(),
            head_to_head: BTreeMap::new(),
            points_for: 0.0,
            points_against: 0.0,
            conference_points_for: 0.0,
            conference_points_against: 0.0,
        }
    }

    pub fn net_points(&self) -> f64 {
        self.points_for - self.points_against
    }

    pub fn conference_net_points(&self) -> f64 {
        self.conference_points_for - self.conference_points_against
    }

    /// Record against one opponent (empty if they never met).
    pub fn against(&self, opponent: &TeamId) -> Record {
        self.head_to_head.get(opponent).copied().unwrap_or_default()
    }

    fn record(&mut self, opponent: &TeamId, result: Side, margin: f64, division: bool, conference: bool) {
        self.overall.tally(result);
        self.head_to_head.entry(opponent.clone()).or_default().tally(result);
        if division {
            self.division_record.tally(result);
        }
        if conference {
            self.conference_record.tally(result);
        }
        let (scored, allowed) = match result {
            Side::Win => (margin, 0.0),
            Side::Loss => (0.0, margin),
            Side::Tie => (0.0, 0.0),
        };
        self.points_for += scored;
        self.points_against += allowed;
        if conference {
            self.conference_points_for += scored;
            self.conference_points_against += allowed;
        }
    }
}

/// All team lines of one finished scenario, in league (team id) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStandings {
    pub scenario: ScenarioId,
    pub teams: Vec<TeamStanding>,
}

impl ScenarioStandings {
    pub fn get(&self, team: &TeamId) -> Option<&TeamStanding> {
        self.teams.iter().find(|s| &s.team == team)
    }

    /// Total team-games credited; twice the number of games played.
    pub fn team_games(&self) -> u32 {
        self.teams.iter().map(|s| s.overall.games()).sum()
    }
}

/// Mutable standings for one scenario in progress.
#[derive(Debug, Clone)]
pub struct StandingsAccumulator {
    scenario: ScenarioId,
    teams: Vec<TeamStanding>,
}

impl StandingsAccumulator {
    pub fn new(league: &League, scenario: ScenarioId) -> Self {
        let teams = league
            .teams()
            .iter()
            .map(|t| TeamStanding::new(t.id.clone(), t.conference.clone(), t.division.clone()))
            .collect();
        Self { scenario, teams }
    }

    /// Credit one game to both participants. `home` and `away` are league
    /// indices; `margin` is the absolute score margin (ignored for ties).
    pub fn record_game(&mut self, home: usize, away: usize, outcome: Outcome, margin: f64) {
        let home_side = match outcome {
            Outcome::HomeWin => Side::Win,
            Outcome::AwayWin => Side::Loss,
            Outcome::Tie => Side::Tie,
        };
        let (division, conference) = {
            let (h, a) = (&self.teams[home], &self.teams[away]);
            let conference = h.conference == a.conference;
            (conference && h.division == a.division, conference)
        };
        let home_id = self.teams[home].team.clone();
        let away_id = self.teams[away].team.clone();
        let margin = margin.abs();
        self.teams[home].record(&away_id, home_side, margin, division, conference);
        self.teams[away].record(&home_id, home_side.flip(), margin, division, conference);
    }

    pub fn finish(self) -> ScenarioStandings {
        ScenarioStandings {
            scenario: self.scenario,
            teams: self.teams,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Team;

    fn league() -> League {
        League::new(vec![
            Team::new("A", "East", "North", 1500.0),
            Team::new("B", "East", "North", 1500.0),
            Team::new("C", "East", "South", 1500.0),
            Team::new("X", "West", "North", 1500.0),
        ])
        .unwrap()
    }

    #[test]
    fn pct_counts_ties_half() {
        let r = Record { wins: 2, losses: 1, ties: 1 };
        assert_eq!(r.pct(), 0.625);
        assert_eq!(Record::default().pct(), 0.0);
    }

    #[test]
    fn games_credit_both_sides_and_split_by_grouping() {
        let league = league();
        let mut acc = StandingsAccumulator::new(&league, ScenarioId(1));
        // A beats B (division), C ties A (conference), X beats C (cross-conference).
        acc.record_game(0, 1, Outcome::HomeWin, 7.0);
        acc.record_game(2, 0, Outcome::Tie, 0.0);
        acc.record_game(3, 2, Outcome::HomeWin, 3.0);
        let s = acc.finish();

        assert_eq!(s.team_games(), 6);
        let a = s.get(&TeamId::from("A")).unwrap();
        assert_eq!(a.overall, Record { wins: 1, losses: 0, ties: 1 });
        assert_eq!(a.division_record, Record { wins: 1, losses: 0, ties: 0 });
        assert_eq!(a.conference_record.games(), 2);
        assert_eq!(a.points_for, 7.0);
        assert_eq!(a.against(&TeamId::from("B")).wins, 1);

        let c = s.get(&TeamId::from("C")).unwrap();
        assert_eq!(c.division_record.games(), 0);
        assert_eq!(c.conference_record.games(), 1);
        assert_eq!(c.net_points(), -3.0);
        assert_eq!(c.conference_net_points(), 0.0);
    }

    #[test]
    fn same_division_name_across_conferences_is_not_divisional() {
        let league = league();
        let mut acc = StandingsAccumulator::new(&league, ScenarioId(1));
        acc.record_game(0, 3, Outcome::AwayWin, 10.0);
        let s = acc.finish();
        let x = s.get(&TeamId::from("X")).unwrap();
        assert_eq!(x.division_record.games(), 0);
        assert_eq!(x.conference_record.games(), 0);
        assert_eq!(x.points_for, 10.0);
    }
}
