use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::TeamId;
use crate::error::DataIntegrityError;

/// A team, its conference/division membership and its current rating.
///
/// The rating is only ever changed by the rating engine; everything
/// downstream reads a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub conference: String,
    pub division: String,
    pub rating: f64,
}

impl Team {
    pub fn new(
        id: impl Into<TeamId>,
        conference: impl Into<String>,
        division: impl Into<String>,
        rating: f64,
    ) -> Self {
        Self {
            id: id.into(),
            conference: conference.into(),
            division: division.into(),
            rating,
        }
    }
}

/// Team ratings keyed by team. Ordered so iteration is deterministic.
pub type RatingMap = BTreeMap<TeamId, f64>;

/// League structure: which teams exist and how they group.
///
/// Teams are kept sorted by id; `index_of` gives each team a dense index
/// the simulator uses for its per-scenario accumulators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct League {
    teams: Vec<Team>,
    #[serde(skip)]
    index: HashMap<TeamId, usize>,
}

impl League {
    /// Build a league, rejecting duplicate team ids.
    pub fn new(mut teams: Vec<Team>) -> Result<Self, DataIntegrityError> {
        teams.sort_by(|a, b| a.id.cmp(&b.id));
        let mut index = HashMap::with_capacity(teams.len());
        for (i, team) in teams.iter().enumerate() {
            if index.insert(team.id.clone(), i).is_some() {
                return Err(DataIntegrityError::DuplicateTeam {
                    team: team.id.clone(),
                });
            }
        }
        Ok(Self { teams, index })
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn get(&self, id: &TeamId) -> Option<&Team> {
        self.index.get(id).map(|&i| &self.teams[i])
    }

    pub fn index_of(&self, id: &TeamId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &TeamId) -> bool {
        self.index.contains_key(id)
    }

    pub fn same_conference(&self, a: &TeamId, b: &TeamId) -> bool {
        match (self.get(a), self.get(b)) {
            (Some(a), Some(b)) => a.conference == b.conference,
            _ => false,
        }
    }

    /// Conference names in sorted order.
    pub fn conferences(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.teams.iter().map(|t| t.conference.as_str()).collect();
        set.into_iter().collect()
    }

    /// Divisions of one conference, each with its member ids (sorted).
    pub fn divisions(&self, conference: &str) -> BTreeMap<&str, Vec<TeamId>> {
        let mut divisions: BTreeMap<&str, Vec<TeamId>> = BTreeMap::new();
        for team in self.teams.iter().filter(|t| t.conference == conference) {
            divisions
                .entry(team.division.as_str())
                .or_default()
                .push(team.id.clone());
        }
        divisions
    }

    /// Ratings as carried on the team records.
    pub fn ratings(&self) -> RatingMap {
        self.teams
            .iter()
            .map(|t| (t.id.clone(), t.rating))
            .collect()
    }
}
