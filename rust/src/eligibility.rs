//! Eligibility rules shared by the greedy and exact schedulers.
//!
//! Filters are applied in a fixed order and each rejected team records the
//! first rule that removed it, so an empty candidate set can be explained.

use std::fmt::Write as _;

use crate::calendar::proximity_ok_all;
use crate::models::{SchedulingUnit, TeamId};
use crate::scheduler::SchedulerState;

/// Why a team cannot take a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// The unit is forced to another team.
    ForcedElsewhere(TeamId),
    Excluded,
    Proximity,
    /// The team already has an event in the unit's month.
    MonthlyCap,
    /// The unit is heavy and the team already has a heavy event this year.
    HeavyCap,
}

/// Candidate teams for one unit plus the reason every other team was dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Eligibility {
    /// Remaining teams in ascending id order.
    pub candidates: Vec<TeamId>,
    pub rejected: Vec<(TeamId, Rejection)>,
}

impl Eligibility {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn teams_for(&self, wanted: fn(&Rejection) -> bool) -> Vec<TeamId> {
        self.rejected
            .iter()
            .filter(|(_, r)| wanted(r))
            .map(|(t, _)| *t)
            .collect()
    }

    /// Human-readable breakdown of every rejected team.
    pub fn diagnosis(&self) -> String {
        let mut msg = String::from("no eligible team");
        let forced = self.rejected.iter().find_map(|(_, r)| match r {
            Rejection::ForcedElsewhere(team) => Some(*team),
            _ => None,
        });
        if let Some(team) = forced {
            let _ = write!(msg, "; forced to team {}", team);
        }
        let groups: [(&str, fn(&Rejection) -> bool); 4] = [
            ("excluded", |r| matches!(r, Rejection::Excluded)),
            ("proximity", |r| matches!(r, Rejection::Proximity)),
            ("monthly limit", |r| matches!(r, Rejection::MonthlyCap)),
            ("heavy limit", |r| matches!(r, Rejection::HeavyCap)),
        ];
        for (label, wanted) in groups {
            let teams = self.teams_for(wanted);
            if !teams.is_empty() {
                let _ = write!(msg, "; {}: {}", label, join_teams(&teams));
            }
        }
        msg
    }
}

fn join_teams(teams: &[TeamId]) -> String {
    teams
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Rules that depend only on the unit, never on assignments made so far.
pub fn static_rejection(unit: &SchedulingUnit, team: TeamId, window: u32) -> Option<Rejection> {
    if let Some(forced) = unit.forced_team {
        if forced != team {
            return Some(Rejection::ForcedElsewhere(forced));
        }
    }
    if unit.excluded_teams.contains(&team) {
        return Some(Rejection::Excluded);
    }
    if !proximity_ok_all(team, &unit.dates, window) {
        return Some(Rejection::Proximity);
    }
    None
}

/// Compute the eligible teams for `unit` given the load accumulated so far.
pub fn eligible_teams(unit: &SchedulingUnit, state: &SchedulerState, window: u32) -> Eligibility {
    let mut result = Eligibility::default();
    for team in TeamId::all() {
        let rejection = static_rejection(unit, team, window).or_else(|| {
            if state.events_in_month(team, unit.year, unit.month) >= 1 {
                Some(Rejection::MonthlyCap)
            } else if unit.heavy && state.heavy_in_year(team, unit.year) >= 1 {
                Some(Rejection::HeavyCap)
            } else {
                None
            }
        });
        match rejection {
            Some(r) => result.rejected.push((team, r)),
            None => result.candidates.push(team),
        }
    }
    result
}
