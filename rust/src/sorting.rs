//! Ordering rules for the greedy scheduler.
//!
//! Two orderings are involved:
//! - units: forced first, then weekend blocks, then heavier units, stable
//! - candidate teams: lower balance score, then lower current weight, then
//!   fewer current events, then lower team id

use std::cmp::{Ordering, Reverse};

use crate::models::{SchedulingUnit, TeamId, UnitKind};

/// Processing order for units, as indices into `units`.
///
/// The sort is stable, so ties keep the order the units were built in.
pub fn unit_order(units: &[SchedulingUnit]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..units.len()).collect();
    order.sort_by_key(|&i| {
        let u = &units[i];
        (
            u.forced_team.is_none(),
            u.kind != UnitKind::MpBlock,
            Reverse(u.weight),
        )
    });
    order
}

/// Ranking key of a candidate team for one unit (lower = preferred).
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateKey {
    pub score: f64,
    pub current_weight: u64,
    pub current_events: u32,
    pub team: TeamId,
}

/// Compare f64 values for sorting, treating NaN as equal.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

impl Eq for CandidateKey {}

impl Ord for CandidateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_f64(self.score, other.score)
            .then(self.current_weight.cmp(&other.current_weight))
            .then(self.current_events.cmp(&other.current_events))
            .then(self.team.cmp(&other.team))
    }
}

impl PartialOrd for CandidateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
