//! Mutable per-run load state shared by both schedulers.

use rustc_hash::FxHashMap;

use crate::models::{Assignment, SchedulingUnit, TeamId, TeamLoad, TEAM_COUNT};

/// Everything a scheduling run accumulates while committing units.
///
/// Created empty for each run and never shared between runs.
#[derive(Clone, Debug, Default)]
pub struct SchedulerState {
    /// Resolved teams per (date, shift kind).
    pub assignment: Assignment,
    /// Monthly aggregates reported to the caller.
    pub team_load: TeamLoad,
    /// Events per (year, month), used for the one-per-month cap
    month_events: FxHashMap<(i32, u32), [u32; TEAM_COUNT]>,
    /// Running totals over the whole run
    total_weight: [u64; TEAM_COUNT],
    total_events: [u32; TEAM_COUNT],
    /// Team chosen per unit, in commit order
    pub unit_teams: Vec<(String, TeamId)>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events already assigned to `team` in the given calendar month.
    pub fn events_in_month(&self, team: TeamId, year: i32, month: u32) -> u32 {
        self.month_events
            .get(&(year, month))
            .map_or(0, |counts| counts[team.index()])
    }

    pub fn heavy_in_year(&self, team: TeamId, year: i32) -> u32 {
        self.team_load.heavy_in_year(team, year)
    }

    pub fn total_weights(&self) -> &[u64; TEAM_COUNT] {
        &self.total_weight
    }

    pub fn total_events(&self) -> &[u32; TEAM_COUNT] {
        &self.total_events
    }

    /// Record `team` for `unit` and update every tally.
    pub fn commit(&mut self, unit: &SchedulingUnit, team: TeamId) {
        let t = team.index();
        self.assignment.assign_unit(unit, team);
        self.team_load.record(unit, team);
        self.month_events
            .entry((unit.year, unit.month))
            .or_insert([0; TEAM_COUNT])[t] += 1;
        self.total_weight[t] += unit.weight;
        self.total_events[t] += 1;
        self.unit_teams.push((unit.id.clone(), team));
    }

    /// Seed running totals without touching the assignment.
    #[cfg(test)]
    pub(crate) fn seed_totals(&mut self, team: TeamId, weight: u64, events: u32) {
        self.total_weight[team.index()] = weight;
        self.total_events[team.index()] = events;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ShiftKind, ShiftRow};
    use chrono::NaiveDate;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_commit_updates_all_tallies() {
        let row = ShiftRow::new(2, d(2024, 12, 25), ShiftKind::Mp, 6);
        let unit = SchedulingUnit::singleton(&row, true);
        let team = TeamId::new(3).unwrap();

        let mut state = SchedulerState::new();
        state.commit(&unit, team);

        assert_eq!(state.events_in_month(team, 2024, 12), 1);
        assert_eq!(state.events_in_month(team, 2025, 12), 0);
        assert_eq!(state.heavy_in_year(team, 2024), 1);
        assert_eq!(state.total_weights()[2], 6);
        assert_eq!(state.total_events()[2], 1);
        assert_eq!(state.assignment.get(d(2024, 12, 25), ShiftKind::Mp), Some(team));
        assert_eq!(state.unit_teams, vec![("2024-12-25|MP".to_string(), team)]);
    }
}
