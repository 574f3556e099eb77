//! Single-pass greedy scheduler.

use crate::config::SchedulingConfig;
use crate::eligibility::eligible_teams;
use crate::error::{ScheduleError, UnitFailure};
use crate::models::{
    Assignment, ScheduleOutput, SchedulingUnit, ShiftKind, TeamId, UnitKind, UnitOutcome,
};
use crate::sorting::unit_order;
use crate::{log_changes, log_checks, log_debug};

use super::scoring::rank_candidates;
use super::state::SchedulerState;
use super::Scheduler;

const SAME_DAY_CONFLICT: &str = "every eligible team already covers the other shift on the same day";

/// Deterministic heuristic: units are visited once, in priority order, and
/// each takes the candidate whose assignment best balances the totals.
#[derive(Clone, Debug, Default)]
pub struct GreedyScheduler {
    config: SchedulingConfig,
}

impl GreedyScheduler {
    pub fn new(config: SchedulingConfig) -> Self {
        Self { config }
    }

    /// Decide one unit against the current state, committing on success.
    fn place(&self, unit: &SchedulingUnit, state: &mut SchedulerState) -> UnitOutcome {
        let verbosity = self.config.verbosity;
        let eligibility = eligible_teams(unit, state, self.config.proximity_window);
        log_checks!(
            verbosity,
            "  Unit {} (weight={}, heavy={}): candidates {:?}",
            unit.id,
            unit.weight,
            unit.heavy,
            eligibility.candidates
        );

        if eligibility.is_empty() {
            return UnitOutcome::Unassignable(eligibility.diagnosis());
        }

        let ranked = rank_candidates(
            &eligibility.candidates,
            state,
            unit.weight,
            self.config.alpha,
        );
        for key in &ranked {
            log_debug!(
                verbosity,
                "    team {} score={:.4} weight={} events={}",
                key.team,
                key.score,
                key.current_weight,
                key.current_events
            );
        }

        let Some(team) = ranked
            .iter()
            .map(|k| k.team)
            .find(|&t| !conflicts_same_day(unit, t, &state.assignment))
        else {
            return UnitOutcome::Unassignable(SAME_DAY_CONFLICT.to_string());
        };

        state.commit(unit, team);
        log_changes!(verbosity, "  Assigned {} to team {}", unit.id, team);
        UnitOutcome::Assigned(team)
    }
}

/// Whether `team` already holds the opposite shift on any date of `unit`.
fn conflicts_same_day(unit: &SchedulingUnit, team: TeamId, assignment: &Assignment) -> bool {
    let other = match unit.kind {
        UnitKind::Mp | UnitKind::MpBlock => ShiftKind::Sn,
        UnitKind::Sn => ShiftKind::Mp,
    };
    unit.dates
        .iter()
        .any(|d| assignment.get(*d, other) == Some(team))
}

impl Scheduler for GreedyScheduler {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn schedule(&self, units: &[SchedulingUnit]) -> Result<ScheduleOutput, ScheduleError> {
        let verbosity = self.config.verbosity;
        let mut state = SchedulerState::new();
        let mut failures = Vec::new();

        log_changes!(verbosity, "Greedy: {} units", units.len());

        for index in unit_order(units) {
            let unit = &units[index];
            if let UnitOutcome::Unassignable(reason) = self.place(unit, &mut state) {
                log_changes!(verbosity, "  Unit {} unassignable: {}", unit.id, reason);
                failures.push(UnitFailure {
                    unit_id: unit.id.clone(),
                    row_ids: unit.row_ids.clone(),
                    reason,
                });
            }
        }

        if !failures.is_empty() {
            log_changes!(verbosity, "Greedy: {} unit(s) failed", failures.len());
            return Err(ScheduleError::Assignment(failures));
        }

        Ok(ScheduleOutput {
            assignment: state.assignment,
            team_load: state.team_load,
            unit_teams: state.unit_teams,
        })
    }
}
