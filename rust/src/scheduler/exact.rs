//! Exact scheduler: a binary integer program solved with `good_lp` and HiGHS.
//!
//! Variables `x[u][t]` say whether unit `u` goes to team `t`. Hard rules
//! become linear constraints, and the objective minimises a weighted sum of
//! the largest per-team weight (`L`) and the largest per-team event count
//! (`Emax`) through epigraph variables.
//!
//! The solver enforces the configured time limit itself. When the limit is
//! reached, the best feasible assignment found so far is kept; only a run
//! with no feasible assignment in time fails with `SolverError::TimeLimit`.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use good_lp::solvers::{SolutionStatus, WithTimeLimit};
use good_lp::{
    constraint, highs, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};

use crate::config::SchedulingConfig;
use crate::eligibility::static_rejection;
use crate::error::{ScheduleError, SolverError, UnitFailure, Violation};
use crate::models::{ScheduleOutput, SchedulingUnit, TeamId, UnitKind, TEAM_COUNT};
use crate::{log_changes, log_debug};

use super::state::SchedulerState;
use super::Scheduler;

/// Keeps objective coefficients away from solver tolerances.
const OBJECTIVE_SCALE: f64 = 1e6;

/// Globally optimal assignment under the same rules as the greedy scheduler.
#[derive(Clone, Debug, Default)]
pub struct ExactScheduler {
    config: SchedulingConfig,
}

impl ExactScheduler {
    pub fn new(config: SchedulingConfig) -> Self {
        Self { config }
    }
}

/// Reject forced assignments that break the monthly or yearly-heavy caps
/// on their own, before any model is built.
pub fn check_forced_conflicts(units: &[SchedulingUnit]) -> Result<(), ScheduleError> {
    let mut by_month: BTreeMap<(TeamId, i32, u32), Vec<&SchedulingUnit>> = BTreeMap::new();
    let mut heavy_by_year: BTreeMap<(TeamId, i32), Vec<&SchedulingUnit>> = BTreeMap::new();
    for unit in units {
        let Some(team) = unit.forced_team else {
            continue;
        };
        by_month
            .entry((team, unit.year, unit.month))
            .or_default()
            .push(unit);
        if unit.heavy {
            heavy_by_year.entry((team, unit.year)).or_default().push(unit);
        }
    }

    let mut violations = Vec::new();
    for ((team, year, month), group) in &by_month {
        if group.len() > 1 {
            violations.push(group_violation(
                group,
                format!(
                    "team {} forced more than once in {}-{:02}",
                    team, year, month
                ),
            ));
        }
    }
    for ((team, year), group) in &heavy_by_year {
        if group.len() > 1 {
            violations.push(group_violation(
                group,
                format!("team {} forced on more than one heavy shift in {}", team, year),
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ScheduleError::Model(violations))
    }
}

fn group_violation(group: &[&SchedulingUnit], what: String) -> Violation {
    let ids: Vec<&str> = group.iter().map(|u| u.id.as_str()).collect();
    Violation::new(
        group[0].row_ids[0],
        "forced team",
        format!("{} ({})", what, ids.join(", ")),
    )
}

/// Build and solve the model, returning the team chosen for each unit.
///
/// `None` marks a unit whose decoded variables had no value above 0.5.
fn solve_model(
    units: &[SchedulingUnit],
    config: &SchedulingConfig,
) -> Result<Vec<Option<TeamId>>, SolverError> {
    let window = config.proximity_window;
    let alpha = config.alpha;
    let verbosity = config.verbosity;
    let limit = config.time_limit();

    let mut vars = ProblemVariables::new();
    let mut x: Vec<[Variable; TEAM_COUNT]> = Vec::with_capacity(units.len());
    for _ in units {
        let mut row = Vec::with_capacity(TEAM_COUNT);
        for _ in 0..TEAM_COUNT {
            row.push(vars.add(variable().binary()));
        }
        let row: [Variable; TEAM_COUNT] = row
            .try_into()
            .map_err(|_| SolverError::Backend("variable row size mismatch".to_string()))?;
        x.push(row);
    }
    let max_load = vars.add(variable().min(0.0));
    let max_events = vars.add(variable().min(0.0));

    let total_weight: u64 = units.iter().map(|u| u.weight).sum();
    let w_load = alpha / (total_weight.max(1) as f64);
    let w_events = (1.0 - alpha) / (units.len().max(1) as f64);
    let objective: Expression =
        (w_load * OBJECTIVE_SCALE) * max_load + (w_events * OBJECTIVE_SCALE) * max_events;

    let mut model = vars
        .minimise(objective)
        .using(highs)
        .with_time_limit(limit.as_secs_f64());
    let mut constraint_count = 0usize;

    for (u, unit) in units.iter().enumerate() {
        let one: Expression = x[u].iter().copied().sum();
        model.add_constraint(constraint!(one == 1.0));
        constraint_count += 1;

        // Forced, excluded and proximity-blocked teams are pinned to zero.
        for team in TeamId::all() {
            if static_rejection(unit, team, window).is_some() {
                model.add_constraint(constraint!(x[u][team.index()] == 0.0));
                constraint_count += 1;
            }
        }
        if let Some(team) = unit.forced_team {
            model.add_constraint(constraint!(x[u][team.index()] == 1.0));
            constraint_count += 1;
        }
    }

    for (mp, sn) in same_day_pairs(units) {
        for t in 0..TEAM_COUNT {
            model.add_constraint(constraint!(x[mp][t] + x[sn][t] <= 1.0));
            constraint_count += 1;
        }
    }

    let mut by_month: BTreeMap<(i32, u32), Vec<usize>> = BTreeMap::new();
    let mut heavy_by_year: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (u, unit) in units.iter().enumerate() {
        by_month.entry((unit.year, unit.month)).or_default().push(u);
        if unit.heavy {
            heavy_by_year.entry(unit.year).or_default().push(u);
        }
    }
    for group in by_month.values().chain(heavy_by_year.values()) {
        if group.len() < 2 {
            continue;
        }
        for t in 0..TEAM_COUNT {
            let count: Expression = group.iter().map(|&u| x[u][t]).sum();
            model.add_constraint(constraint!(count <= 1.0));
            constraint_count += 1;
        }
    }

    for t in 0..TEAM_COUNT {
        let load: Expression = units
            .iter()
            .enumerate()
            .map(|(u, unit)| (unit.weight as f64) * x[u][t])
            .sum();
        let events: Expression = (0..units.len()).map(|u| x[u][t]).sum();
        model.add_constraint(constraint!(max_load >= load));
        model.add_constraint(constraint!(max_events >= events));
        constraint_count += 2;
    }

    log_debug!(
        verbosity,
        "  Model: {} binaries, {} constraints",
        units.len() * TEAM_COUNT,
        constraint_count
    );

    let started = Instant::now();
    let solution = model
        .solve()
        .map_err(|e| resolution_error(e, started.elapsed(), limit))?;

    let decoded = decode(&x, |v| solution.value(v));
    if matches!(solution.status(), SolutionStatus::TimeLimit) {
        if decoded.iter().any(Option::is_none) {
            return Err(SolverError::TimeLimit(limit));
        }
        log_changes!(
            verbosity,
            "Exact: time limit {:?} reached, keeping best assignment found",
            limit
        );
    }
    Ok(decoded)
}

/// Team per unit: the variable with value above 0.5, if any.
fn decode(
    x: &[[Variable; TEAM_COUNT]],
    value: impl Fn(Variable) -> f64,
) -> Vec<Option<TeamId>> {
    x.iter()
        .map(|row| {
            (0..TEAM_COUNT)
                .find(|&t| value(row[t]) > 0.5)
                .map(TeamId::from_index)
        })
        .collect()
}

fn resolution_error(err: ResolutionError, elapsed: Duration, limit: Duration) -> SolverError {
    match err {
        ResolutionError::Infeasible => SolverError::Infeasible,
        ResolutionError::Unbounded => SolverError::Unbounded,
        _ if elapsed >= limit => SolverError::TimeLimit(limit),
        other => SolverError::Backend(other.to_string()),
    }
}

/// (MP-kind unit, SN unit) index pairs sharing a calendar date.
fn same_day_pairs(units: &[SchedulingUnit]) -> Vec<(usize, usize)> {
    let mut mp_at: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut sn_at: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for (u, unit) in units.iter().enumerate() {
        let target = match unit.kind {
            UnitKind::Mp | UnitKind::MpBlock => &mut mp_at,
            UnitKind::Sn => &mut sn_at,
        };
        for date in &unit.dates {
            target.insert(*date, u);
        }
    }
    mp_at
        .iter()
        .filter_map(|(date, &mp)| sn_at.get(date).map(|&sn| (mp, sn)))
        .collect()
}

impl Scheduler for ExactScheduler {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn schedule(&self, units: &[SchedulingUnit]) -> Result<ScheduleOutput, ScheduleError> {
        let verbosity = self.config.verbosity;
        self.config.validate()?;
        check_forced_conflicts(units)?;

        log_changes!(verbosity, "Exact: solving {} units", units.len());
        let started = Instant::now();
        let decoded = solve_model(units, &self.config);
        let elapsed = started.elapsed();
        match &decoded {
            Ok(_) => log_changes!(verbosity, "Exact: solved in {:?}", elapsed),
            Err(e) => log_changes!(verbosity, "Exact: {} after {:?}", e, elapsed),
        }
        let decoded = decoded?;

        let mut state = SchedulerState::new();
        let mut failures = Vec::new();
        for (unit, team) in units.iter().zip(decoded) {
            match team {
                Some(team) => state.commit(unit, team),
                None => failures.push(UnitFailure {
                    unit_id: unit.id.clone(),
                    row_ids: unit.row_ids.clone(),
                    reason: "solver returned no team for this unit".to_string(),
                }),
            }
        }

        if !failures.is_empty() {
            return Err(ScheduleError::Assignment(failures));
        }

        Ok(ScheduleOutput {
            assignment: state.assignment,
            team_load: state.team_load,
            unit_teams: state.unit_teams,
        })
    }
}
