//! Error taxonomy for the scheduling pipeline.

use std::time::Duration;
use thiserror::Error;

/// A single reported problem, addressed by source row and field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// 1-based sheet row, or 0 when the problem is not tied to a row.
    pub row: u32,
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(row: u32, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A unit that could not be given a team.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitFailure {
    pub unit_id: String,
    /// Every source row of the unit; all of them carry `reason` in reports.
    pub row_ids: Vec<u32>,
    pub reason: String,
}

impl UnitFailure {
    pub fn to_violation(&self) -> Violation {
        Violation::new(
            self.row_ids.first().copied().unwrap_or(0),
            "assignment",
            format!("{}: {}", self.unit_id, self.reason),
        )
    }
}

/// Failures of the integer-programming backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("no assignment satisfies every constraint")]
    Infeasible,
    #[error("model is unbounded")]
    Unbounded,
    #[error("no feasible solution found within {0:?}")]
    TimeLimit(Duration),
    #[error("solver backend failed: {0}")]
    Backend(String),
}

/// Errors that can occur while validating, ingesting or scheduling.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("invalid parameters: {}", join_messages(.0))]
    Parameter(Vec<Violation>),
    #[error("input rejected with {} violation(s)", .0.len())]
    Ingestion(Vec<Violation>),
    #[error("inconsistent forced assignments: {}", join_messages(.0))]
    Model(Vec<Violation>),
    #[error("{} unit(s) could not be assigned", .0.len())]
    Assignment(Vec<UnitFailure>),
    #[error("solver failed: {0}")]
    Solver(#[from] SolverError),
    #[error("failed to write report: {0}")]
    Output(String),
}

impl ScheduleError {
    /// Flatten any variant into the (row, field, message) list.
    pub fn violations(&self) -> Vec<Violation> {
        match self {
            Self::Parameter(v) | Self::Ingestion(v) | Self::Model(v) => v.clone(),
            Self::Assignment(failures) => failures.iter().map(UnitFailure::to_violation).collect(),
            Self::Solver(err) => vec![Violation::new(0, "assignment", err.to_string())],
            Self::Output(msg) => vec![Violation::new(0, "output", msg.clone())],
        }
    }
}

fn join_messages(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
