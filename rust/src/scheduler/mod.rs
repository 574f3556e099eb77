//! Team assignment strategies.
//!
//! Both strategies take the units produced by [`crate::units::build_units`]
//! and honour the same hard rules; they differ in how the balance objective
//! is pursued:
//! - [`GreedyScheduler`] decides each unit once, in priority order
//! - [`ExactScheduler`] solves a binary integer program over all units

mod exact;
mod greedy;
mod scoring;
mod state;

pub use exact::{check_forced_conflicts, ExactScheduler};
pub use greedy::GreedyScheduler;
pub use scoring::{balance_score, rank_candidates};
pub use state::SchedulerState;

use crate::config::{SchedulingConfig, Strategy};
use crate::error::ScheduleError;
use crate::models::{ScheduleOutput, SchedulingUnit};

/// A strategy turning scheduling units into a full assignment.
pub trait Scheduler {
    fn name(&self) -> &'static str;

    /// Assign every unit or report why not.
    ///
    /// Fails with [`ScheduleError::Assignment`] listing every unit that could
    /// not be placed, never just the first one.
    fn schedule(&self, units: &[SchedulingUnit]) -> Result<ScheduleOutput, ScheduleError>;
}

/// Build the scheduler for `strategy`.
pub fn scheduler_for(strategy: Strategy, config: SchedulingConfig) -> Box<dyn Scheduler> {
    match strategy {
        Strategy::Greedy => Box::new(GreedyScheduler::new(config)),
        Strategy::Exact => Box::new(ExactScheduler::new(config)),
    }
}
