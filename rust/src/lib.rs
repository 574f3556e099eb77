//! Monthly rota assignment of ten volunteer teams to holiday shifts.
//!
//! Shift rows are grouped into units (weekend MP pairs become one block),
//! filtered per team by forced assignments, exclusions, the proximity rule
//! and the monthly and yearly-heavy caps, then assigned by a greedy or an
//! exact strategy balancing weight load and event counts.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

#[cfg(feature = "python")]
use pyo3::prelude::*;
use std::collections::BTreeSet;

pub mod calendar;
mod config;
pub mod eligibility;
mod error;
pub mod ingest;
pub mod logging;
mod models;
#[cfg(feature = "python")]
mod python;
pub mod report;
pub mod scheduler;
pub mod sorting;
pub mod units;

pub use config::{SchedulingConfig, Strategy};
pub use error::{ScheduleError, SolverError, UnitFailure, Violation};
pub use ingest::{Ingested, RowSource, Sheet, SheetSource};
pub use models::{
    Assignment, HeavyKey, Period, ScheduleOutput, SchedulingUnit, ShiftKind, ShiftRow, TeamId,
    TeamLoad, UnitKind, UnitOutcome, TEAM_COUNT,
};
pub use report::{annotate_failures, build_report, DelimitedSink, ReportSink};
pub use scheduler::{scheduler_for, ExactScheduler, GreedyScheduler, Scheduler};

/// Schedule validated rows with the chosen strategy.
///
/// Parameters are checked first, then units are built and handed to the
/// scheduler. The input rows are never modified.
pub fn schedule(
    rows: &[ShiftRow],
    heavy_keys: &BTreeSet<HeavyKey>,
    period: Period,
    config: &SchedulingConfig,
    strategy: Strategy,
) -> Result<ScheduleOutput, ScheduleError> {
    config.validate()?;
    let units = units::build_units(rows, heavy_keys, &period)?;
    crate::log_changes!(
        config.verbosity,
        "Scheduling {} rows as {} units ({:?})",
        rows.len(),
        units.len(),
        strategy
    );
    scheduler_for(strategy, config.clone()).schedule(&units)
}

/// Validate parameters, load rows from `source` and schedule them.
///
/// The source is not consulted when the parameters are invalid.
pub fn run_pipeline(
    source: &impl RowSource,
    period: Period,
    config: &SchedulingConfig,
    strategy: Strategy,
) -> Result<(Ingested, ScheduleOutput), ScheduleError> {
    config.validate()?;
    let ingested = source.load(&period)?;
    crate::log_checks!(
        config.verbosity,
        "Loaded {} rows, {} heavy",
        ingested.rows.len(),
        ingested.heavy_keys.len()
    );
    let output = schedule(
        &ingested.rows,
        &ingested.heavy_keys,
        period,
        config,
        strategy,
    )?;
    Ok((ingested, output))
}

/// The rota.rust Python module.
#[cfg(feature = "python")]
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    python::register(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::cell::Cell;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    /// Counts how often it is asked for rows.
    struct CountingSource {
        calls: Cell<u32>,
        rows: Vec<ShiftRow>,
    }

    impl RowSource for CountingSource {
        fn load(&self, _period: &Period) -> Result<Ingested, ScheduleError> {
            self.calls.set(self.calls.get() + 1);
            Ok(Ingested {
                rows: self.rows.clone(),
                heavy_keys: BTreeSet::new(),
            })
        }
    }

    fn january() -> Period {
        Period::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap()
    }

    #[test]
    fn test_bad_alpha_rejected_before_loading() {
        let source = CountingSource {
            calls: Cell::new(0),
            rows: vec![],
        };
        let config = SchedulingConfig::default().with_alpha(1.5);

        match run_pipeline(&source, january(), &config, Strategy::Greedy) {
            Err(ScheduleError::Parameter(v)) => assert_eq!(v[0].field, "alpha"),
            other => panic!("expected parameter error, got {other:?}"),
        }
        assert_eq!(source.calls.get(), 0);
    }

    #[test]
    fn test_pipeline_runs_both_strategies() {
        let source = CountingSource {
            calls: Cell::new(0),
            rows: vec![
                ShiftRow::new(2, d(2024, 1, 6), ShiftKind::Mp, 2),
                ShiftRow::new(3, d(2024, 1, 7), ShiftKind::Mp, 2),
                ShiftRow::new(4, d(2024, 1, 7), ShiftKind::Sn, 1),
            ],
        };
        let config = SchedulingConfig::default();

        for strategy in [Strategy::Greedy, Strategy::Exact] {
            let (ingested, output) = run_pipeline(&source, january(), &config, strategy).unwrap();
            assert_eq!(ingested.rows.len(), 3);
            assert_eq!(output.assignment.len(), 3);
            assert_eq!(
                output.assignment.get(d(2024, 1, 6), ShiftKind::Mp),
                output.assignment.get(d(2024, 1, 7), ShiftKind::Mp)
            );
        }
        assert_eq!(source.calls.get(), 2);
    }

    #[test]
    fn test_schedule_leaves_rows_untouched() {
        // Only the Saturday carries the force; the block still goes to team 4.
        let rows = vec![
            ShiftRow::new(2, d(2024, 1, 13), ShiftKind::Mp, 2).with_forced(TeamId::new(4).unwrap()),
            ShiftRow::new(3, d(2024, 1, 14), ShiftKind::Mp, 2),
        ];
        let before = rows.clone();
        let output = schedule(
            &rows,
            &BTreeSet::new(),
            january(),
            &SchedulingConfig::default().with_window(0),
            Strategy::Greedy,
        )
        .unwrap();

        assert_eq!(rows, before);
        assert_eq!(output.assignment.get(d(2024, 1, 14), ShiftKind::Mp), TeamId::new(4));
    }
}
