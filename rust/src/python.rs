//! Python request layer.

use chrono::NaiveDate;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::{BTreeSet, HashMap};

// Note: std HashMap at the PyO3 boundary, FxHashMap inside the crate

use crate::config::{SchedulingConfig, Strategy};
use crate::error::{ScheduleError, Violation};
use crate::ingest::{Sheet, SheetSource};
use crate::models::{HeavyKey, Period, ScheduleOutput, ShiftKind, ShiftRow, TeamId};
use crate::report::build_report;

/// A shift row as passed from Python.
#[pyclass(name = "ShiftRow")]
#[derive(Clone, Debug)]
pub struct PyShiftRow {
    #[pyo3(get, set)]
    pub row_id: u32,
    #[pyo3(get, set)]
    pub date: NaiveDate,
    #[pyo3(get, set)]
    pub shift: String,
    #[pyo3(get, set)]
    pub weight: u32,
    #[pyo3(get, set)]
    pub forced_team: Option<u8>,
    #[pyo3(get, set)]
    pub excluded_teams: Vec<u8>,
    #[pyo3(get, set)]
    pub heavy: bool,
}

#[pymethods]
impl PyShiftRow {
    #[new]
    #[pyo3(signature = (row_id, date, shift, weight, forced_team=None, excluded_teams=Vec::new(), heavy=false))]
    fn new(
        row_id: u32,
        date: NaiveDate,
        shift: String,
        weight: u32,
        forced_team: Option<u8>,
        excluded_teams: Vec<u8>,
        heavy: bool,
    ) -> Self {
        Self {
            row_id,
            date,
            shift,
            weight,
            forced_team,
            excluded_teams,
            heavy,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "ShiftRow(row_id={}, date={}, shift={:?}, weight={}, forced_team={:?})",
            self.row_id, self.date, self.shift, self.weight, self.forced_team
        )
    }
}

impl PyShiftRow {
    fn to_row(&self, violations: &mut Vec<Violation>) -> Option<ShiftRow> {
        let team = |id: u8, field: &str, violations: &mut Vec<Violation>| {
            let team = TeamId::new(id);
            if team.is_none() {
                violations.push(Violation::new(
                    self.row_id,
                    field,
                    format!("team out of range: {}", id),
                ));
            }
            team
        };

        let kind = ShiftKind::from_code(&self.shift);
        if kind.is_none() {
            violations.push(Violation::new(
                self.row_id,
                "shift",
                "invalid value, expected MP or SN (upper case)",
            ));
        }
        if self.weight == 0 {
            violations.push(Violation::new(self.row_id, "weight", "must be > 0"));
        }
        let forced = self
            .forced_team
            .and_then(|id| team(id, "forced team", violations));
        let mut excluded = BTreeSet::new();
        for &id in &self.excluded_teams {
            excluded.extend(team(id, "excluded teams", violations));
        }
        if forced.is_some_and(|t| excluded.contains(&t)) {
            violations.push(Violation::new(
                self.row_id,
                "forced team",
                "forced team is also excluded",
            ));
        }

        let mut row = ShiftRow::new(self.row_id, self.date, kind?, self.weight);
        row.forced_team = forced;
        row.excluded_teams = excluded;
        Some(row)
    }
}

/// Outcome of a successful request.
#[pyclass]
#[derive(Clone, Debug)]
pub struct ScheduleResult {
    /// (date, shift, team) entries ordered by date, MP before SN.
    #[pyo3(get)]
    pub assignment: Vec<(NaiveDate, String, u8)>,
    /// Team id -> 12 monthly weight sums.
    #[pyo3(get)]
    pub monthly_weight: HashMap<u8, Vec<u64>>,
    /// Team id -> 12 monthly event counts.
    #[pyo3(get)]
    pub monthly_events: HashMap<u8, Vec<u32>>,
    /// Report tables by sheet name, in output order.
    #[pyo3(get)]
    pub report: Vec<(String, Vec<Vec<String>>)>,
}

#[pymethods]
impl ScheduleResult {
    fn __repr__(&self) -> String {
        format!("ScheduleResult(assignment={} entries)", self.assignment.len())
    }
}

impl ScheduleResult {
    fn new(rows: &[ShiftRow], output: &ScheduleOutput) -> Self {
        let load = &output.team_load;
        Self {
            assignment: output
                .assignment
                .iter()
                .map(|(date, kind, team)| (date, kind.code().to_string(), team.get()))
                .collect(),
            monthly_weight: TeamId::all()
                .map(|t| (t.get(), load.monthly_weight[t.index()].to_vec()))
                .collect(),
            monthly_events: TeamId::all()
                .map(|t| (t.get(), load.monthly_events[t.index()].to_vec()))
                .collect(),
            report: build_report(rows, output)
                .into_iter()
                .map(|s| (s.name, s.rows))
                .collect(),
        }
    }
}

/// Turn a scheduling error into a `ValueError` carrying every violation.
fn to_py_err(err: ScheduleError) -> PyErr {
    let mut msg = err.to_string();
    for v in err.violations() {
        msg.push_str(&format!("\nrow {} [{}]: {}", v.row, v.field, v.message));
    }
    PyValueError::new_err(msg)
}

fn parse_request(
    start: NaiveDate,
    end: NaiveDate,
    strategy: &str,
    config: Option<SchedulingConfig>,
) -> Result<(Period, Strategy, SchedulingConfig), ScheduleError> {
    let config = config.unwrap_or_default();
    config.validate()?;
    let strategy: Strategy = strategy.parse()?;
    let period = Period::new(start, end)?;
    Ok((period, strategy, config))
}

/// Validate and schedule the sheets of a shift workbook.
///
/// `sheets` maps sheet name to rows of string cells (header first). Raises
/// `ValueError` listing every violation if parameters, content, forced
/// assignments or the scheduling itself fail.
#[pyfunction]
#[pyo3(signature = (sheets, start, end, strategy="greedy", config=None))]
fn assign_shifts(
    sheets: HashMap<String, Vec<Vec<String>>>,
    start: NaiveDate,
    end: NaiveDate,
    strategy: &str,
    config: Option<SchedulingConfig>,
) -> PyResult<ScheduleResult> {
    let (period, strategy, config) = parse_request(start, end, strategy, config).map_err(to_py_err)?;
    let source = SheetSource::new(
        sheets
            .into_iter()
            .map(|(name, rows)| Sheet::new(name, rows))
            .collect(),
    );
    let (ingested, output) =
        crate::run_pipeline(&source, period, &config, strategy).map_err(to_py_err)?;
    Ok(ScheduleResult::new(&ingested.rows, &output))
}

/// Schedule already-validated rows.
#[pyfunction]
#[pyo3(signature = (rows, start, end, strategy="greedy", config=None))]
fn schedule_rows(
    rows: Vec<PyShiftRow>,
    start: NaiveDate,
    end: NaiveDate,
    strategy: &str,
    config: Option<SchedulingConfig>,
) -> PyResult<ScheduleResult> {
    let (period, strategy, config) = parse_request(start, end, strategy, config).map_err(to_py_err)?;

    let mut violations = Vec::new();
    let mut converted = Vec::with_capacity(rows.len());
    let mut heavy_keys: BTreeSet<HeavyKey> = BTreeSet::new();
    for py_row in &rows {
        if let Some(row) = py_row.to_row(&mut violations) {
            if py_row.heavy {
                heavy_keys.insert(row.key());
            }
            converted.push(row);
        }
    }
    if !violations.is_empty() {
        return Err(to_py_err(ScheduleError::Ingestion(violations)));
    }

    let output = crate::schedule(&converted, &heavy_keys, period, &config, strategy)
        .map_err(to_py_err)?;
    Ok(ScheduleResult::new(&converted, &output))
}

pub(crate) fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyShiftRow>()?;
    m.add_class::<ScheduleResult>()?;
    m.add_class::<SchedulingConfig>()?;
    m.add_function(wrap_pyfunction!(assign_shifts, m)?)?;
    m.add_function(wrap_pyfunction!(schedule_rows, m)?)?;
    Ok(())
}
