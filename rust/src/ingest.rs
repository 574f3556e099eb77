//! Loading and validating shift rows from tabular sources.
//!
//! A source holds named sheets of string cells. The `shift-list` sheet is
//! required; `heavy-shifts` is optional. Every content problem is collected
//! before failing, so one run reports the whole list.

use chrono::{Datelike, Duration, NaiveDate};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

use crate::calendar::{is_saturday, is_weekend};
use crate::error::{ScheduleError, Violation};
use crate::models::{HeavyKey, Period, ShiftKind, ShiftRow, TeamId, TEAM_COUNT};

pub const SHIFT_SHEET: &str = "shift-list";
pub const HEAVY_SHEET: &str = "heavy-shifts";

/// Free-text columns in front of the shift data.
pub const NOTE_COLUMNS: usize = 2;
/// Expected header of the shift data columns, starting after the notes.
pub const SHIFT_HEADER: [&str; 5] = ["date", "shift", "weight", "forced team", "excluded teams"];
pub const HEAVY_HEADER: [&str; 2] = ["date", "shift"];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A named table of string cells. Row 0 is the header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Trimmed cell content; missing cells read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map_or("", |c| c.trim())
    }

    fn is_blank_row(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .map_or(true, |r| r.iter().all(|c| c.trim().is_empty()))
    }
}

/// Validated rows and the set of heavy shifts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ingested {
    pub rows: Vec<ShiftRow>,
    pub heavy_keys: BTreeSet<HeavyKey>,
}

/// Anything that can produce validated shift rows for a period.
pub trait RowSource {
    fn load(&self, period: &Period) -> Result<Ingested, ScheduleError>;
}

/// Row source over in-memory sheets.
#[derive(Clone, Debug, Default)]
pub struct SheetSource {
    sheets: Vec<Sheet>,
}

impl SheetSource {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

impl RowSource for SheetSource {
    fn load(&self, period: &Period) -> Result<Ingested, ScheduleError> {
        let Some(shifts) = self.sheet(SHIFT_SHEET) else {
            return Err(ScheduleError::Ingestion(vec![Violation::new(
                1,
                "sheet",
                format!("sheet '{}' is missing", SHIFT_SHEET),
            )]));
        };
        if !header_matches(shifts, NOTE_COLUMNS, &SHIFT_HEADER) {
            return Err(ScheduleError::Ingestion(vec![Violation::new(
                1,
                "header",
                format!(
                    "invalid header, expected {} in columns 3..7",
                    SHIFT_HEADER.join(", ")
                ),
            )]));
        }

        let mut violations = Vec::new();
        let rows = parse_shift_rows(shifts, period, &mut violations);
        let heavy_keys = match self.sheet(HEAVY_SHEET) {
            Some(sheet) => parse_heavy_keys(sheet, period, &mut violations),
            None => BTreeSet::new(),
        };
        check_weekend_pairs(&rows, period, &mut violations);
        check_month_ends(&rows, period, &mut violations);

        if violations.is_empty() {
            Ok(Ingested { rows, heavy_keys })
        } else {
            Err(ScheduleError::Ingestion(violations))
        }
    }
}

fn header_matches(sheet: &Sheet, offset: usize, expected: &[&str]) -> bool {
    !sheet.rows.is_empty()
        && expected
            .iter()
            .enumerate()
            .all(|(i, name)| sheet.cell(0, offset + i) == *name)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    if text.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT).ok()
}

fn parse_team(text: &str) -> Result<TeamId, String> {
    let n: i64 = text
        .parse()
        .map_err(|_| format!("not a number: {}", text))?;
    u8::try_from(n)
        .ok()
        .and_then(TeamId::new)
        .ok_or_else(|| format!("out of range 1..{}: {}", TEAM_COUNT, text))
}

fn parse_shift_rows(
    sheet: &Sheet,
    period: &Period,
    violations: &mut Vec<Violation>,
) -> Vec<ShiftRow> {
    let mut rows = Vec::new();
    let mut seen: FxHashMap<HeavyKey, u32> = FxHashMap::default();

    for r in 1..sheet.rows.len() {
        let row_id = (r + 1) as u32;
        if sheet.is_blank_row(r) {
            violations.push(Violation::new(row_id, "row", "blank row"));
            continue;
        }
        let col = |i: usize| sheet.cell(r, NOTE_COLUMNS + i);

        let date = parse_date(col(0));
        match date {
            None => violations.push(Violation::new(
                row_id,
                "date",
                "invalid date format, expected YYYY-MM-DD",
            )),
            Some(date) if !period.contains(date) => {
                violations.push(Violation::new(row_id, "date", "date outside the period"))
            }
            Some(_) => {}
        }

        let kind = ShiftKind::from_code(col(1));
        if kind.is_none() {
            violations.push(Violation::new(
                row_id,
                "shift",
                "invalid value, expected MP or SN (upper case)",
            ));
        }

        let weight = match col(2).parse::<i64>() {
            Ok(w) if w > 0 => u32::try_from(w).ok(),
            _ => None,
        };
        if weight.is_none() {
            violations.push(Violation::new(
                row_id,
                "weight",
                "required, must be an integer > 0",
            ));
        }

        let mut forced_team = None;
        if !col(3).is_empty() {
            match parse_team(col(3)) {
                Ok(team) => forced_team = Some(team),
                Err(msg) => violations.push(Violation::new(row_id, "forced team", msg)),
            }
        }

        let mut excluded_teams = BTreeSet::new();
        for part in col(4).split(';').map(str::trim).filter(|p| !p.is_empty()) {
            match parse_team(part) {
                Ok(team) => {
                    excluded_teams.insert(team);
                }
                Err(msg) => violations.push(Violation::new(row_id, "excluded teams", msg)),
            }
        }
        if excluded_teams.len() == TEAM_COUNT {
            violations.push(Violation::new(
                row_id,
                "excluded teams",
                "excluding all ten teams is not allowed",
            ));
        }

        let (Some(date), Some(kind)) = (date, kind) else {
            continue;
        };
        if seen.insert((date, kind), row_id).is_some() {
            violations.push(Violation::new(row_id, "row", "duplicate date and shift"));
        }
        let Some(weight) = weight else {
            continue;
        };
        if let Some(team) = forced_team {
            if excluded_teams.contains(&team) {
                violations.push(Violation::new(
                    row_id,
                    "forced team",
                    "forced team is also excluded",
                ));
            }
        }

        rows.push(ShiftRow {
            row_id,
            notes: (0..NOTE_COLUMNS)
                .map(|c| sheet.cell(r, c).to_string())
                .collect(),
            date,
            kind,
            weight,
            forced_team,
            excluded_teams,
        });
    }
    rows
}

fn parse_heavy_keys(
    sheet: &Sheet,
    period: &Period,
    violations: &mut Vec<Violation>,
) -> BTreeSet<HeavyKey> {
    let mut keys = BTreeSet::new();
    if !header_matches(sheet, 0, &HEAVY_HEADER) {
        violations.push(Violation::new(
            1,
            "header",
            format!("invalid {} header, expected date, shift", HEAVY_SHEET),
        ));
        return keys;
    }

    for r in 1..sheet.rows.len() {
        if sheet.is_blank_row(r) {
            continue;
        }
        let row_id = (r + 1) as u32;
        let Some(date) = parse_date(sheet.cell(r, 0)) else {
            violations.push(Violation::new(
                row_id,
                "date",
                format!("invalid date format in {}", HEAVY_SHEET),
            ));
            continue;
        };
        if !period.contains(date) {
            violations.push(Violation::new(row_id, "date", "date outside the period"));
        }
        match ShiftKind::from_code(sheet.cell(r, 1)) {
            Some(kind) => {
                keys.insert((date, kind));
            }
            None => violations.push(Violation::new(
                row_id,
                "shift",
                "invalid value, expected MP or SN",
            )),
        }
    }
    keys
}

/// A Saturday MP row needs its Sunday MP row and vice versa, when both days
/// are in the period.
fn check_weekend_pairs(rows: &[ShiftRow], period: &Period, violations: &mut Vec<Violation>) {
    let mp_rows: FxHashMap<NaiveDate, &ShiftRow> = rows
        .iter()
        .filter(|r| r.kind == ShiftKind::Mp)
        .map(|r| (r.date, r))
        .collect();

    for saturday in period.days().filter(|d| is_saturday(*d)) {
        let Some(sunday) = saturday.checked_add_signed(Duration::days(1)) else {
            continue;
        };
        if !period.contains(sunday) {
            continue;
        }
        let (present, missing) = match (mp_rows.get(&saturday), mp_rows.get(&sunday)) {
            (Some(row), None) => (*row, sunday),
            (None, Some(row)) => (*row, saturday),
            _ => continue,
        };
        violations.push(Violation::new(
            present.row_id,
            "shift",
            format!(
                "incomplete weekend MP pair: MP on {} but not on {}",
                present.date, missing
            ),
        ));
    }
}

/// Every in-period 31st needs an SN row; an MP row there is only allowed on
/// a weekend.
fn check_month_ends(rows: &[ShiftRow], period: &Period, violations: &mut Vec<Violation>) {
    for day in period.days().filter(|d| d.day() == 31) {
        let on_day: Vec<&ShiftRow> = rows.iter().filter(|r| r.date == day).collect();
        if !on_day.iter().any(|r| r.kind == ShiftKind::Sn) {
            violations.push(Violation::new(
                0,
                "date",
                format!("{} must carry an SN shift", day),
            ));
        }
        if !is_weekend(day) {
            for row in on_day.iter().filter(|r| r.kind == ShiftKind::Mp) {
                violations.push(Violation::new(
                    row.row_id,
                    "shift",
                    format!("{} is a weekday and cannot carry an MP shift", day),
                ));
            }
        }
    }
}
