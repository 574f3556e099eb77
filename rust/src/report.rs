//! Report tables built from a scheduling run.
//!
//! Rows are annotated here, at the output boundary, from the run's result;
//! the caller's input rows are never modified.

use rustc_hash::FxHashMap;
use std::io::Write;

use crate::error::{ScheduleError, UnitFailure};
use crate::ingest::{Sheet, NOTE_COLUMNS, SHIFT_HEADER, SHIFT_SHEET};
use crate::models::{Assignment, ScheduleOutput, ShiftRow, TeamId, TeamLoad};

pub const WEIGHT_SHEET: &str = "weight-summary";
pub const EVENT_SHEET: &str = "event-summary";

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Row sheet plus weight and event summaries for a successful run.
pub fn build_report(rows: &[ShiftRow], output: &ScheduleOutput) -> Vec<Sheet> {
    vec![
        row_sheet(rows, Some(&output.assignment), &FxHashMap::default()),
        summary_sheet(WEIGHT_SHEET, &output.team_load, |load, t| {
            load.monthly_weight[t.index()]
        }),
        summary_sheet(EVENT_SHEET, &output.team_load, |load, t| {
            load.monthly_events[t.index()].map(u64::from)
        }),
    ]
}

/// Row sheet for a failed run, with each failure written next to every row
/// of its unit.
pub fn annotate_failures(rows: &[ShiftRow], failures: &[UnitFailure]) -> Sheet {
    let mut notes: FxHashMap<u32, String> = FxHashMap::default();
    for failure in failures {
        for row_id in &failure.row_ids {
            let note = notes.entry(*row_id).or_default();
            if !note.is_empty() {
                note.push_str("; ");
            }
            note.push_str(&failure.reason);
        }
    }
    row_sheet(rows, None, &notes)
}

fn row_sheet(
    rows: &[ShiftRow],
    assignment: Option<&Assignment>,
    notes: &FxHashMap<u32, String>,
) -> Sheet {
    let mut header = vec![String::new(); NOTE_COLUMNS];
    header.extend(SHIFT_HEADER.iter().map(|h| h.to_string()));
    header.push("assigned team".to_string());
    header.push("notes / errors".to_string());

    let mut table = Vec::with_capacity(rows.len() + 1);
    table.push(header);
    for row in rows {
        let mut cells: Vec<String> = (0..NOTE_COLUMNS)
            .map(|i| row.notes.get(i).cloned().unwrap_or_default())
            .collect();
        cells.push(row.date.to_string());
        cells.push(row.kind.code().to_string());
        cells.push(row.weight.to_string());
        cells.push(row.forced_team.map(|t| t.to_string()).unwrap_or_default());
        cells.push(join_teams(row.excluded_teams.iter()));
        cells.push(
            assignment
                .and_then(|a| a.get(row.date, row.kind))
                .map(|t| t.to_string())
                .unwrap_or_default(),
        );
        cells.push(notes.get(&row.row_id).cloned().unwrap_or_default());
        table.push(cells);
    }
    Sheet::new(SHIFT_SHEET, table)
}

fn summary_sheet(
    name: &str,
    load: &TeamLoad,
    monthly: impl Fn(&TeamLoad, TeamId) -> [u64; 12],
) -> Sheet {
    let mut header = vec!["team".to_string()];
    header.extend(MONTH_LABELS.iter().map(|m| m.to_string()));
    header.push("Total".to_string());

    let mut table = vec![header];
    for team in TeamId::all() {
        let months = monthly(load, team);
        let mut cells = vec![team.to_string()];
        cells.extend(months.iter().map(|v| v.to_string()));
        cells.push(months.iter().sum::<u64>().to_string());
        table.push(cells);
    }
    Sheet::new(name, table)
}

fn join_teams<'a>(teams: impl Iterator<Item = &'a TeamId>) -> String {
    teams.map(|t| t.to_string()).collect::<Vec<_>>().join(";")
}

/// Destination for report sheets.
pub trait ReportSink {
    fn write_sheet(&mut self, sheet: &Sheet) -> Result<(), ScheduleError>;

    fn write_report(&mut self, sheets: &[Sheet]) -> Result<(), ScheduleError> {
        for sheet in sheets {
            self.write_sheet(sheet)?;
        }
        Ok(())
    }
}

/// Writes sheets as `;`-separated text, each introduced by a `# name` line
/// and followed by a blank line. Cells containing the separator, quotes or
/// line breaks are quoted.
#[derive(Debug)]
pub struct DelimitedSink<W: Write> {
    out: W,
}

impl<W: Write> DelimitedSink<W> {
    pub const SEPARATOR: char = ';';

    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn quote(cell: &str) -> String {
    if cell.contains([';', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

impl<W: Write> ReportSink for DelimitedSink<W> {
    fn write_sheet(&mut self, sheet: &Sheet) -> Result<(), ScheduleError> {
        let io = |e: std::io::Error| ScheduleError::Output(e.to_string());
        writeln!(self.out, "# {}", sheet.name).map_err(io)?;
        let sep = Self::SEPARATOR.to_string();
        for row in &sheet.rows {
            let line = row.iter().map(|c| quote(c)).collect::<Vec<_>>().join(&sep);
            writeln!(self.out, "{}", line).map_err(io)?;
        }
        writeln!(self.out).map_err(io)?;
        self.out.flush().map_err(io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulingConfig;
    use crate::models::{Period, ShiftKind};
    use crate::scheduler::{GreedyScheduler, Scheduler};
    use crate::units::build_units;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn team(id: u8) -> TeamId {
        TeamId::new(id).unwrap()
    }

    fn rows() -> Vec<ShiftRow> {
        let mut first = ShiftRow::new(2, d(2024, 3, 9), ShiftKind::Mp, 3);
        first.notes = vec!["Saturday".to_string(), String::new()];
        vec![
            first,
            ShiftRow::new(3, d(2024, 3, 10), ShiftKind::Mp, 3),
            ShiftRow::new(4, d(2024, 4, 3), ShiftKind::Sn, 2)
                .with_forced(team(7))
                .with_excluded([team(1), team(2)]),
        ]
    }

    #[test]
    fn test_report_rows_and_summaries() {
        let rows = rows();
        let period = Period::new(d(2024, 3, 1), d(2024, 4, 30)).unwrap();
        let units = build_units(&rows, &BTreeSet::new(), &period).unwrap();
        let output = GreedyScheduler::new(SchedulingConfig::default().with_window(0))
            .schedule(&units)
            .unwrap();

        let sheets = build_report(&rows, &output);
        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![SHIFT_SHEET, WEIGHT_SHEET, EVENT_SHEET]);

        let shifts = &sheets[0];
        assert_eq!(shifts.cell(0, 7), "assigned team");
        assert_eq!(shifts.cell(1, 0), "Saturday");
        assert_eq!(shifts.cell(1, 7), shifts.cell(2, 7));
        assert_eq!(shifts.cell(3, 5), "7");
        assert_eq!(shifts.cell(3, 6), "1;2");
        assert_eq!(shifts.cell(3, 7), "7");

        // Team 7 row: 2 weight in April, one event.
        let weights = &sheets[1];
        assert_eq!(weights.cell(7, 4), "2");
        assert_eq!(weights.cell(7, 13), "2");
        let events = &sheets[2];
        assert_eq!(events.cell(0, 13), "Total");
        assert_eq!(events.cell(7, 13), "1");
        let block_team = shifts.cell(1, 7).parse::<usize>().unwrap();
        assert_eq!(weights.cell(block_team, 3), "6");
        assert_eq!(events.cell(block_team, 3), "1");
    }

    #[test]
    fn test_failures_annotate_every_block_row() {
        let rows = rows();
        let failures = vec![UnitFailure {
            unit_id: "2024-03-09..2024-03-10|MP_BLOCK".to_string(),
            row_ids: vec![2, 3],
            reason: "no eligible team".to_string(),
        }];

        let sheet = annotate_failures(&rows, &failures);
        assert_eq!(sheet.cell(1, 8), "no eligible team");
        assert_eq!(sheet.cell(2, 8), "no eligible team");
        assert_eq!(sheet.cell(3, 8), "");
        assert_eq!(sheet.cell(1, 7), "");
    }

    #[test]
    fn test_delimited_sink_quotes_separator() {
        let sheet = Sheet::new(
            "t",
            vec![
                vec!["a".to_string(), "1;2".to_string()],
                vec!["say \"hi\"".to_string(), String::new()],
            ],
        );
        let mut sink = DelimitedSink::new(Vec::new());
        sink.write_report(&[sheet]).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "# t\na;\"1;2\"\n\"say \"\"hi\"\"\";\n\n");
    }
}
