//! Core data types for the duty rota.

use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{ScheduleError, Violation};

/// Number of rotating teams.
pub const TEAM_COUNT: usize = 10;

/// Identifier of one of the ten rotating teams (1..=10).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TeamId(u8);

impl TeamId {
    /// Create a team id, returning `None` outside 1..=10.
    pub fn new(id: u8) -> Option<Self> {
        if (1..=TEAM_COUNT as u8).contains(&id) {
            Some(Self(id))
        } else {
            None
        }
    }

    /// All teams in ascending id order.
    pub fn all() -> impl Iterator<Item = TeamId> {
        (1..=TEAM_COUNT as u8).map(TeamId)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based index for per-team arrays.
    #[inline]
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        debug_assert!(index < TEAM_COUNT);
        Self(index as u8 + 1)
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shift type of a single row: MP is the day shift, SN the night shift.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShiftKind {
    Mp,
    Sn,
}

impl ShiftKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::Mp => "MP",
            Self::Sn => "SN",
        }
    }

    /// Parse the upper-case shift code used by the input sheets.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "MP" => Some(Self::Mp),
            "SN" => Some(Self::Sn),
            _ => None,
        }
    }
}

impl fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Kind of a scheduling unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Mp,
    Sn,
    /// Saturday and Sunday MP rows merged into one unit.
    MpBlock,
}

impl UnitKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::Mp => "MP",
            Self::Sn => "SN",
            Self::MpBlock => "MP_BLOCK",
        }
    }

    /// Shift kind written into the assignment for every date of the unit.
    pub fn shift_kind(self) -> ShiftKind {
        match self {
            Self::Mp | Self::MpBlock => ShiftKind::Mp,
            Self::Sn => ShiftKind::Sn,
        }
    }
}

impl From<ShiftKind> for UnitKind {
    fn from(kind: ShiftKind) -> Self {
        match kind {
            ShiftKind::Mp => Self::Mp,
            ShiftKind::Sn => Self::Sn,
        }
    }
}

/// Key of a shift flagged as heavy: (date, shift kind).
pub type HeavyKey = (NaiveDate, ShiftKind);

/// A validated shift record as produced by ingestion.
#[derive(Clone, Debug, PartialEq)]
pub struct ShiftRow {
    /// 1-based row number in the source sheet.
    pub row_id: u32,
    /// Free-text columns carried through to the report untouched.
    pub notes: Vec<String>,
    pub date: NaiveDate,
    pub kind: ShiftKind,
    pub weight: u32,
    pub forced_team: Option<TeamId>,
    pub excluded_teams: BTreeSet<TeamId>,
}

impl ShiftRow {
    pub fn new(row_id: u32, date: NaiveDate, kind: ShiftKind, weight: u32) -> Self {
        Self {
            row_id,
            notes: Vec::new(),
            date,
            kind,
            weight,
            forced_team: None,
            excluded_teams: BTreeSet::new(),
        }
    }

    pub fn with_forced(mut self, team: TeamId) -> Self {
        self.forced_team = Some(team);
        self
    }

    pub fn with_excluded(mut self, teams: impl IntoIterator<Item = TeamId>) -> Self {
        self.excluded_teams.extend(teams);
        self
    }

    pub fn key(&self) -> HeavyKey {
        (self.date, self.kind)
    }

    pub fn is_heavy(&self, heavy_keys: &BTreeSet<HeavyKey>) -> bool {
        heavy_keys.contains(&self.key())
    }
}

/// Inclusive scheduling period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    /// Create a period, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ScheduleError> {
        if start > end {
            return Err(ScheduleError::Parameter(vec![Violation::new(
                0,
                "period",
                format!("start date {} is after end date {}", start, end),
            )]));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every date of the period in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// An indivisible piece of work that receives exactly one team.
#[derive(Clone, Debug, PartialEq)]
pub struct SchedulingUnit {
    /// Deterministic id derived from the date(s) and kind.
    pub id: String,
    pub kind: UnitKind,
    /// Source row ids: one, or Saturday then Sunday for a block.
    pub row_ids: Vec<u32>,
    /// One date, or Saturday then Sunday for a block.
    pub dates: Vec<NaiveDate>,
    pub weight: u64,
    pub year: i32,
    /// Calendar month (1..=12) of the earliest date.
    pub month: u32,
    pub heavy: bool,
    pub forced_team: Option<TeamId>,
    pub excluded_teams: BTreeSet<TeamId>,
}

impl SchedulingUnit {
    /// Index of the unit's month in 12-slot arrays.
    #[inline]
    pub fn month_index(&self) -> usize {
        (self.month - 1) as usize
    }

    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub(crate) fn singleton(row: &ShiftRow, heavy: bool) -> Self {
        Self {
            id: format!("{}|{}", row.date, row.kind),
            kind: row.kind.into(),
            row_ids: vec![row.row_id],
            dates: vec![row.date],
            weight: u64::from(row.weight),
            year: row.date.year(),
            month: row.date.month(),
            heavy,
            forced_team: row.forced_team,
            excluded_teams: row.excluded_teams.clone(),
        }
    }
}

/// Resolved team per (date, shift kind).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assignment {
    teams: BTreeMap<HeavyKey, TeamId>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, date: NaiveDate, kind: ShiftKind) -> Option<TeamId> {
        self.teams.get(&(date, kind)).copied()
    }

    /// Record `team` on every date of `unit`.
    pub(crate) fn assign_unit(&mut self, unit: &SchedulingUnit, team: TeamId) {
        let kind = unit.kind.shift_kind();
        for date in &unit.dates {
            self.teams.insert((*date, kind), team);
        }
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Entries ordered by date, then MP before SN.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, ShiftKind, TeamId)> + '_ {
        self.teams.iter().map(|((date, kind), team)| (*date, *kind, *team))
    }
}

/// Per-team monthly workload aggregates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TeamLoad {
    /// Weight sums indexed `[team index][month index]`.
    pub monthly_weight: [[u64; 12]; TEAM_COUNT],
    /// Event counts indexed `[team index][month index]`.
    pub monthly_events: [[u32; 12]; TEAM_COUNT],
    /// Heavy events per year, indexed by team within each year.
    pub heavy_events: BTreeMap<i32, [u32; TEAM_COUNT]>,
}

impl TeamLoad {
    pub fn total_weight(&self, team: TeamId) -> u64 {
        self.monthly_weight[team.index()].iter().sum()
    }

    pub fn total_events(&self, team: TeamId) -> u32 {
        self.monthly_events[team.index()].iter().sum()
    }

    pub fn heavy_in_year(&self, team: TeamId, year: i32) -> u32 {
        self.heavy_events
            .get(&year)
            .map_or(0, |counts| counts[team.index()])
    }

    pub(crate) fn record(&mut self, unit: &SchedulingUnit, team: TeamId) {
        let t = team.index();
        let m = unit.month_index();
        self.monthly_weight[t][m] += unit.weight;
        self.monthly_events[t][m] += 1;
        if unit.heavy {
            self.heavy_events.entry(unit.year).or_insert([0; TEAM_COUNT])[t] += 1;
        }
    }
}

/// Explicit per-unit result of a scheduling run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnitOutcome {
    Assigned(TeamId),
    Unassignable(String),
}

impl UnitOutcome {
    pub fn team(&self) -> Option<TeamId> {
        match self {
            Self::Assigned(team) => Some(*team),
            Self::Unassignable(_) => None,
        }
    }
}

/// Result of a successful scheduling run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScheduleOutput {
    pub assignment: Assignment,
    pub team_load: TeamLoad,
    /// Team chosen for each unit, keyed by unit id, in processing order.
    pub unit_teams: Vec<(String, TeamId)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_team_id_range() {
        assert!(TeamId::new(0).is_none());
        assert!(TeamId::new(11).is_none());
        assert_eq!(TeamId::new(10).unwrap().index(), 9);
        assert_eq!(TeamId::all().count(), TEAM_COUNT);
        assert_eq!(TeamId::from_index(0), TeamId::new(1).unwrap());
    }

    #[test]
    fn test_period_rejects_inverted_range() {
        let err = Period::new(d(2024, 2, 1), d(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, ScheduleError::Parameter(_)));

        let single = Period::new(d(2024, 1, 1), d(2024, 1, 1)).unwrap();
        assert_eq!(single.days().count(), 1);
    }

    #[test]
    fn test_assignment_covers_every_block_date() {
        let sat = ShiftRow::new(2, d(2024, 1, 6), ShiftKind::Mp, 3);
        let mut unit = SchedulingUnit::singleton(&sat, false);
        unit.kind = UnitKind::MpBlock;
        unit.dates.push(d(2024, 1, 7));

        let team = TeamId::new(4).unwrap();
        let mut assignment = Assignment::new();
        assignment.assign_unit(&unit, team);

        assert_eq!(assignment.get(d(2024, 1, 6), ShiftKind::Mp), Some(team));
        assert_eq!(assignment.get(d(2024, 1, 7), ShiftKind::Mp), Some(team));
        assert_eq!(assignment.get(d(2024, 1, 7), ShiftKind::Sn), None);
    }

    #[test]
    fn test_team_load_totals() {
        let row = ShiftRow::new(2, d(2024, 3, 5), ShiftKind::Sn, 7);
        let unit = SchedulingUnit::singleton(&row, true);
        let team = TeamId::new(2).unwrap();

        let mut load = TeamLoad::default();
        load.record(&unit, team);

        assert_eq!(load.total_weight(team), 7);
        assert_eq!(load.total_events(team), 1);
        assert_eq!(load.monthly_weight[1][2], 7);
        assert_eq!(load.heavy_in_year(team, 2024), 1);
        assert_eq!(load.heavy_in_year(team, 2025), 0);
    }
}
