//! Grouping of shift rows into scheduling units.
//!
//! Saturday and Sunday MP rows inside the period are merged into one
//! `MP_BLOCK` unit so both days go to the same team. Every other row becomes
//! a unit on its own.

use chrono::{Datelike, Duration};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

use crate::calendar::is_saturday;
use crate::error::{ScheduleError, Violation};
use crate::models::{HeavyKey, Period, SchedulingUnit, ShiftKind, ShiftRow, UnitKind};

const FORCED_FIELD: &str = "forced team";

/// Build the scheduling units for one run.
///
/// Blocks come first, in the order of their Saturday rows, followed by the
/// remaining rows in input order. Forced-team contradictions are collected
/// over all rows; if any is found no units are returned.
///
/// A force given on only one day of a weekend block applies to the whole
/// block. The input rows are never modified.
pub fn build_units(
    rows: &[ShiftRow],
    heavy_keys: &BTreeSet<HeavyKey>,
    period: &Period,
) -> Result<Vec<SchedulingUnit>, ScheduleError> {
    let by_key: FxHashMap<HeavyKey, &ShiftRow> = rows.iter().map(|r| (r.key(), r)).collect();

    let mut violations = Vec::new();
    let mut units = Vec::with_capacity(rows.len());
    let mut used: FxHashSet<HeavyKey> = FxHashSet::default();

    for sat in rows {
        if sat.kind != ShiftKind::Mp || !is_saturday(sat.date) {
            continue;
        }
        let Some(sunday) = sat.date.checked_add_signed(Duration::days(1)) else {
            continue;
        };
        if !period.contains(sunday) {
            continue;
        }
        let Some(sun) = by_key.get(&(sunday, ShiftKind::Mp)).copied() else {
            continue;
        };
        if used.contains(&sat.key()) || used.contains(&sun.key()) {
            continue;
        }

        let forced = match (sat.forced_team, sun.forced_team) {
            (Some(a), Some(b)) if a != b => {
                violations.push(Violation::new(
                    sat.row_id,
                    FORCED_FIELD,
                    format!(
                        "weekend MP block {}..{} forced to different teams ({} and {})",
                        sat.date, sun.date, a, b
                    ),
                ));
                None
            }
            (a, b) => a.or(b),
        };

        let excluded: BTreeSet<_> = sat
            .excluded_teams
            .union(&sun.excluded_teams)
            .copied()
            .collect();
        if let Some(team) = forced {
            if excluded.contains(&team) {
                violations.push(Violation::new(
                    sat.row_id,
                    FORCED_FIELD,
                    format!(
                        "weekend MP block {}..{} forced to team {} which is excluded",
                        sat.date, sun.date, team
                    ),
                ));
            }
        }

        units.push(SchedulingUnit {
            id: format!("{}..{}|{}", sat.date, sun.date, UnitKind::MpBlock.code()),
            kind: UnitKind::MpBlock,
            row_ids: vec![sat.row_id, sun.row_id],
            dates: vec![sat.date, sun.date],
            weight: u64::from(sat.weight) + u64::from(sun.weight),
            year: sat.date.year(),
            month: sat.date.month(),
            heavy: sat.is_heavy(heavy_keys) || sun.is_heavy(heavy_keys),
            forced_team: forced,
            excluded_teams: excluded,
        });
        used.insert(sat.key());
        used.insert(sun.key());
    }

    for row in rows {
        if used.contains(&row.key()) {
            continue;
        }
        if let Some(team) = row.forced_team {
            if row.excluded_teams.contains(&team) {
                violations.push(Violation::new(
                    row.row_id,
                    FORCED_FIELD,
                    format!("{} {} forced to team {} which is excluded", row.date, row.kind, team),
                ));
            }
        }
        units.push(SchedulingUnit::singleton(row, row.is_heavy(heavy_keys)));
    }

    if !violations.is_empty() {
        return Err(ScheduleError::Model(violations));
    }
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TeamId;
    use chrono::NaiveDate;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn team(id: u8) -> TeamId {
        TeamId::new(id).unwrap()
    }

    fn january() -> Period {
        Period::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap()
    }

    #[test]
    fn test_weekend_mp_pair_becomes_block() {
        // 2024-01-06 is a Saturday.
        let rows = vec![
            ShiftRow::new(2, d(2024, 1, 6), ShiftKind::Mp, 3),
            ShiftRow::new(3, d(2024, 1, 6), ShiftKind::Sn, 2),
            ShiftRow::new(4, d(2024, 1, 7), ShiftKind::Mp, 4),
        ];
        let heavy = BTreeSet::from([(d(2024, 1, 7), ShiftKind::Mp)]);

        let units = build_units(&rows, &heavy, &january()).unwrap();
        assert_eq!(units.len(), 2);

        let block = &units[0];
        assert_eq!(block.kind, UnitKind::MpBlock);
        assert_eq!(block.id, "2024-01-06..2024-01-07|MP_BLOCK");
        assert_eq!(block.weight, 7);
        assert_eq!(block.row_ids, vec![2, 4]);
        assert!(block.heavy);

        assert_eq!(units[1].kind, UnitKind::Sn);
        assert_eq!(units[1].id, "2024-01-06|SN");
        assert!(!units[1].heavy);
    }

    #[test]
    fn test_sunday_outside_period_stays_single() {
        let period = Period::new(d(2024, 1, 1), d(2024, 1, 6)).unwrap();
        let rows = vec![ShiftRow::new(2, d(2024, 1, 6), ShiftKind::Mp, 3)];

        let units = build_units(&rows, &BTreeSet::new(), &period).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].kind, UnitKind::Mp);
    }

    #[test]
    fn test_one_sided_force_applies_to_block_only() {
        let rows = vec![
            ShiftRow::new(2, d(2024, 1, 13), ShiftKind::Mp, 1),
            ShiftRow::new(3, d(2024, 1, 14), ShiftKind::Mp, 1).with_forced(team(5)),
        ];
        let units = build_units(&rows, &BTreeSet::new(), &january()).unwrap();

        assert_eq!(units[0].forced_team, Some(team(5)));
        assert_eq!(rows[0].forced_team, None);
    }

    #[test]
    fn test_block_exclusions_are_unioned() {
        let rows = vec![
            ShiftRow::new(2, d(2024, 1, 13), ShiftKind::Mp, 1).with_excluded([team(1)]),
            ShiftRow::new(3, d(2024, 1, 14), ShiftKind::Mp, 1).with_excluded([team(2), team(3)]),
        ];
        let units = build_units(&rows, &BTreeSet::new(), &january()).unwrap();
        assert_eq!(
            units[0].excluded_teams,
            BTreeSet::from([team(1), team(2), team(3)])
        );
    }

    #[test]
    fn test_contradictions_fail_atomically() {
        let rows = vec![
            ShiftRow::new(2, d(2024, 1, 13), ShiftKind::Mp, 1).with_forced(team(1)),
            ShiftRow::new(3, d(2024, 1, 14), ShiftKind::Mp, 1).with_forced(team(2)),
            ShiftRow::new(4, d(2024, 1, 20), ShiftKind::Mp, 1).with_forced(team(4)),
            ShiftRow::new(5, d(2024, 1, 21), ShiftKind::Mp, 1).with_excluded([team(4)]),
            ShiftRow::new(6, d(2024, 1, 24), ShiftKind::Sn, 1)
                .with_forced(team(7))
                .with_excluded([team(7)]),
        ];

        match build_units(&rows, &BTreeSet::new(), &january()) {
            Err(ScheduleError::Model(violations)) => {
                let rows: Vec<u32> = violations.iter().map(|v| v.row).collect();
                assert_eq!(rows, vec![2, 4, 6]);
            }
            other => panic!("expected model error, got {other:?}"),
        }
    }

    #[test]
    fn test_unit_ids_are_deterministic() {
        let rows = vec![
            ShiftRow::new(2, d(2024, 1, 2), ShiftKind::Sn, 1),
            ShiftRow::new(3, d(2024, 1, 3), ShiftKind::Mp, 1),
        ];
        let first = build_units(&rows, &BTreeSet::new(), &january()).unwrap();
        let second = build_units(&rows, &BTreeSet::new(), &january()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[1].id, "2024-01-03|MP");
    }
}
