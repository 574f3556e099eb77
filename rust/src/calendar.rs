//! Fixed rotation calendar and the proximity rule.
//!
//! Each team has a regular duty day recurring every month: the day of month
//! whose value modulo 10 equals the team id (team 10 takes remainder 0), so
//! team 1 owns the 1st, 11th and 21st. The 31st belongs to no team.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::models::TeamId;

/// Team whose regular rotation day is `date`, if any.
pub fn regular_team(date: NaiveDate) -> Option<TeamId> {
    let dom = date.day();
    if dom == 31 {
        return None;
    }
    match dom % 10 {
        0 => TeamId::new(10),
        r => TeamId::new(r as u8),
    }
}

/// Check the proximity rule for `team` on `date`.
///
/// Fails when one of the team's regular days lies strictly closer than
/// `window` days to `date`. A distance exactly equal to the window is fine,
/// and a zero window never fails.
pub fn proximity_ok(team: TeamId, date: NaiveDate, window: u32) -> bool {
    let w = i64::from(window);
    for delta in -w..=w {
        let Some(day) = date.checked_add_signed(Duration::days(delta)) else {
            continue;
        };
        if regular_team(day) == Some(team) && delta.abs() < w {
            return false;
        }
    }
    true
}

/// Proximity rule applied to every date of a unit.
pub fn proximity_ok_all(team: TeamId, dates: &[NaiveDate], window: u32) -> bool {
    dates.iter().all(|d| proximity_ok(team, *d, window))
}

pub fn is_saturday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sat
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn team(id: u8) -> TeamId {
        TeamId::new(id).unwrap()
    }

    #[test]
    fn test_regular_team_mapping() {
        assert_eq!(regular_team(d(2024, 1, 1)), Some(team(1)));
        assert_eq!(regular_team(d(2024, 1, 21)), Some(team(1)));
        assert_eq!(regular_team(d(2024, 1, 10)), Some(team(10)));
        assert_eq!(regular_team(d(2024, 1, 30)), Some(team(10)));
        assert_eq!(regular_team(d(2024, 1, 31)), None);
    }

    #[test]
    fn test_proximity_window_boundaries() {
        // 2024-01-06 with window 3: days 3..=9 are inspected.
        let date = d(2024, 1, 6);
        assert!(!proximity_ok(team(6), date, 3));
        assert!(!proximity_ok(team(4), date, 3));
        assert!(!proximity_ok(team(8), date, 3));
        // Distance exactly 3 is permitted.
        assert!(proximity_ok(team(3), date, 3));
        assert!(proximity_ok(team(9), date, 3));
        assert!(proximity_ok(team(1), date, 3));
    }

    #[test]
    fn test_zero_window_never_blocks() {
        for t in TeamId::all() {
            assert!(proximity_ok(t, d(2024, 1, 6), 0));
        }
    }

    #[test]
    fn test_day_31_is_not_a_regular_day() {
        // From 2024-01-30 with window 2 the 31st would be 1 day away if it counted,
        // while 2024-02-01 sits exactly on the window.
        assert!(proximity_ok(team(1), d(2024, 1, 30), 2));
        // From 2024-01-31 itself, team 1's nearest days are Jan 21 and Feb 1.
        assert!(!proximity_ok(team(1), d(2024, 1, 31), 2));
        assert!(proximity_ok(team(1), d(2024, 1, 29), 3));
    }

    #[test]
    fn test_proximity_crosses_month_boundary() {
        // Feb 2024 has 29 days: from Mar 1, Feb 29 (team 9) is 1 day back.
        assert!(!proximity_ok(team(9), d(2024, 3, 1), 2));
        assert!(proximity_ok_all(team(7), &[d(2024, 1, 13), d(2024, 1, 14)], 2));
        assert!(!proximity_ok_all(team(4), &[d(2024, 1, 13), d(2024, 1, 14)], 2));
    }
}
