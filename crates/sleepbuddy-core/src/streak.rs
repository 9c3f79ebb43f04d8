//! Consecutive-success streak with inactivity decay.
//!
//! The streak is never recomputed across the whole history. Each finalized
//! session stores the streak ending at it; only the tail value is ever
//! corrected, when the user has been inactive for a full day.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Hours without a finished session after which the streak decays to zero.
pub const STALE_AFTER_HOURS: i64 = 24;

/// Streak value that unlocks the special mascot.
pub const SPECIAL_STREAK_DAYS: u32 = 30;

/// Streak ending at a new session: extended on success, reset on failure.
pub fn next_streak(last_streak: u32, goal_met: bool) -> u32 {
    if goal_met {
        last_streak.saturating_add(1)
    } else {
        0
    }
}

/// Whether the stored streak must be reset for inactivity.
///
/// Only whole hours count, so 23h59m is not yet stale.
pub fn check_staleness(last_session_end: NaiveDateTime, now: NaiveDateTime, is_tracking: bool) -> bool {
    !is_tracking && (now - last_session_end).num_hours() >= STALE_AFTER_HOURS
}

/// Outcome of reading the current streak with the staleness correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakCheck {
    /// Streak to expose.
    pub streak: u32,
    /// The stored tail record must be overwritten with zero.
    pub reset_stored: bool,
}

/// Combine the stored tail streak with the staleness rule.
pub fn effective_streak(
    last_streak: Option<u32>,
    last_session_end: Option<NaiveDateTime>,
    now: NaiveDateTime,
    is_tracking: bool,
) -> StreakCheck {
    let stored = last_streak.unwrap_or(0);
    let stale = last_session_end.is_some_and(|end| check_staleness(end, now, is_tracking));
    if stale {
        StreakCheck {
            streak: 0,
            reset_stored: stored != 0,
        }
    } else {
        StreakCheck {
            streak: stored,
            reset_stored: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn success_extends_failure_resets() {
        assert_eq!(next_streak(0, true), 1);
        assert_eq!(next_streak(6, true), 7);
        assert_eq!(next_streak(29, false), 0);
        assert_eq!(next_streak(u32::MAX, true), u32::MAX);
    }

    #[test]
    fn staleness_threshold_is_a_full_day() {
        let end = at(1, 6, 0);
        assert!(!check_staleness(end, end + Duration::minutes(23 * 60 + 59), false));
        assert!(check_staleness(end, end + Duration::hours(24), false));
    }

    #[test]
    fn tracking_suppresses_staleness() {
        let end = at(1, 6, 0);
        assert!(!check_staleness(end, end + Duration::hours(48), true));
    }

    #[test]
    fn effective_streak_forces_zero_when_stale() {
        let end = at(1, 6, 0);
        let check = effective_streak(Some(12), Some(end), end + Duration::hours(30), false);
        assert_eq!(
            check,
            StreakCheck {
                streak: 0,
                reset_stored: true
            }
        );
    }

    #[test]
    fn effective_streak_without_history_is_zero() {
        let check = effective_streak(None, None, at(1, 6, 0), false);
        assert_eq!(check.streak, 0);
        assert!(!check.reset_stored);
    }

    #[test]
    fn already_zero_tail_needs_no_rewrite() {
        let end = at(1, 6, 0);
        let check = effective_streak(Some(0), Some(end), end + Duration::hours(30), false);
        assert!(!check.reset_stored);
    }

    proptest! {
        #[test]
        fn next_streak_is_monotonic(n in 0u32..100_000) {
            prop_assert_eq!(next_streak(n, true), n + 1);
            prop_assert_eq!(next_streak(n, false), 0);
        }

        #[test]
        fn stale_gap_always_zeroes(stored in 0u32..1000, gap_h in 24i64..10_000) {
            let end = at(1, 6, 0);
            let check = effective_streak(Some(stored), Some(end), end + Duration::hours(gap_h), false);
            prop_assert_eq!(check.streak, 0);
        }
    }
}
