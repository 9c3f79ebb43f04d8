//! Goal evaluation for finished sleep sessions.
//!
//! A session meets the goal when both hold:
//!
//! - it lasted at least the target duration and at most
//!   [`OVERSLEEP_ALLOWANCE_HOURS`] more (longer usually means tracking was
//!   never stopped);
//! - it started no later than one hour after the declared bedtime.
//!
//! The start check is made on the clock face. The signed offset from bedtime
//! to the start time-of-day is wrapped into `(-12h, +12h]`, so a 23:45 start
//! for a 00:30 bedtime is 45 minutes early, and a 01:00 start for a 22:00
//! bedtime is three hours late.

use chrono::{NaiveTime, Timelike};

use super::SleepGoal;
use crate::session::SleepSession;

pub const OVERSLEEP_ALLOWANCE_HOURS: f32 = 4.0;

const START_GRACE_MINUTES: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * 60;

fn minutes_of_day(t: NaiveTime) -> i64 {
    (t.hour() * 60 + t.minute()) as i64
}

/// Minutes from `bed_time` to `start`, wrapped into `(-720, 720]`.
pub fn start_offset_minutes(bed_time: NaiveTime, start: NaiveTime) -> i64 {
    let raw = (minutes_of_day(start) - minutes_of_day(bed_time)).rem_euclid(MINUTES_PER_DAY);
    if raw > MINUTES_PER_DAY / 2 {
        raw - MINUTES_PER_DAY
    } else {
        raw
    }
}

fn duration_ok(hours: f32, goal: &SleepGoal) -> bool {
    let target = goal.sleep_duration_hours;
    hours >= target && hours <= target + OVERSLEEP_ALLOWANCE_HOURS
}

fn start_ok(session: &SleepSession, goal: &SleepGoal) -> bool {
    start_offset_minutes(goal.bed_time, session.start_time.time()) <= START_GRACE_MINUTES
}

/// Whether a finished session satisfies the goal. Live sessions never do.
pub fn is_goal_met(session: &SleepSession, goal: &SleepGoal) -> bool {
    let Some(hours) = session.duration_hours() else {
        return false;
    };
    duration_ok(hours, goal) && start_ok(session, goal)
}

/// True when the session ran past target + allowance.
pub fn exceeded_limit(session: &SleepSession, goal: &SleepGoal) -> bool {
    session
        .duration_hours()
        .is_some_and(|h| h > goal.sleep_duration_hours + OVERSLEEP_ALLOWANCE_HOURS)
}
