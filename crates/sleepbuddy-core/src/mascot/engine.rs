//! Mascot mood rules.
//!
//! The mood is a pure function of wall-clock time, the goal, the tracking
//! status and the streak. It is never the source of a timer; callers
//! re-evaluate it on start/stop, goal change, foreground and every fired
//! trigger.
//!
//! ```text
//! 00:00 ─ morning ─ 11:00 ─ daytime ─ 19:00 ─ wind-down ─ bed+1h ─ late ─
//!   milestone / yesterday   NEUTRAL      ENCOURAGING       ANGRY|NEUTRAL
//! ```

use chrono::{NaiveDateTime, NaiveTime, Timelike};

use super::MascotState;
use crate::goal::SleepGoal;
use crate::session::SleepSession;
use crate::streak::SPECIAL_STREAK_DAYS;

/// End of the morning window (exclusive).
pub const MORNING_END: NaiveTime = match NaiveTime::from_hms_opt(11, 0, 0) {
    Some(t) => t,
    None => NaiveTime::MIN,
};

/// End of the neutral daytime window (exclusive).
pub const DAYTIME_END: NaiveTime = match NaiveTime::from_hms_opt(19, 0, 0) {
    Some(t) => t,
    None => NaiveTime::MIN,
};

const WEEK_STREAK_DAYS: u32 = 7;
const WIND_DOWN_GRACE_MINUTES: u32 = 60;

fn minutes_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// Minute-of-day at which the wind-down window closes. Bedtimes before noon
/// belong to the next calendar day, so the result may exceed 24h.
fn wind_down_end_minutes(bed_time: NaiveTime) -> u32 {
    let mut bed = minutes_of_day(bed_time);
    if bed_time < NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN) {
        bed += 24 * 60;
    }
    bed + WIND_DOWN_GRACE_MINUTES
}

/// Compute the mascot's mood. First matching rule wins.
pub fn mascot_state(
    now: NaiveDateTime,
    goal: &SleepGoal,
    is_tracking: bool,
    current_streak: u32,
    last_session: Option<&SleepSession>,
) -> MascotState {
    let time = now.time();

    if time < MORNING_END {
        return if current_streak >= SPECIAL_STREAK_DAYS {
            MascotState::Special
        } else if current_streak >= WEEK_STREAK_DAYS {
            MascotState::ExtremelyHappy
        } else if last_session.is_some_and(|s| s.goal_met) {
            MascotState::Happy
        } else {
            MascotState::Angry
        };
    }

    if time < DAYTIME_END {
        return MascotState::Neutral;
    }

    if minutes_of_day(time) < wind_down_end_minutes(goal.bed_time) {
        return MascotState::Encouraging;
    }

    if is_tracking {
        MascotState::Neutral
    } else {
        MascotState::Angry
    }
}
