use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One tracked sleep interval.
///
/// While live, only `start_time` is set. `finish` fills the rest and the
/// session is handed to the history store as an immutable [`SleepRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSession {
    pub start_time: NaiveDateTime,
    #[serde(default)]
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub goal_met: bool,
}

impl SleepSession {
    pub fn live(start_time: NaiveDateTime) -> Self {
        Self {
            start_time,
            end_time: None,
            duration_minutes: None,
            goal_met: false,
        }
    }

    /// Whole minutes between start and `end`, never negative.
    pub fn minutes_until(&self, end: NaiveDateTime) -> i64 {
        (end - self.start_time).num_minutes().max(0)
    }

    pub fn finish(mut self, end_time: NaiveDateTime, goal_met: bool) -> Self {
        self.duration_minutes = Some(self.minutes_until(end_time));
        self.end_time = Some(end_time);
        self.goal_met = goal_met;
        self
    }

    pub fn is_live(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_minutes.map(Duration::minutes)
    }

    /// Fractional hours slept, derived from whole minutes.
    pub fn duration_hours(&self) -> Option<f32> {
        self.duration_minutes.map(|m| m as f32 / 60.0)
    }
}

/// A finalized session as stored in the history log, with the streak value
/// ending at this session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepRecord {
    pub id: i64,
    pub session: SleepSession,
    pub streak: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn finish_sets_duration_and_end() {
        let session = SleepSession::live(at(1, 21, 50)).finish(at(2, 6, 0), true);
        assert_eq!(session.end_time, Some(at(2, 6, 0)));
        assert_eq!(session.duration_minutes, Some(8 * 60 + 10));
        assert!(session.goal_met);
        assert!(!session.is_live());
    }

    #[test]
    fn clock_going_backwards_yields_zero_minutes() {
        let session = SleepSession::live(at(2, 6, 0));
        assert_eq!(session.minutes_until(at(1, 23, 0)), 0);
    }
}
