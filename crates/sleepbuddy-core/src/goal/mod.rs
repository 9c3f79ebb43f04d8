//! The user's declared sleep goal and its evaluation.

mod evaluator;

pub use evaluator::{exceeded_limit, is_goal_met, start_offset_minutes, OVERSLEEP_ALLOWANCE_HOURS};

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_BED_TIME: (u32, u32) = (22, 0);
pub const DEFAULT_SLEEP_DURATION_HOURS: f32 = 8.0;
pub const DEFAULT_TARGET_STREAK_DAYS: u32 = 7;

/// Bedtime, target duration and target streak.
///
/// Immutable value: edits replace it wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SleepGoal {
    pub bed_time: NaiveTime,
    pub sleep_duration_hours: f32,
    pub target_streak_days: u32,
}

impl Default for SleepGoal {
    fn default() -> Self {
        Self {
            bed_time: NaiveTime::from_hms_opt(DEFAULT_BED_TIME.0, DEFAULT_BED_TIME.1, 0)
                .unwrap_or(NaiveTime::MIN),
            sleep_duration_hours: DEFAULT_SLEEP_DURATION_HOURS,
            target_streak_days: DEFAULT_TARGET_STREAK_DAYS,
        }
    }
}

impl SleepGoal {
    /// Build a validated goal.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] when the duration is not positive or the
    /// target streak is zero.
    pub fn new(
        bed_time: NaiveTime,
        sleep_duration_hours: f32,
        target_streak_days: u32,
    ) -> Result<Self, ValidationError> {
        let goal = Self {
            bed_time,
            sleep_duration_hours,
            target_streak_days,
        };
        goal.validate()?;
        Ok(goal)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.sleep_duration_hours.is_finite() || self.sleep_duration_hours <= 0.0 {
            return Err(ValidationError::NonPositiveDuration(self.sleep_duration_hours));
        }
        if self.target_streak_days == 0 {
            return Err(ValidationError::ZeroTargetStreak);
        }
        Ok(())
    }

    /// Target sleep as a duration, rounded to whole minutes.
    pub fn sleep_duration(&self) -> Duration {
        Duration::minutes((self.sleep_duration_hours as f64 * 60.0).round() as i64)
    }

    /// Whether bedtime or duration differ. Changing only the streak target
    /// does not move any reminder.
    pub fn schedule_differs(&self, other: &SleepGoal) -> bool {
        self.bed_time != other.bed_time || self.sleep_duration_hours != other.sleep_duration_hours
    }
}

/// Parse `HH:MM` (or `HH:MM:SS`) into a time of day.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidTimeOfDay(s.to_string()))
}
