//! Reminder scheduling.
//!
//! Every reminder and timed mascot transition is a [`ScheduledTrigger`]. The
//! [`ReminderScheduler`] owns the table of pending triggers, one per kind,
//! and arms each one through an external [`TimerService`] that delivers the
//! [`TriggerPayload`] back at or after the requested instant.
//!
//! Recurring triggers are derived from the goal and "now" alone, so after a
//! restart the whole recurring set is rebuilt from the persisted goal.

mod table;
mod timer;
mod tokio_timer;

pub use table::{next_daily_fire, ReminderScheduler, SchedulerConfig};
pub use timer::{ManualTimer, TimerService};
pub use tokio_timer::TokioTimerService;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::goal::SleepGoal;
use crate::mascot::MascotState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerKind {
    HourBefore,
    HalfHourBefore,
    Bedtime,
    FiveAfterBedtime,
    FiftyFiveAfterBedtime,
    BedtimeCheck,
    DailyReminder,
    StopTrackingReminder,
    PostSleepNeutral,
    DaytimeEncouraging,
}

/// What a fired trigger does to the mascot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireMood {
    Set(MascotState),
    /// Re-run the mascot rules.
    Recompute,
    Unchanged,
}

impl TriggerKind {
    /// Kinds re-armed daily and rebuilt from the goal.
    pub const RECURRING: [TriggerKind; 7] = [
        TriggerKind::HourBefore,
        TriggerKind::HalfHourBefore,
        TriggerKind::Bedtime,
        TriggerKind::FiveAfterBedtime,
        TriggerKind::FiftyFiveAfterBedtime,
        TriggerKind::BedtimeCheck,
        TriggerKind::DailyReminder,
    ];

    /// Stable timer id. Arming an id again replaces the earlier timer.
    pub fn id(&self) -> &'static str {
        match self {
            TriggerKind::HourBefore => "hour_before",
            TriggerKind::HalfHourBefore => "half_hour_before",
            TriggerKind::Bedtime => "bedtime",
            TriggerKind::FiveAfterBedtime => "five_after_bedtime",
            TriggerKind::FiftyFiveAfterBedtime => "fifty_five_after_bedtime",
            TriggerKind::BedtimeCheck => "bedtime_check",
            TriggerKind::DailyReminder => "daily_reminder",
            TriggerKind::StopTrackingReminder => "stop_tracking_reminder",
            TriggerKind::PostSleepNeutral => "post_sleep_neutral",
            TriggerKind::DaytimeEncouraging => "daytime_encouraging",
        }
    }

    pub fn is_recurring(&self) -> bool {
        Self::RECURRING.contains(self)
    }

    /// Offset from bedtime for bedtime-relative kinds.
    pub fn bedtime_offset(&self) -> Option<Duration> {
        match self {
            TriggerKind::HourBefore => Some(Duration::minutes(-60)),
            TriggerKind::HalfHourBefore => Some(Duration::minutes(-30)),
            TriggerKind::Bedtime => Some(Duration::zero()),
            TriggerKind::FiveAfterBedtime => Some(Duration::minutes(5)),
            TriggerKind::FiftyFiveAfterBedtime => Some(Duration::minutes(55)),
            TriggerKind::BedtimeCheck => Some(Duration::minutes(60)),
            _ => None,
        }
    }

    /// Nominal time of day for recurring kinds.
    pub fn daily_time(&self, goal: &SleepGoal, config: &SchedulerConfig) -> Option<NaiveTime> {
        if *self == TriggerKind::DailyReminder {
            return Some(config.daily_reminder);
        }
        self.bedtime_offset().map(|offset| goal.bed_time + offset)
    }

    pub fn fire_mood(&self) -> FireMood {
        match self {
            TriggerKind::HourBefore | TriggerKind::HalfHourBefore | TriggerKind::Bedtime => {
                FireMood::Set(MascotState::Encouraging)
            }
            TriggerKind::FiveAfterBedtime | TriggerKind::FiftyFiveAfterBedtime => {
                FireMood::Set(MascotState::Angry)
            }
            TriggerKind::PostSleepNeutral => FireMood::Set(MascotState::Neutral),
            TriggerKind::DaytimeEncouraging => FireMood::Set(MascotState::Encouraging),
            TriggerKind::BedtimeCheck | TriggerKind::DailyReminder => FireMood::Recompute,
            TriggerKind::StopTrackingReminder => FireMood::Unchanged,
        }
    }

    /// Whether firing produces a user-visible notification.
    pub fn notifies(&self, is_tracking: bool) -> bool {
        match self {
            TriggerKind::HourBefore
            | TriggerKind::HalfHourBefore
            | TriggerKind::Bedtime
            | TriggerKind::FiveAfterBedtime
            | TriggerKind::FiftyFiveAfterBedtime => !is_tracking,
            TriggerKind::DailyReminder => true,
            TriggerKind::StopTrackingReminder => is_tracking,
            TriggerKind::BedtimeCheck
            | TriggerKind::PostSleepNeutral
            | TriggerKind::DaytimeEncouraging => false,
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// What a pending trigger was computed against. A delivered payload whose
/// stamp no longer matches the table entry is stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TriggerStamp {
    /// Goal version, for recurring kinds.
    Goal(u64),
    /// Start of the live session the reminder belongs to.
    Session(NaiveDateTime),
    /// End of the finished session a post-sleep transition follows.
    Wake(NaiveDateTime),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTrigger {
    pub kind: TriggerKind,
    pub fire_at: NaiveDateTime,
    pub stamp: TriggerStamp,
}

/// Delivered back by the timer service when a trigger fires.
pub type TriggerPayload = ScheduledTrigger;
