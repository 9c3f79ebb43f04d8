//! User-visible reminders.
//!
//! The tracker decides *whether* a fired trigger notifies; this module
//! decides *what* it says and hands it to a [`NotificationSink`]. Sinks are
//! best effort: the tracker logs and swallows every [`NotifyError`].

use std::process::Command;
use std::sync::Mutex;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;
use crate::goal::SleepGoal;
use crate::scheduler::TriggerKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Stable per kind, so a newer reminder replaces an older one.
    pub id: u32,
    pub title: String,
    pub body: String,
}

pub trait NotificationSink: Send + Sync {
    fn display(&self, notification: &Notification) -> Result<(), NotifyError>;
}

// `{bed}` is replaced with the bedtime, e.g. "10:30 PM".
const HOUR_BEFORE: &[&str] = &[
    "Hey! Just a friendly reminder: bedtime is at {bed}. Let's keep that streak alive!",
    "Your cozy bed is waiting! Get ready to wind down, just an hour left before bedtime.",
];

const HALF_HOUR_BEFORE: &[&str] = &[
    "Your dog's getting sleepy... shouldn't you be too? Bedtime is coming up in 30 minutes!",
    "Tick tock! Time to start wrapping things up. Bedtime is at {bed}, and your streak depends on it!",
];

const BEDTIME: &[&str] = &[
    "Bedtime is here! Stick to your plan and hit the hay to keep your streak going strong. Your dog is counting on you!",
    "Good night, champion! Let's make tonight count. Start winding down and start tracking when you're ready.",
];

const AFTER_BEDTIME: &[&str] = &[
    "It's past {bed} and your dog is getting grumpy. Start tracking and get some rest!",
    "Still up? Bedtime was {bed}. There's still time to save tonight's streak.",
];

const LAST_CALL: &[&str] = &[
    "Last call! Start tracking in the next few minutes or tonight won't count toward your streak.",
];

const DAILY: &[&str] = &[
    "Good afternoon! Tonight's bedtime is {bed}. Plan your evening around it.",
    "Quick check-in: your dog is looking forward to a {bed} bedtime tonight.",
];

const STOP_TRACKING: &[&str] = &[
    "Good morning! Did you forget to stop tracking? Your dog is waiting to hear how you slept.",
];

/// Notification content for a reminder kind, `None` for silent kinds.
pub fn reminder_notification<R: Rng + ?Sized>(
    kind: TriggerKind,
    goal: &SleepGoal,
    rng: &mut R,
) -> Option<Notification> {
    let (id, title, catalog) = match kind {
        TriggerKind::HourBefore => (1, "Bedtime Reminder", HOUR_BEFORE),
        TriggerKind::HalfHourBefore => (2, "Bedtime Soon", HALF_HOUR_BEFORE),
        TriggerKind::Bedtime => (3, "Time for Bed", BEDTIME),
        TriggerKind::FiveAfterBedtime => (4, "Past Bedtime", AFTER_BEDTIME),
        TriggerKind::FiftyFiveAfterBedtime => (5, "Last Call", LAST_CALL),
        TriggerKind::DailyReminder => (6, "Tonight's Bedtime", DAILY),
        TriggerKind::StopTrackingReminder => (7, "Still Tracking?", STOP_TRACKING),
        TriggerKind::BedtimeCheck
        | TriggerKind::PostSleepNeutral
        | TriggerKind::DaytimeEncouraging => return None,
    };
    let template = catalog.choose(rng).copied()?;
    let bed = goal.bed_time.format("%-I:%M %p").to_string();
    Some(Notification {
        id,
        title: title.to_string(),
        body: template.replace("{bed}", &bed),
    })
}

/// Writes notifications to the log. Used when no notifier command is set.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn display(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(id = notification.id, title = %notification.title, "{}", notification.body);
        Ok(())
    }
}

/// Refuses everything, standing in for a user who turned notifications off.
#[derive(Debug, Default, Clone, Copy)]
pub struct MutedSink;

impl NotificationSink for MutedSink {
    fn display(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::PermissionDenied)
    }
}

/// Runs an external notifier such as `notify-send` with the title and body
/// as its last two arguments.
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    /// Split a configured command line on whitespace. Returns `None` for an
    /// empty command.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl NotificationSink for CommandSink {
    fn display(&self, notification: &Notification) -> Result<(), NotifyError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&notification.title)
            .arg(&notification.body)
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(NotifyError::Failed(format!("{} exited with {status}", self.program)))
        }
    }
}

/// Keeps every displayed notification in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    shown: Mutex<Vec<Notification>>,
    fail: Mutex<bool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `display` calls fail.
    pub fn fail(&self, fail: bool) {
        *self.fail.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.shown.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl NotificationSink for RecordingSink {
    fn display(&self, notification: &Notification) -> Result<(), NotifyError> {
        if *self.fail.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(NotifyError::Failed("recording sink set to fail".into()));
        }
        self.shown
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use rand::rngs::mock::StepRng;

    fn goal_at(h: u32, m: u32) -> SleepGoal {
        SleepGoal {
            bed_time: NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            ..SleepGoal::default()
        }
    }

    #[test]
    fn hour_before_mentions_bedtime() {
        let mut rng = StepRng::new(0, 0);
        let n = reminder_notification(TriggerKind::HourBefore, &goal_at(22, 30), &mut rng).unwrap();
        assert_eq!(n.title, "Bedtime Reminder");
        assert!(n.body.contains("10:30 PM"), "{}", n.body);
    }

    #[test]
    fn silent_kinds_have_no_content() {
        let mut rng = StepRng::new(0, 1);
        for kind in [
            TriggerKind::BedtimeCheck,
            TriggerKind::PostSleepNeutral,
            TriggerKind::DaytimeEncouraging,
        ] {
            assert!(reminder_notification(kind, &SleepGoal::default(), &mut rng).is_none());
        }
    }

    #[test]
    fn notifying_kinds_have_distinct_ids() {
        let mut rng = StepRng::new(0, 1);
        let mut ids: Vec<u32> = [
            TriggerKind::HourBefore,
            TriggerKind::HalfHourBefore,
            TriggerKind::Bedtime,
            TriggerKind::FiveAfterBedtime,
            TriggerKind::FiftyFiveAfterBedtime,
            TriggerKind::DailyReminder,
            TriggerKind::StopTrackingReminder,
        ]
        .into_iter()
        .filter_map(|k| reminder_notification(k, &SleepGoal::default(), &mut rng))
        .map(|n| n.id)
        .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 7);
    }

    #[test]
    fn no_template_is_left_unformatted() {
        let mut rng = StepRng::new(0, 1);
        for _ in 0..4 {
            let n = reminder_notification(TriggerKind::DailyReminder, &goal_at(21, 0), &mut rng).unwrap();
            assert!(!n.body.contains("{bed}"));
        }
    }

    #[test]
    fn command_line_is_split_into_program_and_args() {
        let sink = CommandSink::from_command_line("notify-send -u critical").unwrap();
        assert_eq!(sink.program(), "notify-send");
        assert_eq!(sink.args, vec!["-u".to_string(), "critical".to_string()]);
        assert!(CommandSink::from_command_line("   ").is_none());
    }

    #[test]
    fn recording_sink_can_fail() {
        let sink = RecordingSink::new();
        let n = Notification {
            id: 1,
            title: "t".into(),
            body: "b".into(),
        };
        sink.display(&n).unwrap();
        sink.fail(true);
        assert!(sink.display(&n).is_err());
        assert_eq!(sink.shown().len(), 1);
    }

    #[test]
    fn muted_sink_reports_permission_denied() {
        let n = Notification {
            id: 1,
            title: "t".into(),
            body: "b".into(),
        };
        assert!(matches!(MutedSink.display(&n), Err(NotifyError::PermissionDenied)));
    }
}
