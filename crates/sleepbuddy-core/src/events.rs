use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::goal::SleepGoal;
use crate::mascot::{MascotState, MessageState};
use crate::scheduler::{ScheduledTrigger, TriggerKind};
use crate::session::SleepSession;

/// Every state change in the tracker produces an Event.
/// The CLI prints them; a UI would render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TrackingStarted {
        started_at: NaiveDateTime,
        /// When the "did you forget to stop?" reminder fires, if armed.
        stop_reminder_at: Option<NaiveDateTime>,
        mascot: MascotState,
    },
    TrackingStopped {
        session: SleepSession,
        streak: u32,
        exceeded_limit: bool,
        mascot: MascotState,
        message: MessageState,
        message_text: String,
    },
    GoalUpdated {
        goal: SleepGoal,
        goal_version: u64,
        at: NaiveDateTime,
    },
    /// Stored streak decayed to zero after a day without sleep tracking.
    StreakReset {
        previous: u32,
        at: NaiveDateTime,
    },
    MascotChanged {
        from: MascotState,
        to: MascotState,
        at: NaiveDateTime,
    },
    TriggerFired {
        kind: TriggerKind,
        at: NaiveDateTime,
        /// Next occurrence for recurring kinds.
        rearmed_for: Option<NaiveDateTime>,
        notified: bool,
        mascot: MascotState,
    },
    StateSnapshot {
        goal: SleepGoal,
        is_tracking: bool,
        tracking_since: Option<NaiveDateTime>,
        streak: u32,
        mascot: MascotState,
        animation: String,
        message: MessageState,
        last_session: Option<SleepSession>,
        pending: Vec<ScheduledTrigger>,
        at: NaiveDateTime,
    },
}
