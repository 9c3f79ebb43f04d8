//! # SleepBuddy Core Library
//!
//! This library provides the core logic for the SleepBuddy sleep-habit tracker.
//! The CLI binary is a thin front-end over the same library, and the
//! long-running daemon owns the live reminder timers.
//!
//! ## Architecture
//!
//! - **Goal Evaluator**: decides whether a finished session met the goal
//! - **Streak Engine**: consecutive-success counter with inactivity decay
//! - **Mascot Engine**: pure mapping from wall-clock time and history to a mood
//! - **Reminder Scheduler**: table of armed triggers, re-armed after each
//!   firing and whenever the goal changes
//! - **Tracker**: start/stop state machine orchestrating all of the above
//! - **Storage**: SQLite-based session history and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SleepTracker`]: tracking session controller
//! - [`ReminderScheduler`]: pending trigger table
//! - [`Database`]: session history, goal and tracking-state persistence
//! - [`Config`]: application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod goal;
pub mod mascot;
pub mod notify;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod streak;
pub mod tracker;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, NotifyError, TimerError, ValidationError};
pub use events::Event;
pub use goal::{is_goal_met, SleepGoal};
pub use mascot::{mascot_state, MascotState, MessageState};
pub use notify::{CommandSink, LogSink, MutedSink, Notification, NotificationSink, RecordingSink};
pub use scheduler::{
    ManualTimer, ReminderScheduler, ScheduledTrigger, SchedulerConfig, TimerService, TokioTimerService,
    TriggerKind, TriggerPayload,
};
pub use session::{SleepRecord, SleepSession};
pub use storage::{Config, Database, DbGoalStore, GoalStore, SessionHistory, StateStore};
pub use streak::{check_staleness, next_streak};
pub use tracker::{SleepTracker, TrackerDeps};
