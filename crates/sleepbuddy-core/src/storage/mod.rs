mod config;
pub mod database;
mod goal_store;
pub mod migrations;

pub use config::{Config, DaemonConfig, NotificationsConfig, RemindersConfig};
pub use database::{Database, HistoryStats};
pub use goal_store::DbGoalStore;

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{ConfigError, Result};
use crate::goal::SleepGoal;
use crate::mascot::{MascotState, MessageState};
use crate::session::{SleepRecord, SleepSession};

/// Returns `~/.config/sleepbuddy[-dev]/` based on SLEEPBUDDY_ENV.
///
/// Set SLEEPBUDDY_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SLEEPBUDDY_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("sleepbuddy-dev")
    } else {
        base_dir.join("sleepbuddy")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Persisted sleep goal with change notification.
pub trait GoalStore: Send + Sync {
    /// Current goal; the default goal when nothing valid is stored.
    fn read(&self) -> Result<SleepGoal>;

    /// Validate and persist, then notify subscribers.
    fn write(&self, goal: &SleepGoal) -> Result<()>;

    fn subscribe(&self) -> watch::Receiver<SleepGoal>;

    /// Re-read the persisted goal, notifying subscribers when another
    /// process changed it. Returns whether it changed.
    fn reload(&self) -> Result<bool>;
}

/// Append-only log of finished sessions.
pub trait SessionHistory: Send + Sync {
    /// Store a finished session with the streak ending at it.
    fn append_session(&self, session: &SleepSession, streak: u32) -> Result<i64>;

    /// Store the live session as finished and clear the tracking flag in one
    /// commit. `Ok(None)` when the store no longer holds that session as live
    /// (another process finished or discarded it first).
    fn finish_session(&self, session: &SleepSession, streak: u32) -> Result<Option<i64>>;

    fn last_session(&self) -> Result<Option<SleepRecord>>;

    fn last_streak(&self) -> Result<Option<u32>>;

    /// Inactivity correction. Only the tail record is ever rewritten.
    fn overwrite_last_streak(&self, streak: u32) -> Result<()>;

    /// Most recent records first.
    fn recent(&self, limit: usize) -> Result<Vec<SleepRecord>>;

    fn stats(&self) -> Result<HistoryStats>;
}

/// Tracking flag and start time as persisted between processes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingState {
    pub is_tracking: bool,
    /// `None` while tracking means the stored start time was missing or
    /// unreadable.
    pub started_at: Option<NaiveDateTime>,
}

/// Small mutable application state: tracking flag, cached mood and message.
///
/// Cached values that no longer decode fall back to their defaults.
pub trait StateStore: Send + Sync {
    fn tracking(&self) -> Result<TrackingState>;

    /// `Some(start)` marks a live session, `None` clears it.
    fn set_tracking(&self, started_at: Option<NaiveDateTime>) -> Result<()>;

    fn mascot(&self) -> Result<MascotState>;

    fn set_mascot(&self, state: MascotState) -> Result<()>;

    fn message(&self) -> Result<MessageState>;

    fn set_message(&self, message: MessageState) -> Result<()>;
}
