pub mod config;
pub mod daemon;
pub mod goal;
pub mod history;
pub mod mascot;
pub mod schedule;
pub mod stats;
pub mod track;

use std::sync::Arc;

use serde::Serialize;
use sleepbuddy_core::notify::{CommandSink, LogSink, MutedSink, NotificationSink};
use sleepbuddy_core::scheduler::{ManualTimer, TimerService};
use sleepbuddy_core::storage::{Config, Database, DbGoalStore};
use sleepbuddy_core::{SleepTracker, SystemClock, TrackerDeps};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a command needs, opened from the data directory.
pub struct Context {
    pub config: Config,
    pub goals: Arc<DbGoalStore>,
    pub tracker: SleepTracker,
}

impl Context {
    /// Open with a timer that never fires. One-shot commands only record
    /// intent; the daemon owns the live timers.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        Self::open_with_timer(Arc::new(ManualTimer::new()))
    }

    pub fn open_with_timer(timer: Arc<dyn TimerService>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let db = Arc::new(Database::open()?);
        let goals = Arc::new(DbGoalStore::new(db.clone())?);
        let deps = TrackerDeps {
            clock: Arc::new(SystemClock),
            goals: goals.clone(),
            history: db.clone(),
            state: db,
            timer,
            sink: notification_sink(&config),
        };
        let tracker = SleepTracker::new(deps, config.scheduler_config()?)?;
        Ok(Self {
            config,
            goals,
            tracker,
        })
    }
}

fn notification_sink(config: &Config) -> Arc<dyn NotificationSink> {
    if !config.notifications.enabled {
        return Arc::new(MutedSink);
    }
    match CommandSink::from_command_line(&config.notifications.command) {
        Some(sink) => Arc::new(sink),
        None => Arc::new(LogSink),
    }
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
