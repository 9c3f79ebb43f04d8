use std::sync::Arc;

use tokio::sync::watch;

use super::database::KEY_GOAL;
use super::{Database, GoalStore};
use crate::error::Result;
use crate::goal::SleepGoal;

/// Goal persisted as JSON in the kv table, broadcast over a watch channel.
///
/// Writes made by this process notify subscribers immediately. Writes from
/// another process (e.g. `sleepbuddy goal set` while the daemon runs) are
/// picked up by [`GoalStore::reload`].
pub struct DbGoalStore {
    db: Arc<Database>,
    tx: watch::Sender<SleepGoal>,
}

impl DbGoalStore {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let goal = decode(&db)?;
        let (tx, _rx) = watch::channel(goal);
        Ok(Self { db, tx })
    }
}

/// Stored goal, or the default when absent or invalid.
fn decode(db: &Database) -> Result<SleepGoal> {
    let Some(raw) = db.kv_get(KEY_GOAL)? else {
        return Ok(SleepGoal::default());
    };
    let goal = match serde_json::from_str::<SleepGoal>(&raw) {
        Ok(goal) => goal,
        Err(e) => {
            tracing::warn!(error = %e, "stored goal unreadable, using default");
            return Ok(SleepGoal::default());
        }
    };
    if let Err(e) = goal.validate() {
        tracing::warn!(error = %e, "stored goal invalid, using default");
        return Ok(SleepGoal::default());
    }
    Ok(goal)
}

impl GoalStore for DbGoalStore {
    fn read(&self) -> Result<SleepGoal> {
        decode(&self.db)
    }

    fn write(&self, goal: &SleepGoal) -> Result<()> {
        goal.validate()?;
        self.db.kv_set(KEY_GOAL, &serde_json::to_string(goal)?)?;
        self.tx.send_replace(*goal);
        tracing::info!(
            bed_time = %goal.bed_time,
            hours = goal.sleep_duration_hours,
            target = goal.target_streak_days,
            "goal saved"
        );
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<SleepGoal> {
        self.tx.subscribe()
    }

    fn reload(&self) -> Result<bool> {
        let stored = decode(&self.db)?;
        let changed = self.tx.send_if_modified(|current| {
            if *current == stored {
                false
            } else {
                *current = stored;
                true
            }
        });
        if changed {
            tracing::info!(bed_time = %stored.bed_time, "goal changed on disk");
        }
        Ok(changed)
    }
}
