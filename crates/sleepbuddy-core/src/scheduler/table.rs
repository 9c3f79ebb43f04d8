//! The pending trigger table.
//!
//! ## Lifecycle
//!
//! ```text
//! goal change ──> update_goal ─> schedule moved: rearm_all (cancel, bump version, arm all)
//!                               target only: keep armed triggers
//! trigger fired ─> accept ────> recurring: re-arm next day | one-shot: drop
//! start ─────────> arm_stop_reminder        stop ─> cancel_stop_reminder
//!                                                 └─> arm_post_sleep
//! boot ──────────> restore (recurring from goal + live session + wake-up)
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, NaiveTime};

use super::{ScheduledTrigger, TimerService, TriggerKind, TriggerPayload, TriggerStamp};
use crate::goal::SleepGoal;

/// Tunables for the reminder cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time of day of the afternoon reminder.
    pub daily_reminder: NaiveTime,
    /// Slack after the target duration before the stop-tracking reminder.
    pub stop_grace: Duration,
    /// Delay after waking before the mascot calms down to neutral.
    pub post_sleep_neutral_after: Duration,
    /// Delay after waking before the mascot starts encouraging again.
    pub daytime_encouraging_after: Duration,
    /// How late an undelivered trigger may still take effect. Older ones
    /// are moved on to their next occurrence silently.
    pub missed_grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            daily_reminder: NaiveTime::from_hms_opt(15, 0, 0).unwrap_or(NaiveTime::MIN),
            stop_grace: Duration::minutes(15),
            post_sleep_neutral_after: Duration::hours(2),
            daytime_encouraging_after: Duration::hours(10),
            missed_grace: Duration::hours(1),
        }
    }
}

/// Next instant at `time` strictly after `now`: today if still ahead,
/// otherwise tomorrow.
pub fn next_daily_fire(time: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(time);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Owns every pending trigger and arms them through a [`TimerService`].
pub struct ReminderScheduler {
    config: SchedulerConfig,
    timer: Arc<dyn TimerService>,
    goal: Option<SleepGoal>,
    goal_version: u64,
    pending: BTreeMap<TriggerKind, ScheduledTrigger>,
}

impl ReminderScheduler {
    pub fn new(config: SchedulerConfig, timer: Arc<dyn TimerService>) -> Self {
        Self {
            config,
            timer,
            goal: None,
            goal_version: 0,
            pending: BTreeMap::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Goal the recurring set was last computed from.
    pub fn goal(&self) -> Option<&SleepGoal> {
        self.goal.as_ref()
    }

    pub fn goal_version(&self) -> u64 {
        self.goal_version
    }

    pub fn get(&self, kind: TriggerKind) -> Option<&ScheduledTrigger> {
        self.pending.get(&kind)
    }

    /// Pending triggers ordered by fire time.
    pub fn pending(&self) -> Vec<ScheduledTrigger> {
        let mut all: Vec<_> = self.pending.values().copied().collect();
        all.sort_by_key(|t| (t.fire_at, t.kind));
        all
    }

    /// Pending triggers whose fire time is at or before `now`.
    pub fn overdue(&self, now: NaiveDateTime) -> Vec<ScheduledTrigger> {
        self.pending()
            .into_iter()
            .filter(|t| t.fire_at <= now)
            .collect()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Apply a goal edit. Recurring triggers are re-armed only when bedtime
    /// or duration moved; a target-only edit keeps them and their version.
    pub fn update_goal(&mut self, goal: &SleepGoal, now: NaiveDateTime) -> u64 {
        match self.goal {
            Some(armed) if !armed.schedule_differs(goal) => {
                self.goal = Some(*goal);
                tracing::debug!(version = self.goal_version, "goal schedule unchanged, triggers kept");
                self.goal_version
            }
            _ => self.rearm_all(goal, now),
        }
    }

    /// Cancel every recurring trigger and rebuild the set from `goal`.
    ///
    /// Returns the new goal version; payloads stamped with older versions
    /// are ignored from now on.
    pub fn rearm_all(&mut self, goal: &SleepGoal, now: NaiveDateTime) -> u64 {
        for kind in TriggerKind::RECURRING {
            self.cancel(kind);
        }
        self.goal_version += 1;
        self.goal = Some(*goal);

        for kind in TriggerKind::RECURRING {
            if let Some(time) = kind.daily_time(goal, &self.config) {
                let fire_at = next_daily_fire(time, now);
                self.arm(kind, fire_at, TriggerStamp::Goal(self.goal_version));
            }
        }
        tracing::info!(
            version = self.goal_version,
            bed_time = %goal.bed_time,
            "recurring reminders re-armed"
        );
        self.goal_version
    }

    /// Arm the one-shot reminder for a live session. Skipped when the
    /// reminder instant is not in the future.
    pub fn arm_stop_reminder(
        &mut self,
        started_at: NaiveDateTime,
        goal: &SleepGoal,
        now: NaiveDateTime,
    ) -> Option<NaiveDateTime> {
        let fire_at = started_at + goal.sleep_duration() + self.config.stop_grace;
        if fire_at <= now {
            tracing::debug!(%fire_at, "stop-tracking reminder already overdue, not armed");
            self.cancel(TriggerKind::StopTrackingReminder);
            return None;
        }
        self.arm(
            TriggerKind::StopTrackingReminder,
            fire_at,
            TriggerStamp::Session(started_at),
        );
        Some(fire_at)
    }

    pub fn cancel_stop_reminder(&mut self) {
        self.cancel(TriggerKind::StopTrackingReminder);
    }

    /// Arm the mascot transitions that follow a wake-up. Instants already
    /// in the past are skipped.
    pub fn arm_post_sleep(&mut self, ended_at: NaiveDateTime, now: NaiveDateTime) {
        let steps = [
            (TriggerKind::PostSleepNeutral, self.config.post_sleep_neutral_after),
            (TriggerKind::DaytimeEncouraging, self.config.daytime_encouraging_after),
        ];
        for (kind, delay) in steps {
            let fire_at = ended_at + delay;
            if fire_at > now {
                self.arm(kind, fire_at, TriggerStamp::Wake(ended_at));
            } else {
                self.cancel(kind);
            }
        }
    }

    /// Rebuild everything after a process restart.
    pub fn restore(
        &mut self,
        goal: &SleepGoal,
        now: NaiveDateTime,
        live_since: Option<NaiveDateTime>,
        last_wake: Option<NaiveDateTime>,
    ) {
        self.rearm_all(goal, now);
        match live_since {
            Some(started_at) => {
                self.arm_stop_reminder(started_at, goal, now);
            }
            None => self.cancel_stop_reminder(),
        }
        if let Some(ended_at) = last_wake {
            self.arm_post_sleep(ended_at, now);
        }
    }

    /// Accept a delivered payload.
    ///
    /// Returns `None` when the payload is stale (cancelled, superseded by a
    /// goal change, or already handled). Otherwise recurring kinds are
    /// re-armed for their next occurrence before returning, and one-shots
    /// are dropped from the table. The second element is the re-armed
    /// fire time.
    pub fn accept(
        &mut self,
        payload: &TriggerPayload,
        now: NaiveDateTime,
    ) -> Option<(ScheduledTrigger, Option<NaiveDateTime>)> {
        let current = self.pending.get(&payload.kind).copied();
        if current != Some(*payload) {
            tracing::debug!(kind = %payload.kind, "ignoring stale trigger");
            return None;
        }

        if !payload.kind.is_recurring() {
            self.pending.remove(&payload.kind);
            return Some((*payload, None));
        }

        let goal = self.goal?;
        let time = payload.kind.daily_time(&goal, &self.config)?;
        let next = next_daily_fire(time, now.max(payload.fire_at));
        self.arm(payload.kind, next, payload.stamp);
        Some((*payload, Some(next)))
    }

    pub fn cancel(&mut self, kind: TriggerKind) {
        if self.pending.remove(&kind).is_some() {
            if let Err(e) = self.timer.cancel(kind.id()) {
                tracing::warn!(kind = %kind, error = %e, "failed to cancel timer");
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn arm(&mut self, kind: TriggerKind, fire_at: NaiveDateTime, stamp: TriggerStamp) {
        let trigger = ScheduledTrigger {
            kind,
            fire_at,
            stamp,
        };
        self.pending.insert(kind, trigger);
        match self.timer.arm_at(fire_at, kind.id(), trigger) {
            Ok(()) => tracing::debug!(kind = %kind, %fire_at, "trigger armed"),
            Err(e) => tracing::warn!(kind = %kind, %fire_at, error = %e, "timer refused, trigger left unarmed"),
        }
    }
}
