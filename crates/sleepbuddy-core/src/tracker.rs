//! Tracking session controller.
//!
//! [`SleepTracker`] is the single writer over tracking state, the streak and
//! the pending trigger table. Every mutating operation takes one async lock
//! for its whole duration, so a fired trigger never interleaves with a
//! start, stop or goal edit.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start()--> Active --stop()--> Idle
//!  ^                  |
//!  +-- stop() with an unreadable start time discards it
//! ```
//!
//! Commands return `Ok(None)` when they do not apply (starting while
//! Active, stopping while Idle, a stale trigger payload).

use std::sync::Arc;

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::error::Result;
use crate::events::Event;
use crate::goal::{exceeded_limit, is_goal_met, SleepGoal};
use crate::mascot::{mascot_state, MascotState, MessageState};
use crate::notify::{reminder_notification, NotificationSink};
use crate::scheduler::{
    FireMood, ReminderScheduler, SchedulerConfig, TimerService, TriggerKind, TriggerPayload,
    TriggerStamp,
};
use crate::session::SleepSession;
use crate::storage::{GoalStore, SessionHistory, StateStore};
use crate::streak::{effective_streak, next_streak, SPECIAL_STREAK_DAYS};

/// External services the tracker drives.
#[derive(Clone)]
pub struct TrackerDeps {
    pub clock: Arc<dyn Clock>,
    pub goals: Arc<dyn GoalStore>,
    pub history: Arc<dyn SessionHistory>,
    pub state: Arc<dyn StateStore>,
    pub timer: Arc<dyn TimerService>,
    pub sink: Arc<dyn NotificationSink>,
}

struct Inner {
    scheduler: ReminderScheduler,
    goal: SleepGoal,
    mascot: MascotState,
    message: MessageState,
    /// End of the last finished session the post-sleep transitions were
    /// armed for.
    last_wake: Option<NaiveDateTime>,
    rng: StdRng,
}

pub struct SleepTracker {
    clock: Arc<dyn Clock>,
    goals: Arc<dyn GoalStore>,
    history: Arc<dyn SessionHistory>,
    state: Arc<dyn StateStore>,
    sink: Arc<dyn NotificationSink>,
    inner: Mutex<Inner>,
}

impl SleepTracker {
    /// Build a tracker from persisted state. No timer is armed until
    /// [`SleepTracker::boot`] or the first goal update.
    pub fn new(deps: TrackerDeps, config: SchedulerConfig) -> Result<Self> {
        let inner = Inner {
            scheduler: ReminderScheduler::new(config, deps.timer),
            goal: deps.goals.read()?,
            mascot: deps.state.mascot()?,
            message: deps.state.message()?,
            last_wake: None,
            rng: StdRng::from_entropy(),
        };
        Ok(Self {
            clock: deps.clock,
            goals: deps.goals,
            history: deps.history,
            state: deps.state,
            sink: deps.sink,
            inner: Mutex::new(inner),
        })
    }

    /// Replace the message/notification RNG (deterministic tests).
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.inner.get_mut().rng = rng;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Full state for display.
    pub async fn snapshot(&self) -> Result<Event> {
        let inner = self.inner.lock().await;
        let now = self.clock.now();
        let tracking = self.state.tracking()?;
        let last = self.history.last_session()?;
        let streak = effective_streak(
            last.as_ref().map(|r| r.streak),
            last.as_ref().and_then(|r| r.session.end_time),
            now,
            tracking.is_tracking,
        )
        .streak;

        Ok(Event::StateSnapshot {
            goal: inner.goal,
            is_tracking: tracking.is_tracking,
            tracking_since: tracking.started_at,
            streak,
            mascot: inner.mascot,
            animation: inner.mascot.animation().to_string(),
            message: inner.message,
            last_session: last.map(|r| r.session),
            pending: inner.scheduler.pending(),
            at: now,
        })
    }

    pub async fn goal(&self) -> SleepGoal {
        self.inner.lock().await.goal
    }

    pub async fn mascot(&self) -> MascotState {
        self.inner.lock().await.mascot
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Rebuild everything after a process start: goal, streak decay, the
    /// whole trigger table and the mood.
    pub async fn boot(&self) -> Result<Vec<Event>> {
        let mut inner = self.inner.lock().await;
        let now = self.clock.now();
        let mut events = Vec::new();

        inner.goal = self.goals.read()?;
        let tracking = self.state.tracking()?;
        events.extend(self.correct_streak(now, tracking.is_tracking)?);

        let last_wake = self.history.last_session()?.and_then(|r| r.session.end_time);
        let goal = inner.goal;
        let live_since = tracking.started_at.filter(|_| tracking.is_tracking);
        inner.scheduler.restore(&goal, now, live_since, last_wake);
        inner.last_wake = last_wake;

        let mood = self.compute_mood(&inner, now)?;
        events.extend(self.set_mood(&mut inner, mood, now)?);

        tracing::info!(
            tracking = tracking.is_tracking,
            pending = inner.scheduler.pending().len(),
            mascot = %inner.mascot,
            "tracker booted"
        );
        Ok(events)
    }

    /// Begin a live session. `None` when one is already running.
    pub async fn start(&self) -> Result<Option<Event>> {
        let mut inner = self.inner.lock().await;
        let now = self.clock.now();

        if self.state.tracking()?.is_tracking {
            tracing::debug!("start ignored, already tracking");
            return Ok(None);
        }

        // Decay a streak left idle for a day before this night extends it.
        self.correct_streak(now, false)?;

        self.state.set_tracking(Some(now))?;
        let goal = inner.goal;
        let stop_reminder_at = inner.scheduler.arm_stop_reminder(now, &goal, now);

        self.set_message(&mut inner, MessageState::Default)?;
        self.set_mood(&mut inner, MascotState::Neutral, now)?;

        tracing::info!(started_at = %now, "sleep tracking started");
        Ok(Some(Event::TrackingStarted {
            started_at: now,
            stop_reminder_at,
            mascot: inner.mascot,
        }))
    }

    /// Finish the live session. `None` when idle, or when the stored start
    /// time is unusable (it is discarded).
    pub async fn stop(&self) -> Result<Option<Event>> {
        let mut inner = self.inner.lock().await;
        let now = self.clock.now();

        let tracking = self.state.tracking()?;
        if !tracking.is_tracking {
            tracing::debug!("stop ignored, not tracking");
            return Ok(None);
        }
        let Some(started_at) = tracking.started_at else {
            tracing::warn!("discarding live session without a readable start time");
            self.state.set_tracking(None)?;
            inner.scheduler.cancel_stop_reminder();
            return Ok(None);
        };

        let goal = inner.goal;
        let live = SleepSession::live(started_at);
        let measured = live.clone().finish(now, false);
        let goal_met = is_goal_met(&measured, &goal);
        let exceeded = exceeded_limit(&measured, &goal);
        let session = live.finish(now, goal_met);

        let last_streak = self.history.last_streak()?.unwrap_or(0);
        let streak = next_streak(last_streak, goal_met);
        let Some(record_id) = self.history.finish_session(&session, streak)? else {
            tracing::debug!("stop ignored, session already finished elsewhere");
            inner.scheduler.cancel_stop_reminder();
            return Ok(None);
        };

        let (message, mood) = if streak == SPECIAL_STREAK_DAYS {
            (MessageState::ThirtyDayStreak, MascotState::Special)
        } else if streak == goal.target_streak_days {
            (MessageState::TargetStreak, MascotState::ExtremelyHappy)
        } else if goal_met {
            (MessageState::GoalMet, MascotState::Happy)
        } else if exceeded {
            (MessageState::ForgotToStop, MascotState::Angry)
        } else {
            (MessageState::GoalNotMet, MascotState::Angry)
        };

        inner.scheduler.cancel_stop_reminder();
        inner.scheduler.arm_post_sleep(now, now);
        inner.last_wake = Some(now);

        self.set_message(&mut inner, message)?;
        self.set_mood(&mut inner, mood, now)?;
        let message_text = message.text(&mut inner.rng).to_string();

        tracing::info!(
            id = record_id,
            minutes = session.duration_minutes.unwrap_or(0),
            goal_met,
            streak,
            mascot = %mood,
            "sleep tracking stopped"
        );
        Ok(Some(Event::TrackingStopped {
            session,
            streak,
            exceeded_limit: exceeded,
            mascot: inner.mascot,
            message,
            message_text,
        }))
    }

    /// Validate, persist and apply a new goal. The streak is kept.
    pub async fn update_goal(&self, goal: SleepGoal) -> Result<Event> {
        goal.validate()?;
        let mut inner = self.inner.lock().await;
        let now = self.clock.now();
        self.goals.write(&goal)?;
        self.apply_goal(&mut inner, goal, now)
    }

    /// Apply a goal written elsewhere. `None` when it is already armed.
    pub async fn on_goal_changed(&self, goal: SleepGoal) -> Result<Option<Event>> {
        let mut inner = self.inner.lock().await;
        if inner.scheduler.goal() == Some(&goal) {
            return Ok(None);
        }
        let now = self.clock.now();
        Ok(Some(self.apply_goal(&mut inner, goal, now)?))
    }

    /// Foreground refresh: streak decay and a fresh mood.
    pub async fn refresh(&self) -> Result<Vec<Event>> {
        let mut inner = self.inner.lock().await;
        let now = self.clock.now();
        let tracking = self.state.tracking()?;

        let mut events = Vec::new();
        events.extend(self.correct_streak(now, tracking.is_tracking)?);
        let mood = self.compute_mood(&inner, now)?;
        events.extend(self.set_mood(&mut inner, mood, now)?);
        Ok(events)
    }

    /// Handle a payload delivered by the timer service.
    ///
    /// Stale payloads are ignored. Recurring kinds are re-armed before the
    /// mood changes and before anything is shown to the user.
    pub async fn handle_fired(&self, payload: TriggerPayload) -> Result<Option<Event>> {
        let mut inner = self.inner.lock().await;
        let now = self.clock.now();
        self.sync_external(&mut inner, now)?;
        self.fire(&mut inner, &payload, now)
    }

    /// Pick up changes made by other processes, then fire every trigger
    /// whose time has passed without a delivery (e.g. across a suspend).
    /// Triggers missed by more than the configured grace only move on to
    /// their next occurrence.
    pub async fn reconcile(&self) -> Result<Vec<Event>> {
        let mut inner = self.inner.lock().await;
        let now = self.clock.now();
        let mut events = self.sync_external(&mut inner, now)?;

        let grace = inner.scheduler.config().missed_grace;
        for trigger in inner.scheduler.overdue(now) {
            if now - trigger.fire_at > grace {
                tracing::debug!(kind = %trigger.kind, fire_at = %trigger.fire_at, "skipping missed trigger");
                inner.scheduler.accept(&trigger, now);
                continue;
            }
            tracing::debug!(kind = %trigger.kind, fire_at = %trigger.fire_at, "delivering overdue trigger");
            events.extend(self.fire(&mut inner, &trigger, now)?);
        }
        Ok(events)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn apply_goal(&self, inner: &mut Inner, goal: SleepGoal, now: NaiveDateTime) -> Result<Event> {
        inner.goal = goal;
        let goal_version = inner.scheduler.update_goal(&goal, now);

        let tracking = self.state.tracking()?;
        if let (true, Some(started_at)) = (tracking.is_tracking, tracking.started_at) {
            inner.scheduler.arm_stop_reminder(started_at, &goal, now);
        }

        let mood = self.compute_mood(inner, now)?;
        self.set_mood(inner, mood, now)?;
        Ok(Event::GoalUpdated {
            goal,
            goal_version,
            at: now,
        })
    }

    fn fire(&self, inner: &mut Inner, payload: &TriggerPayload, now: NaiveDateTime) -> Result<Option<Event>> {
        let Some((trigger, rearmed_for)) = inner.scheduler.accept(payload, now) else {
            return Ok(None);
        };
        let kind = trigger.kind;
        let is_tracking = self.state.tracking()?.is_tracking;

        let mood = match kind.fire_mood() {
            FireMood::Set(state) => state,
            FireMood::Recompute => self.compute_mood(inner, now)?,
            FireMood::Unchanged => inner.mascot,
        };
        self.set_mood(inner, mood, now)?;

        let mut notified = false;
        if kind.notifies(is_tracking) {
            if let Some(notification) = reminder_notification(kind, &inner.goal, &mut inner.rng) {
                match self.sink.display(&notification) {
                    Ok(()) => notified = true,
                    Err(e) => tracing::warn!(kind = %kind, error = %e, "notification not shown"),
                }
            }
        }

        tracing::info!(kind = %kind, notified, mascot = %inner.mascot, "trigger fired");
        Ok(Some(Event::TriggerFired {
            kind,
            at: now,
            rearmed_for,
            notified,
            mascot: inner.mascot,
        }))
    }

    /// Align the in-memory view with what other processes persisted: the
    /// goal, the live session's reminder, the post-sleep transitions and the
    /// cached mood.
    fn sync_external(&self, inner: &mut Inner, now: NaiveDateTime) -> Result<Vec<Event>> {
        let mut events = Vec::new();

        if self.goals.reload()? {
            let goal = self.goals.read()?;
            if inner.scheduler.goal() != Some(&goal) {
                events.push(self.apply_goal(inner, goal, now)?);
            }
        }

        let tracking = self.state.tracking()?;
        let armed_for = inner
            .scheduler
            .get(TriggerKind::StopTrackingReminder)
            .map(|t| t.stamp);
        match (tracking.is_tracking, tracking.started_at) {
            (true, Some(started_at)) if armed_for != Some(TriggerStamp::Session(started_at)) => {
                let goal = inner.goal;
                inner.scheduler.arm_stop_reminder(started_at, &goal, now);
            }
            (false, _) if armed_for.is_some() => inner.scheduler.cancel_stop_reminder(),
            _ => {}
        }

        let last_wake = self.history.last_session()?.and_then(|r| r.session.end_time);
        if last_wake != inner.last_wake {
            if let Some(ended_at) = last_wake {
                inner.scheduler.arm_post_sleep(ended_at, now);
            }
            inner.last_wake = last_wake;
        }

        inner.mascot = self.state.mascot()?;
        inner.message = self.state.message()?;
        Ok(events)
    }

    /// Apply the inactivity decay to the stored tail streak.
    fn correct_streak(&self, now: NaiveDateTime, is_tracking: bool) -> Result<Option<Event>> {
        let Some(last) = self.history.last_session()? else {
            return Ok(None);
        };
        let check = effective_streak(Some(last.streak), last.session.end_time, now, is_tracking);
        if !check.reset_stored {
            return Ok(None);
        }
        self.history.overwrite_last_streak(0)?;
        tracing::info!(previous = last.streak, "streak reset after a day without sleep tracking");
        Ok(Some(Event::StreakReset {
            previous: last.streak,
            at: now,
        }))
    }

    fn compute_mood(&self, inner: &Inner, now: NaiveDateTime) -> Result<MascotState> {
        let is_tracking = self.state.tracking()?.is_tracking;
        let last = self.history.last_session()?;
        let streak = effective_streak(
            last.as_ref().map(|r| r.streak),
            last.as_ref().and_then(|r| r.session.end_time),
            now,
            is_tracking,
        )
        .streak;
        Ok(mascot_state(
            now,
            &inner.goal,
            is_tracking,
            streak,
            last.as_ref().map(|r| &r.session),
        ))
    }

    fn set_mood(&self, inner: &mut Inner, mood: MascotState, now: NaiveDateTime) -> Result<Option<Event>> {
        if inner.mascot == mood {
            return Ok(None);
        }
        self.state.set_mascot(mood)?;
        let from = std::mem::replace(&mut inner.mascot, mood);
        tracing::debug!(%from, to = %mood, "mascot mood changed");
        Ok(Some(Event::MascotChanged { from, to: mood, at: now }))
    }

    fn set_message(&self, inner: &mut Inner, message: MessageState) -> Result<()> {
        if inner.message != message {
            self.state.set_message(message)?;
            inner.message = message;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::notify::RecordingSink;
    use crate::scheduler::ManualTimer;
    use crate::storage::{Database, DbGoalStore};
    use chrono::{NaiveDate, NaiveTime};

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    struct Harness {
        tracker: SleepTracker,
        clock: Arc<FixedClock>,
        timer: Arc<ManualTimer>,
        sink: Arc<RecordingSink>,
        db: Arc<Database>,
    }

    fn harness(now: NaiveDateTime) -> Harness {
        let clock = Arc::new(FixedClock::new(now));
        let db = Arc::new(Database::open_memory().unwrap());
        let goals = Arc::new(DbGoalStore::new(db.clone()).unwrap());
        let timer = Arc::new(ManualTimer::new());
        let sink = Arc::new(RecordingSink::new());
        let deps = TrackerDeps {
            clock: clock.clone(),
            goals,
            history: db.clone(),
            state: db.clone(),
            timer: timer.clone(),
            sink: sink.clone(),
        };
        let tracker = SleepTracker::new(deps, SchedulerConfig::default())
            .unwrap()
            .with_rng(StdRng::seed_from_u64(7));
        Harness {
            tracker,
            clock,
            timer,
            sink,
            db,
        }
    }

    #[tokio::test]
    async fn start_twice_is_ignored() {
        let h = harness(at(1, 21, 50));
        assert!(h.tracker.start().await.unwrap().is_some());
        h.clock.advance(chrono::Duration::minutes(5));
        assert!(h.tracker.start().await.unwrap().is_none());
        assert_eq!(h.db.tracking().unwrap().started_at, Some(at(1, 21, 50)));
    }

    #[tokio::test]
    async fn stop_while_idle_is_ignored() {
        let h = harness(at(2, 6, 0));
        assert!(h.tracker.stop().await.unwrap().is_none());
        assert!(h.db.last_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn start_arms_stop_reminder_and_resets_mood() {
        let h = harness(at(1, 21, 50));
        let event = h.tracker.start().await.unwrap().unwrap();
        match event {
            Event::TrackingStarted {
                stop_reminder_at,
                mascot,
                ..
            } => {
                assert_eq!(stop_reminder_at, Some(at(2, 6, 5)));
                assert_eq!(mascot, MascotState::Neutral);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(h.timer.is_armed(TriggerKind::StopTrackingReminder.id()));
        assert_eq!(h.db.message().unwrap(), MessageState::Default);
    }

    #[tokio::test]
    async fn unreadable_start_time_is_discarded_on_stop() {
        let h = harness(at(2, 6, 0));
        h.db.kv_set("tracking.active", "true").unwrap();
        h.db.kv_set("tracking.start", "garbage").unwrap();

        assert!(h.tracker.stop().await.unwrap().is_none());
        assert!(!h.db.tracking().unwrap().is_tracking);
        assert!(h.db.last_session().unwrap().is_none());
        assert!(h.tracker.start().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stop_cancels_reminder_and_arms_post_sleep() {
        let h = harness(at(1, 21, 50));
        h.tracker.start().await.unwrap();
        h.clock.set(at(2, 6, 0));
        h.tracker.stop().await.unwrap().unwrap();

        assert!(!h.timer.is_armed(TriggerKind::StopTrackingReminder.id()));
        assert_eq!(h.timer.armed_at(TriggerKind::PostSleepNeutral.id()), Some(at(2, 8, 0)));
        assert_eq!(h.timer.armed_at(TriggerKind::DaytimeEncouraging.id()), Some(at(2, 16, 0)));
    }

    #[tokio::test]
    async fn forgot_to_stop_is_reported() {
        let h = harness(at(1, 21, 50));
        h.tracker.start().await.unwrap();
        h.clock.set(at(2, 11, 0));
        match h.tracker.stop().await.unwrap().unwrap() {
            Event::TrackingStopped {
                exceeded_limit,
                message,
                mascot,
                streak,
                ..
            } => {
                assert!(exceeded_limit);
                assert_eq!(message, MessageState::ForgotToStop);
                assert_eq!(mascot, MascotState::Angry);
                assert_eq!(streak, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn reaching_target_streak_is_celebrated() {
        let h = harness(at(1, 21, 50));
        let six_nights = SleepSession::live(at(1, 0, 0)).finish(at(1, 8, 0), true);
        h.db.append_session(&six_nights, 6).unwrap();

        h.tracker.start().await.unwrap();
        h.clock.set(at(2, 6, 0));
        match h.tracker.stop().await.unwrap().unwrap() {
            Event::TrackingStopped {
                streak,
                message,
                mascot,
                ..
            } => {
                assert_eq!(streak, 7);
                assert_eq!(message, MessageState::TargetStreak);
                assert_eq!(mascot, MascotState::ExtremelyHappy);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn thirtieth_night_beats_target() {
        let h = harness(at(1, 21, 50));
        let goal = SleepGoal {
            target_streak_days: 30,
            ..SleepGoal::default()
        };
        h.tracker.update_goal(goal).await.unwrap();
        let prior = SleepSession::live(at(1, 0, 0)).finish(at(1, 8, 0), true);
        h.db.append_session(&prior, 29).unwrap();

        h.tracker.start().await.unwrap();
        h.clock.set(at(2, 6, 0));
        match h.tracker.stop().await.unwrap().unwrap() {
            Event::TrackingStopped { message, mascot, .. } => {
                assert_eq!(message, MessageState::ThirtyDayStreak);
                assert_eq!(mascot, MascotState::Special);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn goal_update_rearms_and_keeps_streak() {
        let h = harness(at(1, 12, 0));
        let prior = SleepSession::live(at(1, 0, 0)).finish(at(1, 8, 0), true);
        h.db.append_session(&prior, 4).unwrap();
        h.tracker.boot().await.unwrap();

        let goal = SleepGoal::new(NaiveTime::from_hms_opt(23, 0, 0).unwrap(), 7.0, 10).unwrap();
        match h.tracker.update_goal(goal).await.unwrap() {
            Event::GoalUpdated { goal_version, .. } => assert_eq!(goal_version, 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(h.timer.armed_at(TriggerKind::Bedtime.id()), Some(at(1, 23, 0)));
        assert_eq!(h.db.last_streak().unwrap(), Some(4));
    }

    #[tokio::test]
    async fn invalid_goal_update_changes_nothing() {
        let h = harness(at(1, 12, 0));
        let bad = SleepGoal {
            sleep_duration_hours: 0.0,
            ..SleepGoal::default()
        };
        assert!(h.tracker.update_goal(bad).await.is_err());
        assert_eq!(h.tracker.goal().await, SleepGoal::default());
    }

    #[tokio::test]
    async fn on_goal_changed_ignores_armed_goal() {
        let h = harness(at(1, 12, 0));
        h.tracker.boot().await.unwrap();
        assert!(h.tracker.on_goal_changed(SleepGoal::default()).await.unwrap().is_none());
        let later = SleepGoal {
            bed_time: NaiveTime::from_hms_opt(23, 30, 0).unwrap(),
            ..SleepGoal::default()
        };
        assert!(h.tracker.on_goal_changed(later).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn target_only_goal_change_keeps_armed_reminders() {
        let h = harness(at(1, 12, 0));
        h.tracker.boot().await.unwrap();
        let bedtime = h.timer.armed_at(TriggerKind::Bedtime.id());

        let longer = SleepGoal {
            target_streak_days: 21,
            ..SleepGoal::default()
        };
        match h.tracker.on_goal_changed(longer).await.unwrap() {
            Some(Event::GoalUpdated { goal_version, .. }) => assert_eq!(goal_version, 1),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(h.tracker.goal().await, longer);
        assert_eq!(h.timer.armed_at(TriggerKind::Bedtime.id()), bedtime);
        assert!(h.tracker.on_goal_changed(longer).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reminder_is_silent_while_tracking_but_moves_mood() {
        let h = harness(at(1, 12, 0));
        h.tracker.boot().await.unwrap();
        h.clock.set(at(1, 21, 45));
        h.tracker.start().await.unwrap();

        h.clock.set(at(1, 22, 5));
        let due = h.timer.take_due(h.clock.now());
        let five_after = due
            .iter()
            .find(|p| p.kind == TriggerKind::FiveAfterBedtime)
            .copied()
            .unwrap();
        match h.tracker.handle_fired(five_after).await.unwrap().unwrap() {
            Event::TriggerFired {
                notified,
                mascot,
                rearmed_for,
                ..
            } => {
                assert!(!notified);
                assert_eq!(mascot, MascotState::Angry);
                assert_eq!(rearmed_for, Some(at(2, 22, 5)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(h.sink.shown().is_empty());
    }

    #[tokio::test]
    async fn notification_failure_is_swallowed() {
        let h = harness(at(1, 12, 0));
        h.tracker.boot().await.unwrap();
        h.sink.fail(true);
        h.clock.set(at(1, 21, 0));
        let hour_before = h
            .timer
            .take_due(h.clock.now())
            .into_iter()
            .find(|p| p.kind == TriggerKind::HourBefore)
            .unwrap();
        match h.tracker.handle_fired(hour_before).await.unwrap().unwrap() {
            Event::TriggerFired { notified, mascot, .. } => {
                assert!(!notified);
                assert_eq!(mascot, MascotState::Encouraging);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(h.timer.armed_at(TriggerKind::HourBefore.id()), Some(at(2, 21, 0)));
    }

    #[tokio::test]
    async fn stop_reminder_notifies_only_while_tracking() {
        let h = harness(at(1, 22, 0));
        h.tracker.start().await.unwrap();
        h.clock.set(at(2, 6, 15));
        let reminder = h
            .timer
            .take_due(h.clock.now())
            .into_iter()
            .find(|p| p.kind == TriggerKind::StopTrackingReminder)
            .unwrap();
        match h.tracker.handle_fired(reminder).await.unwrap().unwrap() {
            Event::TriggerFired { notified, rearmed_for, .. } => {
                assert!(notified);
                assert_eq!(rearmed_for, None);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(h.sink.shown()[0].title, "Still Tracking?");
        assert!(h.tracker.handle_fired(reminder).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reconcile_delivers_overdue_triggers_once() {
        let h = harness(at(1, 12, 0));
        h.tracker.boot().await.unwrap();
        // Machine slept through the afternoon reminder.
        h.clock.set(at(1, 15, 30));
        let events = h.tracker.reconcile().await.unwrap();
        assert!(events.iter().any(|e| matches!(
            e,
            Event::TriggerFired { kind: TriggerKind::DailyReminder, .. }
        )));
        assert_eq!(h.sink.shown().len(), 1);

        let again = h.tracker.reconcile().await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn reconcile_skips_long_missed_triggers() {
        let h = harness(at(1, 12, 0));
        h.tracker.boot().await.unwrap();
        h.clock.set(at(2, 7, 0));
        let events = h.tracker.reconcile().await.unwrap();
        assert!(!events.iter().any(|e| matches!(e, Event::TriggerFired { .. })));
        assert!(h.sink.shown().is_empty());
        assert_eq!(h.timer.armed_at(TriggerKind::Bedtime.id()), Some(at(2, 22, 0)));
        assert_eq!(h.timer.armed_at(TriggerKind::DailyReminder.id()), Some(at(2, 15, 0)));
    }

    #[tokio::test]
    async fn reconcile_follows_tracking_started_elsewhere() {
        let h = harness(at(1, 12, 0));
        h.tracker.boot().await.unwrap();
        h.db.set_tracking(Some(at(1, 22, 0))).unwrap();
        h.clock.set(at(1, 22, 1));
        h.tracker.reconcile().await.unwrap();
        assert_eq!(
            h.timer.armed_at(TriggerKind::StopTrackingReminder.id()),
            Some(at(2, 6, 15))
        );

        h.db.set_tracking(None).unwrap();
        h.tracker.reconcile().await.unwrap();
        assert!(!h.timer.is_armed(TriggerKind::StopTrackingReminder.id()));
    }

    #[tokio::test]
    async fn refresh_resets_stale_streak() {
        let h = harness(at(3, 12, 0));
        let old = SleepSession::live(at(1, 22, 0)).finish(at(2, 6, 0), true);
        h.db.append_session(&old, 5).unwrap();

        let events = h.tracker.refresh().await.unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::StreakReset { previous: 5, .. })));
        assert_eq!(h.db.last_streak().unwrap(), Some(0));
    }
}
