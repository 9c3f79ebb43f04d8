use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::NaiveDateTime;

use super::TriggerPayload;
use crate::error::TimerError;

/// External "call me back at T" capability.
///
/// Delivery is at or after the requested instant, never before. Arming an
/// id that is already armed replaces the earlier timer.
pub trait TimerService: Send + Sync {
    fn arm_at(&self, at: NaiveDateTime, id: &str, payload: TriggerPayload) -> Result<(), TimerError>;

    fn cancel(&self, id: &str) -> Result<(), TimerError>;
}

/// A timer that never fires on its own.
///
/// Used by short-lived CLI invocations (the daemon rebuilds real timers on
/// boot) and by tests, which pull due payloads with [`ManualTimer::take_due`].
#[derive(Debug, Default)]
pub struct ManualTimer {
    armed: Mutex<BTreeMap<String, (NaiveDateTime, TriggerPayload)>>,
    denied: Mutex<bool>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the platform refusing exact-time scheduling.
    pub fn deny(&self, denied: bool) {
        *self.denied.lock().unwrap_or_else(|e| e.into_inner()) = denied;
    }

    pub fn is_armed(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn armed_at(&self, id: &str) -> Option<NaiveDateTime> {
        self.lock().get(id).map(|(at, _)| *at)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Every armed payload, earliest first.
    pub fn pending(&self) -> Vec<TriggerPayload> {
        let mut all: Vec<_> = self.lock().values().copied().collect();
        all.sort_by_key(|(at, p)| (*at, p.kind));
        all.into_iter().map(|(_, p)| p).collect()
    }

    /// Remove and return every payload due at `now`, earliest first.
    pub fn take_due(&self, now: NaiveDateTime) -> Vec<TriggerPayload> {
        let mut armed = self.lock();
        let due: Vec<String> = armed
            .iter()
            .filter(|(_, (at, _))| *at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        let mut out: Vec<(NaiveDateTime, TriggerPayload)> =
            due.iter().filter_map(|id| armed.remove(id)).collect();
        out.sort_by_key(|(at, p)| (*at, p.kind));
        out.into_iter().map(|(_, p)| p).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, (NaiveDateTime, TriggerPayload)>> {
        self.armed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TimerService for ManualTimer {
    fn arm_at(&self, at: NaiveDateTime, id: &str, payload: TriggerPayload) -> Result<(), TimerError> {
        if *self.denied.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(TimerError::Denied(id.to_string()));
        }
        self.lock().insert(id.to_string(), (at, payload));
        Ok(())
    }

    fn cancel(&self, id: &str) -> Result<(), TimerError> {
        self.lock().remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{ScheduledTrigger, TriggerKind, TriggerStamp};
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn payload(kind: TriggerKind, fire_at: NaiveDateTime) -> TriggerPayload {
        ScheduledTrigger {
            kind,
            fire_at,
            stamp: TriggerStamp::Goal(1),
        }
    }

    #[test]
    fn take_due_returns_in_fire_order() {
        let timer = ManualTimer::new();
        timer.arm_at(at(22, 0), "bedtime", payload(TriggerKind::Bedtime, at(22, 0))).unwrap();
        timer.arm_at(at(21, 0), "hour_before", payload(TriggerKind::HourBefore, at(21, 0))).unwrap();
        timer.arm_at(at(23, 0), "late", payload(TriggerKind::BedtimeCheck, at(23, 0))).unwrap();

        let due = timer.take_due(at(22, 30));
        assert_eq!(due.iter().map(|p| p.kind).collect::<Vec<_>>(), vec![TriggerKind::HourBefore, TriggerKind::Bedtime]);
        assert_eq!(timer.len(), 1);
    }

    #[test]
    fn rearming_same_id_replaces() {
        let timer = ManualTimer::new();
        timer.arm_at(at(22, 0), "bedtime", payload(TriggerKind::Bedtime, at(22, 0))).unwrap();
        timer.arm_at(at(23, 0), "bedtime", payload(TriggerKind::Bedtime, at(23, 0))).unwrap();
        assert_eq!(timer.len(), 1);
        assert_eq!(timer.armed_at("bedtime"), Some(at(23, 0)));
    }

    #[test]
    fn denied_arm_reports_error() {
        let timer = ManualTimer::new();
        timer.deny(true);
        let err = timer.arm_at(at(22, 0), "bedtime", payload(TriggerKind::Bedtime, at(22, 0)));
        assert_eq!(err, Err(TimerError::Denied("bedtime".into())));
        assert!(timer.is_empty());
    }
}
