use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{TimerService, TriggerPayload};
use crate::clock::Clock;
use crate::error::TimerError;

/// Timer service backed by tokio tasks.
///
/// Each armed id owns one sleeping task; when it wakes, the payload is sent
/// on the channel returned by [`TokioTimerService::channel`]. The wall-clock
/// delay is computed once at arming time, so a suspended machine delivers
/// late rather than early. The daemon's reconcile pass covers the rest.
pub struct TokioTimerService {
    clock: Arc<dyn Clock>,
    tx: mpsc::UnboundedSender<TriggerPayload>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioTimerService {
    pub fn channel(clock: Arc<dyn Clock>) -> (Self, mpsc::UnboundedReceiver<TriggerPayload>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = Self {
            clock,
            tx,
            tasks: Mutex::new(HashMap::new()),
        };
        (service, rx)
    }

    /// Number of timers still sleeping.
    pub fn active(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }
}

impl TimerService for TokioTimerService {
    fn arm_at(&self, at: NaiveDateTime, id: &str, payload: TriggerPayload) -> Result<(), TimerError> {
        let handle = Handle::try_current().map_err(|e| TimerError::Unavailable(e.to_string()))?;
        let delay = (at - self.clock.now()).to_std().unwrap_or_default();
        let tx = self.tx.clone();

        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the daemon is shutting down.
            let _ = tx.send(payload);
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = tasks.insert(id.to_string(), task) {
            previous.abort();
        }
        Ok(())
    }

    fn cancel(&self, id: &str) -> Result<(), TimerError> {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = tasks.remove(id) {
            task.abort();
        }
        Ok(())
    }
}

impl Drop for TokioTimerService {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(|e| e.into_inner());
        for (_, task) in tasks.drain() {
            task.abort();
        }
    }
}
