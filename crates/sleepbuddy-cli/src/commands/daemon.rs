//! Foreground reminder loop.
//!
//! Owns the live timers. One-shot commands run in other processes and only
//! persist their changes; the periodic reconcile picks those up.

use std::sync::Arc;
use std::time::Duration;

use sleepbuddy_core::{Event, GoalStore, SystemClock, TokioTimerService};
use tokio::time::MissedTickBehavior;

use super::{CliResult, Context};

pub async fn run() -> CliResult {
    let (timer, mut fired) = TokioTimerService::channel(Arc::new(SystemClock));
    let ctx = Context::open_with_timer(Arc::new(timer))?;
    let tracker = &ctx.tracker;

    emit(tracker.boot().await?);

    let mut goal_rx = ctx.goals.subscribe();
    let mut ticker = tokio::time::interval(Duration::from_secs(ctx.config.daemon.reconcile_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(reconcile_secs = ctx.config.daemon.reconcile_secs, "daemon started");

    loop {
        tokio::select! {
            Some(payload) = fired.recv() => {
                match tracker.handle_fired(payload).await {
                    Ok(event) => emit(event),
                    Err(e) => tracing::error!(error = %e, kind = %payload.kind, "trigger handling failed"),
                }
            }
            Ok(()) = goal_rx.changed() => {
                let goal = *goal_rx.borrow_and_update();
                match tracker.on_goal_changed(goal).await {
                    Ok(event) => emit(event),
                    Err(e) => tracing::error!(error = %e, "goal change failed"),
                }
            }
            _ = ticker.tick() => {
                match tracker.reconcile().await {
                    Ok(events) => emit(events),
                    Err(e) => tracing::warn!(error = %e, "reconcile failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("daemon stopping");
                break;
            }
        }
    }
    Ok(())
}

fn emit(events: impl IntoIterator<Item = Event>) {
    for event in events {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "event not serializable"),
        }
    }
}
