use serde_json::json;

use super::{print_json, CliResult, Context};

pub async fn run() -> CliResult {
    let ctx = Context::open()?;
    for event in ctx.tracker.refresh().await? {
        tracing::debug!(?event, "refresh");
    }
    let (mascot, message) = match ctx.tracker.snapshot().await? {
        sleepbuddy_core::Event::StateSnapshot { mascot, message, .. } => (mascot, message),
        _ => return Err("unexpected snapshot event".into()),
    };
    let text = message.text(&mut rand::thread_rng());
    print_json(&json!({
        "mascot": mascot,
        "animation": mascot.animation(),
        "message": message,
        "text": text,
    }))
}
