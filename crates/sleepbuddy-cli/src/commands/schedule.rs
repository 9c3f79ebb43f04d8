use super::{print_json, CliResult, Context};

/// Rebuild the trigger table the way the daemon would and list it.
pub async fn run() -> CliResult {
    let ctx = Context::open()?;
    ctx.tracker.boot().await?;
    match ctx.tracker.snapshot().await? {
        sleepbuddy_core::Event::StateSnapshot { pending, .. } => print_json(&pending),
        _ => Err("unexpected snapshot event".into()),
    }
}
