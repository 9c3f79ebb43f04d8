use clap::Subcommand;

use super::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum TrackAction {
    /// Start tracking sleep now
    Start,
    /// Stop tracking and record the session
    Stop,
    /// Show tracking state, streak and pending reminders
    Status,
}

pub async fn run(action: TrackAction) -> CliResult {
    let ctx = Context::open()?;
    match action {
        TrackAction::Start => match ctx.tracker.start().await? {
            Some(event) => print_json(&event)?,
            None => eprintln!("already tracking"),
        },
        TrackAction::Stop => match ctx.tracker.stop().await? {
            Some(event) => print_json(&event)?,
            None => eprintln!("not tracking"),
        },
        TrackAction::Status => {
            ctx.tracker.boot().await?;
            print_json(&ctx.tracker.snapshot().await?)?;
        }
    }
    Ok(())
}
