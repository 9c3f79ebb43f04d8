use clap::Subcommand;
use sleepbuddy_core::goal::{parse_time_of_day, SleepGoal};

use super::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Show the current goal
    Show,
    /// Change the goal. Omitted fields keep their current value
    Set {
        /// Bedtime as HH:MM
        #[arg(long)]
        bed_time: Option<String>,
        /// Target sleep duration in hours
        #[arg(long)]
        hours: Option<f32>,
        /// Target streak in days
        #[arg(long)]
        target: Option<u32>,
    },
}

pub async fn run(action: GoalAction) -> CliResult {
    let ctx = Context::open()?;
    match action {
        GoalAction::Show => print_json(&ctx.tracker.goal().await)?,
        GoalAction::Set {
            bed_time,
            hours,
            target,
        } => {
            let current = ctx.tracker.goal().await;
            let goal = merge(current, bed_time.as_deref(), hours, target)?;
            print_json(&ctx.tracker.update_goal(goal).await?)?;
        }
    }
    Ok(())
}

fn merge(
    current: SleepGoal,
    bed_time: Option<&str>,
    hours: Option<f32>,
    target: Option<u32>,
) -> Result<SleepGoal, Box<dyn std::error::Error>> {
    let bed_time = match bed_time {
        Some(raw) => parse_time_of_day(raw)?,
        None => current.bed_time,
    };
    Ok(SleepGoal::new(
        bed_time,
        hours.unwrap_or(current.sleep_duration_hours),
        target.unwrap_or(current.target_streak_days),
    )?)
}
