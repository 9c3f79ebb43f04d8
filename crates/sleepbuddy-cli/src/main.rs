use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "sleepbuddy", version, about = "SleepBuddy sleep-habit tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start, stop or inspect sleep tracking
    Track {
        #[command(subcommand)]
        action: commands::track::TrackAction,
    },
    /// Sleep goal management
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Current mascot mood and message
    Mascot,
    /// Finished sleep sessions, newest first
    History {
        /// Number of sessions to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// History statistics
    Stats,
    /// Pending reminders and mascot transitions
    Schedule,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run in the foreground, firing reminders on time
    Daemon,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SLEEPBUDDY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Track { action } => commands::track::run(action).await,
        Commands::Goal { action } => commands::goal::run(action).await,
        Commands::Mascot => commands::mascot::run().await,
        Commands::History { limit } => commands::history::run(limit),
        Commands::Stats => commands::stats::run(),
        Commands::Schedule => commands::schedule::run().await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Daemon => commands::daemon::run().await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
