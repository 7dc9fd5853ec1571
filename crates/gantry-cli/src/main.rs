//! Gantry CLI tool.

use clap::{Parser, Subcommand, ValueEnum};
use gantry_core::event::EventKind;

mod commands;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(about = "Gantry CI engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a workflow configuration
    Validate {
        /// Path to the workflow file
        #[arg(default_value = "gantry.kdl")]
        path: String,
    },
    /// Execute a workflow for an event
    Run {
        /// Path to the workflow file
        #[arg(default_value = "gantry.kdl")]
        path: String,
        /// Kind of event driving this run
        #[arg(long, value_enum, default_value_t = EventArg::Manual)]
        event: EventArg,
        /// Changed path (repeatable); ignored for manual dispatch
        #[arg(long = "changed")]
        changed_paths: Vec<String>,
        /// Directory backing the artifact cache
        #[arg(long, env = "GANTRY_CACHE_DIR", default_value = ".gantry/cache")]
        cache_dir: String,
        /// Print captured logs for every job, not just failing ones
        #[arg(long)]
        verbose_logs: bool,
        /// Emit the run result as JSON instead of the human report
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EventArg {
    Push,
    PullRequest,
    Manual,
}

impl From<EventArg> for EventKind {
    fn from(arg: EventArg) -> Self {
        match arg {
            EventArg::Push => EventKind::Push,
            EventArg::PullRequest => EventKind::PullRequest,
            EventArg::Manual => EventKind::Manual,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
        Commands::Run {
            path,
            event,
            changed_paths,
            cache_dir,
            verbose_logs,
            json,
        } => {
            let status = commands::run(
                &path,
                event.into(),
                changed_paths,
                &cache_dir,
                verbose_logs,
                json,
            )
            .await?;
            std::process::exit(status);
        }
    }

    Ok(())
}
