//! Fleet battle contest agent.
//!
//! # Usage
//!
//! ```bash
//! # Play a game over stdin/stdout
//! fleet_agent
//!
//! # Override the turn budget and log at DEBUG
//! fleet_agent --budget-ms 700 --verbose
//!
//! # Time the pipeline on recorded snapshots
//! fleet_agent profile --dir snapshots/
//! ```
//!
//! # Protocol
//!
//! Input (stdin): server messages, one JSON object per line
//! Output (stdout): answers, one JSON object per line
//! Logs (stderr): Debug information

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fleet_agent::{
    profile_dir, run_worker, AgentConfig, Isolation, Launcher, ProcessLauncher, Session,
    ThreadLauncher,
};

#[derive(Parser)]
#[command(name = "fleet_agent")]
#[command(about = "Fleet battle contest agent with per-turn deadline enforcement")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// RON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Per-turn budget in milliseconds
    #[arg(long, global = true)]
    budget_ms: Option<u64>,

    /// Poll interval in milliseconds
    #[arg(long, global = true)]
    poll_ms: Option<u64>,

    /// Attempt slice in milliseconds
    #[arg(long, global = true)]
    slice_ms: Option<u64>,

    /// Worker isolation mode
    #[arg(long, value_enum, global = true)]
    isolation: Option<Isolation>,

    /// Preferred distance to the locked target
    #[arg(long, global = true)]
    standoff: Option<i32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game over stdin/stdout (default)
    Run,

    /// Decide a single turn read from stdin (used by process isolation)
    #[command(hide = true)]
    Worker,

    /// Time the pipeline on every *.json snapshot in a directory
    Profile {
        /// Directory of recorded battle messages
        #[arg(short, long)]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_ascii_lowercase()));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(config),
        Commands::Worker => cmd_worker(),
        Commands::Profile { dir } => cmd_profile(&dir, &config),
    }
}

fn load_config(cli: &Cli) -> Result<AgentConfig, fleet_agent::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::default(),
    };

    if let Some(budget) = cli.budget_ms {
        config.supervisor.budget_ms = budget;
    }
    if let Some(poll) = cli.poll_ms {
        config.supervisor.poll_ms = poll;
    }
    if let Some(slice) = cli.slice_ms {
        config.supervisor.attempt_slice_ms = slice;
    }
    if let Some(isolation) = cli.isolation {
        config.supervisor.isolation = isolation;
    }
    if let Some(standoff) = cli.standoff {
        config.tactics.standoff = standoff;
    }

    config.validate()?;
    Ok(config)
}

fn cmd_run(config: AgentConfig) -> ExitCode {
    info!(
        isolation = ?config.supervisor.isolation,
        budget_ms = config.supervisor.budget_ms,
        poll_ms = config.supervisor.poll_ms,
        "Starting fleet agent"
    );

    match config.supervisor.isolation {
        Isolation::Process => match ProcessLauncher::current_exe() {
            Ok(launcher) => serve(config, launcher),
            Err(e) => {
                error!(error = %e, "Cannot locate own executable for worker processes");
                ExitCode::FAILURE
            }
        },
        Isolation::Thread => serve(config, ThreadLauncher::new()),
    }
}

fn serve<L: Launcher>(config: AgentConfig, launcher: L) -> ExitCode {
    let mut session = Session::new(config, launcher);
    let stdin = io::stdin();
    let stdout = io::stdout();
    match session.run(stdin.lock(), stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Transport failed");
            ExitCode::FAILURE
        }
    }
}

fn cmd_worker() -> ExitCode {
    let stdin = io::stdin();
    let stdout = io::stdout();
    match run_worker(stdin.lock(), stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Worker failed");
            ExitCode::FAILURE
        }
    }
}

fn cmd_profile(dir: &std::path::Path, config: &AgentConfig) -> ExitCode {
    let report = match profile_dir(dir, &config.tactics) {
        Ok(report) => report,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    for entry in &report.entries {
        println!(
            "{}: {:.3} ms ({} commands)",
            entry.file.display(),
            entry.elapsed.as_secs_f64() * 1000.0,
            entry.commands
        );
    }
    match report.slowest() {
        Some(worst) => println!(
            "Max time: {:.3} ms ({}) over {} snapshots",
            worst.elapsed.as_secs_f64() * 1000.0,
            worst.file.display(),
            report.entries.len()
        ),
        None => println!("No battle snapshots in {}", dir.display()),
    }
    ExitCode::SUCCESS
}
