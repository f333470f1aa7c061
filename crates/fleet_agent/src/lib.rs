//! Contest agent for the fleet battle game.
//!
//! This crate wraps the deterministic [`fleet_core`] pipeline in
//! everything needed to play a real game:
//!
//! - **Transport**: one JSON object per line on stdin, one answer per
//!   line on stdout, logs on stderr
//! - **Deadline enforcement**: every decision runs as an isolated attempt
//!   that is killed and restarted when slow, with a fallback answer when
//!   the turn budget runs out
//! - **Profiling**: offline timing of recorded snapshots
//!
//! # Example
//!
//! ```bash
//! # Play, reading the game from stdin
//! cargo run -p fleet_agent --release
//!
//! # Play with a tuned configuration and in-process workers
//! cargo run -p fleet_agent -- --config agent.ron --isolation thread
//!
//! # Time the pipeline on recorded snapshots
//! cargo run -p fleet_agent -- profile --dir snapshots/
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod profile;
pub mod protocol;
pub mod session;
pub mod supervisor;
pub mod worker;

pub use config::{AgentConfig, ConfigError, Isolation, SupervisorConfig};
pub use profile::{profile_dir, ProfileReport};
pub use protocol::{Incoming, Outgoing, ProtocolError};
pub use session::{Session, TurnStats};
pub use supervisor::{TurnOutcome, TurnReport, TurnState, TurnSupervisor};
pub use worker::{
    run_worker, CancelToken, Launcher, ProcessLauncher, ThreadLauncher, TurnInput, WorkerError,
};
