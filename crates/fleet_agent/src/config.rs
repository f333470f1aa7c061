//! Agent configuration.
//!
//! Everything tunable lives in one [`AgentConfig`], loadable from a RON
//! file. Command-line flags override single values afterwards, and the
//! draft message overrides the map geometry for the session.
//!
//! ```ron
//! (
//!     tactics: (
//!         standoff: 6,
//!         hazard_footprint: Centered,
//!         bounds_margin: SideAware,
//!     ),
//!     supervisor: (
//!         budget_ms: 700,
//!         isolation: Thread,
//!     ),
//! )
//! ```

use std::path::Path;
use std::time::Duration;

use fleet_core::draft::DraftOptions;
use fleet_core::tactics::TacticsConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Error type for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Parsed, but the values make no sense.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// How each decision attempt is isolated from the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum Isolation {
    /// Re-run this binary as a child process per attempt.
    #[default]
    Process,
    /// Run the pipeline on a separate thread with a cancellation token.
    Thread,
}

/// Timing of the per-turn supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Hard ceiling on cumulative attempt time per turn.
    pub budget_ms: u64,
    /// Sleep between liveness polls.
    pub poll_ms: u64,
    /// An attempt older than this is killed and restarted.
    pub attempt_slice_ms: u64,
    /// Worker isolation mode.
    pub isolation: Isolation,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            budget_ms: 800,
            poll_ms: 100,
            attempt_slice_ms: 100,
            isolation: Isolation::Process,
        }
    }
}

impl SupervisorConfig {
    /// Per-turn budget.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    /// Poll interval.
    #[must_use]
    pub const fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    /// Attempt slice.
    #[must_use]
    pub const fn attempt_slice(&self) -> Duration {
        Duration::from_millis(self.attempt_slice_ms)
    }

    /// Keep the budget under the server's round timeout, leaving one poll
    /// interval to write the answer.
    ///
    /// A timeout shorter than two poll intervals shrinks the poll interval
    /// to a quarter of the timeout first, so some budget is left to decide.
    pub fn clamp_to_round_timeout(&mut self, timeout_ms: u64) {
        if self.poll_ms.saturating_mul(2) > timeout_ms {
            let poll = (timeout_ms / 4).max(1);
            info!(
                from = self.poll_ms,
                to = poll,
                "Shortening poll interval to fit round timeout"
            );
            self.poll_ms = poll;
        }

        let ceiling = timeout_ms.saturating_sub(self.poll_ms);
        if ceiling < self.budget_ms {
            info!(
                from = self.budget_ms,
                to = ceiling,
                "Clamping turn budget to round timeout"
            );
            self.budget_ms = ceiling;
        }

        if self.budget_ms == 0 {
            warn!(
                timeout_ms,
                "Round timeout leaves no decision budget, every turn will fall back"
            );
        }
    }

    /// Reject values the supervisor loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_ms == 0 {
            return Err(ConfigError::Invalid("poll_ms must be positive".into()));
        }
        if self.attempt_slice_ms == 0 {
            return Err(ConfigError::Invalid(
                "attempt_slice_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Complete agent configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Decision pipeline tuning.
    pub tactics: TacticsConfig,
    /// Deadline enforcement.
    pub supervisor: SupervisorConfig,
}

impl AgentConfig {
    /// Load a configuration from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = ron::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tactics.map_size <= 0 || self.tactics.ship_size < 0 {
            return Err(ConfigError::Invalid(format!(
                "map_size {} / ship_size {} out of range",
                self.tactics.map_size, self.tactics.ship_size
            )));
        }
        self.supervisor.validate()
    }

    /// Adopt the session parameters announced in the draft message.
    pub fn apply_draft(&mut self, draft: &DraftOptions) {
        if let Some(map_size) = draft.map_size {
            self.tactics.map_size = map_size;
        }
        self.tactics.side = draft.player_id;
        if let Some(timeout) = draft.battle_round_timeout {
            self.supervisor.clamp_to_round_timeout(timeout);
        }
    }
}
