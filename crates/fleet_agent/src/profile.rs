//! Offline timing of the decision pipeline.
//!
//! Every `*.json` file in a directory is decoded as one battle message
//! and decided once, from an empty lock. The slowest file tells how much
//! of the turn budget the pipeline really needs.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fleet_core::pipeline::DecisionPipeline;
use fleet_core::tactics::TacticsConfig;
use fleet_core::targeting::TargetLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::protocol::{Incoming, ProtocolError};

/// Error type for profiling runs.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// Directory or file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Offending path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A snapshot file did not decode.
    #[error("Failed to decode {path}: {source}")]
    Decode {
        /// Offending path.
        path: String,
        /// Underlying error.
        #[source]
        source: ProtocolError,
    },
}

/// Timing of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    /// Snapshot file.
    pub file: PathBuf,
    /// Time spent in `decide`.
    pub elapsed: Duration,
    /// Commands produced.
    pub commands: usize,
}

/// Timings for a whole directory, in file name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileReport {
    /// One entry per battle snapshot.
    pub entries: Vec<ProfileEntry>,
    /// Files skipped because they were not battle messages.
    pub skipped: Vec<PathBuf>,
}

impl ProfileReport {
    /// The slowest snapshot.
    #[must_use]
    pub fn slowest(&self) -> Option<&ProfileEntry> {
        self.entries.iter().max_by_key(|e| e.elapsed)
    }

    /// Sum of all timings.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.entries.iter().map(|e| e.elapsed).sum()
    }
}

/// Time the pipeline on every battle snapshot in `dir`.
pub fn profile_dir(dir: &Path, tactics: &TacticsConfig) -> Result<ProfileReport, ProfileError> {
    let read_err = |path: &Path| {
        let path = path.display().to_string();
        move |source| ProfileError::Read { path, source }
    };

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(read_err(dir))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let pipeline = DecisionPipeline::new(tactics.clone());
    let mut report = ProfileReport::default();

    for file in files {
        let text = std::fs::read_to_string(&file).map_err(read_err(file.as_path()))?;
        let snapshot = match Incoming::from_json(&text) {
            Ok(Incoming::Battle(snapshot)) => snapshot,
            Ok(other) => {
                warn!(file = %file.display(), kind = other.name(), "Skipping non-battle file");
                report.skipped.push(file);
                continue;
            }
            Err(source) => {
                return Err(ProfileError::Decode {
                    path: file.display().to_string(),
                    source,
                })
            }
        };

        let start = Instant::now();
        let decision = pipeline.decide(&snapshot, &TargetLock::empty());
        let elapsed = start.elapsed();
        debug!(file = %file.display(), elapsed_us = elapsed.as_secs_f64() * 1e6, "Profiled");

        report.entries.push(ProfileEntry {
            file,
            elapsed,
            commands: decision.output.commands().len(),
        });
    }

    Ok(report)
}
