//! The agent's side of one game.
//!
//! A session reads one server message per line and answers each with
//! exactly one line, flushed immediately. It owns everything that
//! outlives a turn: the configuration (adjusted by the draft), the target
//! lock from the last completed decision, and the supervisor with its
//! retry counter.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::time::Duration;

use fleet_core::commands::BattleOutput;
use fleet_core::draft::make_draft;
use fleet_core::snapshot::BattleSnapshot;
use fleet_core::targeting::TargetLock;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::protocol::{Incoming, Outgoing};
use crate::supervisor::{millis, retries_message, TurnReport, TurnSupervisor};
use crate::worker::{Launcher, TurnInput};

/// Running timing and outcome counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnStats {
    /// Battle turns answered.
    pub turns: u64,
    /// Turns answered with a completed decision.
    pub decided: u64,
    /// Turns answered with the fallback.
    pub timed_out: u64,
    /// Lines that could not be decoded.
    pub rejected: u64,
    /// Slowest decided turn and its wall-clock time.
    pub slowest: Option<(u64, Duration)>,
}

impl TurnStats {
    fn record(&mut self, turn: u64, report: &TurnReport) {
        self.turns += 1;
        if report.decision().is_none() {
            self.timed_out += 1;
            return;
        }
        self.decided += 1;
        if self.slowest.map_or(true, |(_, worst)| report.elapsed > worst) {
            self.slowest = Some((turn, report.elapsed));
        }
    }
}

/// One game's worth of agent state.
#[derive(Debug)]
pub struct Session<L> {
    config: AgentConfig,
    supervisor: TurnSupervisor<L>,
    lock: TargetLock,
    stats: TurnStats,
}

impl<L: Launcher> Session<L> {
    /// Start a session. The lock starts empty and the retry counter at 0.
    pub fn new(config: AgentConfig, launcher: L) -> Self {
        let supervisor = TurnSupervisor::new(launcher, &config.supervisor);
        Self {
            config,
            supervisor,
            lock: TargetLock::empty(),
            stats: TurnStats::default(),
        }
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Lock carried into the next turn.
    #[must_use]
    pub const fn lock(&self) -> &TargetLock {
        &self.lock
    }

    /// Session-wide retry counter.
    #[must_use]
    pub const fn retries(&self) -> u64 {
        self.supervisor.retries()
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> &TurnStats {
        &self.stats
    }

    /// Answer one input line. Always produces a response.
    pub fn handle_line(&mut self, line: &str) -> Outgoing {
        match Incoming::from_json(line) {
            Ok(Incoming::Draft(draft)) => {
                self.config.apply_draft(&draft);
                self.supervisor.reconfigure(&self.config.supervisor);
                info!(
                    player = draft.player_id,
                    map_size = self.config.tactics.map_size,
                    budget_ms = self.config.supervisor.budget_ms,
                    "Draft received"
                );
                make_draft(&draft).into()
            }
            Ok(Incoming::Battle(snapshot)) => self.battle_turn(snapshot).into(),
            Err(err) => self.reject(err),
        }
    }

    /// Status-only answer for a line that could not be used.
    fn reject(&mut self, reason: impl fmt::Display) -> Outgoing {
        self.stats.rejected += 1;
        warn!(error = %reason, "Rejected input line");
        BattleOutput::status(format!(
            "Bad input: {reason}. {}",
            retries_message(self.retries())
        ))
        .into()
    }

    fn battle_turn(&mut self, snapshot: BattleSnapshot) -> BattleOutput {
        let turn = self.stats.turns + 1;
        let input = TurnInput {
            tactics: self.config.tactics.clone(),
            snapshot,
            lock: self.lock,
        };

        let (output, report) = self.supervisor.respond(&input);
        if let Some(decision) = report.decision() {
            self.lock = decision.lock;
        }
        self.stats.record(turn, &report);

        if let Some((worst_turn, worst)) = self.stats.slowest {
            debug!(
                turn,
                elapsed_ms = millis(report.elapsed),
                max_ms = millis(worst),
                max_turn = worst_turn,
                retries = self.retries(),
                "Turn timing"
            );
        }
        output
    }

    /// Serve until `input` is exhausted, writing one flushed line per
    /// input line. Blank lines and lines that are not UTF-8 get a status
    /// answer like any other malformed input.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> io::Result<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => self.reject("empty line"),
                Ok(line) => self.handle_line(line.trim()),
                Err(err) => self.reject(format!("line is not UTF-8 ({err})")),
            };
            output.write_all(response.to_json_line().as_bytes())?;
            output.flush()?;
        }

        info!(
            turns = self.stats.turns,
            decided = self.stats.decided,
            timed_out = self.stats.timed_out,
            rejected = self.stats.rejected,
            retries = self.retries(),
            "Session finished"
        );
        Ok(())
    }
}
