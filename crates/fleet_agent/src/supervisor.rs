//! Deadline enforcement for one turn.
//!
//! The supervisor runs the decision as an isolated attempt and polls it
//! every `poll` interval:
//!
//! ```text
//!             launch                 result
//!   Idle ──────────────► Attempting ───────────► Succeeded
//!                          │    ▲
//!          slice expired / │    │ relaunch
//!          worker failed   ▼    │
//!                        Killed ─► Restarted
//!
//!   budget spent while Attempting ──────────────► TimedOutFinal
//! ```
//!
//! Restarts recompute from the same [`TurnInput`]; nothing from a killed
//! attempt survives. The retry counter covers the whole session.

use std::thread;
use std::time::{Duration, Instant};

use fleet_core::commands::BattleOutput;
use fleet_core::pipeline::TurnDecision;
use tracing::{debug, info, warn};

use crate::config::SupervisorConfig;
use crate::worker::{Attempt, AttemptStatus, Launcher, TurnInput};

/// Supervisor state within one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Nothing started yet.
    Idle,
    /// An attempt is live.
    Attempting,
    /// The live attempt was terminated early.
    Killed,
    /// A replacement attempt is about to start.
    Restarted,
    /// An attempt finished; its output is the turn's answer.
    Succeeded,
    /// Budget spent without a result.
    TimedOutFinal,
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A completed decision.
    Decided(Box<TurnDecision>),
    /// No attempt finished within the budget.
    TimedOut,
}

/// Everything observed while supervising one turn.
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// Result.
    pub outcome: TurnOutcome,
    /// Attempts killed and restarted during this turn.
    pub restarts: u64,
    /// Wall-clock time spent in [`TurnSupervisor::run_turn`].
    pub elapsed: Duration,
    /// Every state entered, in order.
    pub states: Vec<TurnState>,
}

impl TurnReport {
    /// The decision, if one completed.
    #[must_use]
    pub fn decision(&self) -> Option<&TurnDecision> {
        match &self.outcome {
            TurnOutcome::Decided(decision) => Some(decision.as_ref()),
            TurnOutcome::TimedOut => None,
        }
    }
}

/// Status line carried by every battle response.
#[must_use]
pub fn retries_message(retries: u64) -> String {
    format!("Total retries count: {retries}")
}

/// The degraded answer when no attempt finished in time.
#[must_use]
pub fn fallback_output(retries: u64) -> BattleOutput {
    BattleOutput {
        message: Some(format!("Oh no, out of time. {}", retries_message(retries))),
        user_commands: Some(Vec::new()),
    }
}

/// Runs decisions under a hard per-turn deadline.
#[derive(Debug)]
pub struct TurnSupervisor<L> {
    launcher: L,
    budget: Duration,
    poll: Duration,
    slice: Duration,
    retries: u64,
}

impl<L: Launcher> TurnSupervisor<L> {
    /// Create a supervisor with a zero retry counter.
    pub fn new(launcher: L, config: &SupervisorConfig) -> Self {
        Self {
            launcher,
            budget: config.budget(),
            poll: config.poll(),
            slice: config.attempt_slice(),
            retries: 0,
        }
    }

    /// Session-wide count of killed-and-restarted attempts.
    #[must_use]
    pub const fn retries(&self) -> u64 {
        self.retries
    }

    /// Per-turn budget in effect.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        self.budget
    }

    /// Change the timing, e.g. after the draft announced the round timeout.
    pub fn reconfigure(&mut self, config: &SupervisorConfig) {
        self.budget = config.budget();
        self.poll = config.poll();
        self.slice = config.attempt_slice();
    }

    /// Supervise one turn. Returns within roughly `budget + poll`.
    pub fn run_turn(&mut self, input: &TurnInput) -> TurnReport {
        let mut run = TurnRun::new();
        let mut live: Option<(Box<dyn Attempt>, Instant)> = None;

        let outcome = loop {
            let (mut attempt, launched) = match live.take() {
                Some(live) => live,
                None => match self.launcher.launch(input) {
                    Ok(attempt) => {
                        run.enter(TurnState::Attempting);
                        (attempt, Instant::now())
                    }
                    Err(err) => {
                        warn!(error = %err, "Failed to launch decision attempt");
                        if run.started.elapsed() >= self.budget {
                            run.enter(TurnState::TimedOutFinal);
                            break TurnOutcome::TimedOut;
                        }
                        self.pause(&run);
                        continue;
                    }
                },
            };

            self.pause(&run);

            match attempt.poll() {
                AttemptStatus::Done(decision) => {
                    attempt.terminate();
                    run.enter(TurnState::Succeeded);
                    break TurnOutcome::Decided(decision);
                }
                AttemptStatus::Failed(err) => {
                    warn!(error = %err, "Decision attempt failed");
                    if run.started.elapsed() >= self.budget {
                        attempt.terminate();
                        run.enter(TurnState::TimedOutFinal);
                        break TurnOutcome::TimedOut;
                    }
                    self.restart(&mut run, attempt);
                }
                AttemptStatus::Pending => {
                    if run.started.elapsed() >= self.budget {
                        attempt.terminate();
                        run.enter(TurnState::TimedOutFinal);
                        break TurnOutcome::TimedOut;
                    }
                    if launched.elapsed() >= self.slice {
                        debug!(age_ms = millis(launched.elapsed()), "Attempt slice expired");
                        self.restart(&mut run, attempt);
                    } else {
                        live = Some((attempt, launched));
                    }
                }
            }
        };

        let elapsed = run.started.elapsed();
        match &outcome {
            TurnOutcome::Decided(_) => debug!(
                elapsed_ms = millis(elapsed),
                restarts = run.restarts,
                "Turn decided"
            ),
            TurnOutcome::TimedOut => warn!(
                elapsed_ms = millis(elapsed),
                restarts = run.restarts,
                retries = self.retries,
                "Turn budget exhausted, sending fallback"
            ),
        }

        TurnReport {
            outcome,
            restarts: run.restarts,
            elapsed,
            states: run.states,
        }
    }

    /// Supervise one turn and render the response line content.
    pub fn respond(&mut self, input: &TurnInput) -> (BattleOutput, TurnReport) {
        let report = self.run_turn(input);
        let output = match report.decision() {
            Some(decision) => {
                let mut output = decision.output.clone();
                output.message = Some(retries_message(self.retries));
                output
            }
            None => fallback_output(self.retries),
        };
        (output, report)
    }

    fn restart(&mut self, run: &mut TurnRun, attempt: Box<dyn Attempt>) {
        attempt.terminate();
        run.enter(TurnState::Killed);
        run.restarts += 1;
        self.retries += 1;
        run.enter(TurnState::Restarted);
        info!(retries = self.retries, "Restarting decision attempt");
    }

    /// Sleep one poll interval, never past the budget.
    fn pause(&self, run: &TurnRun) {
        let remaining = self.budget.saturating_sub(run.started.elapsed());
        let nap = self.poll.min(remaining);
        if !nap.is_zero() {
            thread::sleep(nap);
        }
    }
}

/// Whole milliseconds, saturating.
#[must_use]
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

struct TurnRun {
    started: Instant,
    restarts: u64,
    states: Vec<TurnState>,
}

impl TurnRun {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            restarts: 0,
            states: vec![TurnState::Idle],
        }
    }

    fn enter(&mut self, state: TurnState) {
        debug!(from = ?self.states.last(), to = ?state, "Supervisor transition");
        self.states.push(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{CancelToken, ThreadLauncher};
    use fleet_core::math::Vector;
    use fleet_core::snapshot::{BattleSnapshot, Ship};
    use fleet_core::tactics::TacticsConfig;
    use fleet_core::targeting::TargetLock;

    fn input() -> TurnInput {
        TurnInput {
            tactics: TacticsConfig::default(),
            snapshot: BattleSnapshot {
                fire_infos: vec![],
                my: vec![Ship::new(1, Vector::new(10, 10, 10))],
                opponent: vec![Ship::new(100, Vector::new(14, 10, 10))],
            },
            lock: TargetLock::empty(),
        }
    }

    fn config(budget_ms: u64, poll_ms: u64) -> SupervisorConfig {
        SupervisorConfig {
            budget_ms,
            poll_ms,
            attempt_slice_ms: poll_ms,
            ..SupervisorConfig::default()
        }
    }

    fn never_finishes() -> ThreadLauncher {
        ThreadLauncher::with_fn(|_, token: &CancelToken| {
            while !token.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            None
        })
    }

    #[test]
    fn test_fast_decision_succeeds_first_try() {
        let mut supervisor = TurnSupervisor::new(ThreadLauncher::new(), &config(500, 20));
        let report = supervisor.run_turn(&input());
        assert_eq!(report.decision().and_then(|d| d.lock.id()), Some(100));
        assert_eq!(report.restarts, 0);
        assert_eq!(
            report.states,
            vec![TurnState::Idle, TurnState::Attempting, TurnState::Succeeded]
        );
    }

    #[test]
    fn test_stuck_decision_times_out() {
        let mut supervisor = TurnSupervisor::new(never_finishes(), &config(100, 20));
        let report = supervisor.run_turn(&input());
        assert_eq!(report.outcome, TurnOutcome::TimedOut);
        assert!(report.restarts >= 1);
        assert_eq!(supervisor.retries(), report.restarts);
        assert_eq!(report.states.last(), Some(&TurnState::TimedOutFinal));
    }

    #[test]
    fn test_restart_path_through_states() {
        let mut supervisor = TurnSupervisor::new(never_finishes(), &config(100, 20));
        let report = supervisor.run_turn(&input());
        let window = [
            TurnState::Attempting,
            TurnState::Killed,
            TurnState::Restarted,
            TurnState::Attempting,
        ];
        assert!(report.states.windows(4).any(|w| w == window));
    }

    #[test]
    fn test_fallback_output_shape() {
        let json = serde_json::to_string(&fallback_output(3)).unwrap();
        assert_eq!(
            json,
            r#"{"Message":"Oh no, out of time. Total retries count: 3","UserCommands":[]}"#
        );
    }

    #[test]
    fn test_respond_reports_retries() {
        let mut supervisor = TurnSupervisor::new(ThreadLauncher::new(), &config(500, 10));
        let (output, _) = supervisor.respond(&input());
        assert_eq!(output.message.as_deref(), Some("Total retries count: 0"));
    }
}
