//! Isolated execution of one decision attempt.
//!
//! The supervisor never runs the pipeline itself. It asks a [`Launcher`]
//! for an [`Attempt`], polls it, and terminates it when it is done or out
//! of time. Two launchers exist:
//!
//! - [`ProcessLauncher`] re-executes this binary with the hidden `worker`
//!   subcommand, writes the [`TurnInput`] as one JSON line to its stdin and
//!   reads the [`TurnDecision`] back from stdout. Termination kills and
//!   reaps the child.
//! - [`ThreadLauncher`] runs the pipeline on its own thread. Termination
//!   raises a [`CancelToken`], waits up to [`THREAD_STOP_GRACE`] for the
//!   thread to finish and drops the result channel, so a late result goes
//!   nowhere.
//!
//! Either way each attempt owns its own copy of the input, and only a
//! completed attempt's output is ever seen by the supervisor.

use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use fleet_core::pipeline::{DecisionPipeline, TurnDecision};
use fleet_core::snapshot::BattleSnapshot;
use fleet_core::tactics::TacticsConfig;
use fleet_core::targeting::TargetLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::supervisor::millis;

/// Error type for worker attempts.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Could not start the worker.
    #[error("Failed to start worker: {0}")]
    Spawn(#[source] io::Error),
    /// Reading from or writing to the worker failed.
    #[error("Worker pipe failed: {0}")]
    Pipe(#[from] io::Error),
    /// Worker process ended with a failure status.
    #[error("Worker exited with {0}")]
    Exited(String),
    /// Worker output could not be decoded, or input could not be encoded.
    #[error("Worker payload invalid: {0}")]
    Payload(#[from] serde_json::Error),
    /// Worker went away without producing a result.
    #[error("Worker ended without a result")]
    Disconnected,
}

/// Everything one attempt needs, handed over by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnInput {
    /// Pipeline tuning for this session.
    pub tactics: TacticsConfig,
    /// This turn's battle state.
    pub snapshot: BattleSnapshot,
    /// Lock carried over from the last completed turn.
    pub lock: TargetLock,
}

/// Observed state of a running attempt.
#[derive(Debug)]
pub enum AttemptStatus {
    /// Still working.
    Pending,
    /// Finished cleanly.
    Done(Box<TurnDecision>),
    /// Ended without a usable result.
    Failed(WorkerError),
}

/// One live decision attempt.
pub trait Attempt: Send {
    /// Non-blocking check for a result.
    fn poll(&mut self) -> AttemptStatus;

    /// Stop the attempt and release its resources. Returns once the worker
    /// can no longer affect anything.
    fn terminate(self: Box<Self>);
}

/// Starts attempts.
pub trait Launcher {
    /// Start a fresh attempt on its own copy of `input`.
    fn launch(&self, input: &TurnInput) -> Result<Box<dyn Attempt>, WorkerError>;
}

// ============================================================================
// Process isolation
// ============================================================================

/// Runs each attempt in a child process.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessLauncher {
    /// Launch `program` with `args`; the child must speak the worker
    /// protocol of [`run_worker`].
    pub fn new<I, A>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Re-execute the running binary with the `worker` subcommand.
    pub fn current_exe() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, ["worker"]))
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, input: &TurnInput) -> Result<Box<dyn Attempt>, WorkerError> {
        let mut line = serde_json::to_string(input)?;
        line.push('\n');

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(WorkerError::Spawn)?;
        trace!(pid = child.id(), "Worker process started");

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            reap(&mut child);
            return Err(WorkerError::Disconnected);
        };
        spawn_writer(stdin, line);

        Ok(Box::new(ProcessAttempt {
            child,
            output: spawn_reader(stdout),
        }))
    }
}

struct ProcessAttempt {
    child: Child,
    output: Receiver<io::Result<String>>,
}

impl Attempt for ProcessAttempt {
    fn poll(&mut self) -> AttemptStatus {
        match self.output.try_recv() {
            Ok(Ok(line)) if line.trim().is_empty() => {
                return AttemptStatus::Failed(self.exit_error());
            }
            Ok(Ok(line)) => {
                return match serde_json::from_str(&line) {
                    Ok(decision) => AttemptStatus::Done(Box::new(decision)),
                    Err(e) => AttemptStatus::Failed(e.into()),
                };
            }
            Ok(Err(e)) => return AttemptStatus::Failed(e.into()),
            Err(TryRecvError::Disconnected) => {
                return AttemptStatus::Failed(WorkerError::Disconnected);
            }
            Err(TryRecvError::Empty) => {}
        }

        match self.child.try_wait() {
            Ok(Some(status)) if !status.success() => {
                AttemptStatus::Failed(WorkerError::Exited(status.to_string()))
            }
            Ok(_) => AttemptStatus::Pending,
            Err(e) => AttemptStatus::Failed(e.into()),
        }
    }

    fn terminate(mut self: Box<Self>) {
        reap(&mut self.child);
    }
}

impl ProcessAttempt {
    fn exit_error(&mut self) -> WorkerError {
        match self.child.try_wait() {
            Ok(Some(status)) if !status.success() => WorkerError::Exited(status.to_string()),
            _ => WorkerError::Disconnected,
        }
    }
}

/// Feed the request on its own thread so a child that never reads cannot
/// stall the supervisor on a full pipe.
fn spawn_writer(mut stdin: ChildStdin, line: String) {
    thread::spawn(move || {
        if let Err(e) = stdin.write_all(line.as_bytes()).and_then(|()| stdin.flush()) {
            // The reader side reports the failed attempt.
            debug!(error = %e, "Failed to send turn input to worker");
        }
    });
}

fn spawn_reader(stdout: ChildStdout) -> Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        let result = BufReader::new(stdout).read_line(&mut line).map(|_| line);
        // Receiver is gone when the attempt was already terminated.
        let _ = tx.send(result);
    });
    rx
}

fn reap(child: &mut Child) {
    // Kill fails when the child has already exited, which is fine.
    let _ = child.kill();
    match child.wait() {
        Ok(status) => trace!(pid = child.id(), %status, "Worker process reaped"),
        Err(e) => debug!(pid = child.id(), error = %e, "Failed to reap worker process"),
    }
}

// ============================================================================
// Thread isolation
// ============================================================================

/// Cooperative cancellation flag shared with a worker thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the worker to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How long terminating a thread attempt waits for the thread to notice
/// its cancelled token before detaching it.
pub const THREAD_STOP_GRACE: Duration = Duration::from_millis(50);

/// The function a thread attempt runs. Returns `None` when cancelled.
pub type TurnFn = Arc<dyn Fn(&TurnInput, &CancelToken) -> Option<TurnDecision> + Send + Sync>;

/// Runs each attempt on its own thread.
#[derive(Clone)]
pub struct ThreadLauncher {
    turn: TurnFn,
}

impl std::fmt::Debug for ThreadLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadLauncher").finish_non_exhaustive()
    }
}

impl Default for ThreadLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadLauncher {
    /// Run the decision pipeline, checking the token between ships.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fn(|input, token| {
            DecisionPipeline::new(input.tactics.clone()).decide_until(
                &input.snapshot,
                &input.lock,
                || token.is_cancelled(),
            )
        })
    }

    /// Run an arbitrary decision function.
    pub fn with_fn<F>(turn: F) -> Self
    where
        F: Fn(&TurnInput, &CancelToken) -> Option<TurnDecision> + Send + Sync + 'static,
    {
        Self {
            turn: Arc::new(turn),
        }
    }
}

impl Launcher for ThreadLauncher {
    fn launch(&self, input: &TurnInput) -> Result<Box<dyn Attempt>, WorkerError> {
        let (tx, rx) = mpsc::channel();
        let token = CancelToken::new();
        let worker_token = token.clone();
        let input = input.clone();
        let turn = Arc::clone(&self.turn);

        let handle = thread::Builder::new()
            .name("turn-worker".into())
            .spawn(move || {
                if let Some(decision) = turn(&input, &worker_token) {
                    // Receiver is gone when the attempt was terminated.
                    let _ = tx.send(decision);
                }
            })
            .map_err(WorkerError::Spawn)?;

        Ok(Box::new(ThreadAttempt {
            result: rx,
            token,
            handle,
        }))
    }
}

struct ThreadAttempt {
    result: Receiver<TurnDecision>,
    token: CancelToken,
    handle: JoinHandle<()>,
}

impl Attempt for ThreadAttempt {
    fn poll(&mut self) -> AttemptStatus {
        match self.result.try_recv() {
            Ok(decision) => AttemptStatus::Done(Box::new(decision)),
            Err(TryRecvError::Empty) => AttemptStatus::Pending,
            Err(TryRecvError::Disconnected) => AttemptStatus::Failed(WorkerError::Disconnected),
        }
    }

    fn terminate(self: Box<Self>) {
        self.token.cancel();
        let deadline = Instant::now() + THREAD_STOP_GRACE;
        while !self.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        if self.handle.is_finished() {
            // A panic was already reported through the dropped channel.
            let _ = self.handle.join();
        } else {
            warn!(
                grace_ms = millis(THREAD_STOP_GRACE),
                "Cancelled worker thread still running, detaching it"
            );
        }
    }
}

// ============================================================================
// Worker side
// ============================================================================

/// Body of the `worker` subcommand: read one [`TurnInput`] line, decide,
/// write one [`TurnDecision`] line.
pub fn run_worker<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<(), WorkerError> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(WorkerError::Disconnected);
    }
    let request: TurnInput = serde_json::from_str(&line)?;
    let decision =
        DecisionPipeline::new(request.tactics).decide(&request.snapshot, &request.lock);

    serde_json::to_writer(&mut output, &decision)?;
    output.write_all(b"\n")?;
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::math::Vector;
    use fleet_core::snapshot::Ship;

    fn input() -> TurnInput {
        let mut enemy = Ship::new(100, Vector::new(15, 10, 10));
        enemy.health = Some(10);
        TurnInput {
            tactics: TacticsConfig::default(),
            snapshot: BattleSnapshot {
                fire_infos: vec![],
                my: vec![Ship::new(1, Vector::new(10, 10, 10))],
                opponent: vec![enemy],
            },
            lock: TargetLock::empty(),
        }
    }

    fn wait_for(attempt: &mut dyn Attempt) -> AttemptStatus {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match attempt.poll() {
                AttemptStatus::Pending if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(5));
                }
                status => return status,
            }
        }
    }

    #[test]
    fn test_worker_protocol_round_trip() {
        let request = serde_json::to_string(&input()).unwrap() + "\n";
        let mut out = Vec::new();
        run_worker(request.as_bytes(), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        let decision: TurnDecision = serde_json::from_str(&text).unwrap();
        assert_eq!(decision.lock.id(), Some(100));
    }

    #[test]
    fn test_worker_rejects_empty_input() {
        let mut out = Vec::new();
        assert!(matches!(
            run_worker(&b""[..], &mut out),
            Err(WorkerError::Disconnected)
        ));
        assert!(matches!(
            run_worker(&b"{oops\n"[..], &mut out),
            Err(WorkerError::Payload(_))
        ));
    }

    #[test]
    fn test_thread_attempt_completes() {
        let mut attempt = ThreadLauncher::new().launch(&input()).unwrap();
        match wait_for(attempt.as_mut()) {
            AttemptStatus::Done(decision) => assert_eq!(decision.lock.id(), Some(100)),
            other => panic!("expected a decision, got {other:?}"),
        }
        attempt.terminate();
    }

    #[test]
    fn test_terminate_waits_for_cancelled_thread() {
        let seen = CancelToken::new();
        let observer = seen.clone();
        let launcher = ThreadLauncher::with_fn(move |_, token| {
            while !token.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            observer.cancel();
            None
        });

        let mut attempt = launcher.launch(&input()).unwrap();
        assert!(matches!(attempt.poll(), AttemptStatus::Pending));
        attempt.terminate();
        assert!(seen.is_cancelled());
    }

    #[test]
    fn test_terminate_gives_up_on_stuck_thread() {
        let release = CancelToken::new();
        let stuck = release.clone();
        let launcher = ThreadLauncher::with_fn(move |_, _| {
            while !stuck.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            None
        });

        let attempt = launcher.launch(&input()).unwrap();
        let started = Instant::now();
        attempt.terminate();
        let waited = started.elapsed();
        release.cancel();

        assert!(waited >= THREAD_STOP_GRACE);
        assert!(waited < THREAD_STOP_GRACE + Duration::from_secs(1));
    }

    #[test]
    fn test_panicking_thread_reports_failure() {
        let launcher = ThreadLauncher::with_fn(|_, _| panic!("boom"));
        let mut attempt = launcher.launch(&input()).unwrap();
        assert!(matches!(
            wait_for(attempt.as_mut()),
            AttemptStatus::Failed(WorkerError::Disconnected)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_does_not_block_on_unread_stdin() {
        // Several megabytes of input against a child that never reads it.
        let mut big = input();
        big.snapshot.opponent = (0..50_000)
            .map(|id| Ship::new(id, Vector::new(1, 1, 1)))
            .collect();
        let launcher = ProcessLauncher::new("sleep", ["30"]);

        let started = Instant::now();
        let mut attempt = launcher.launch(&big).unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(matches!(attempt.poll(), AttemptStatus::Pending));
        attempt.terminate();
    }

    #[test]
    fn test_missing_program_fails_to_spawn() {
        let launcher = ProcessLauncher::new("/definitely/not/a/program", ["worker"]);
        assert!(matches!(
            launcher.launch(&input()),
            Err(WorkerError::Spawn(_))
        ));
    }
}
