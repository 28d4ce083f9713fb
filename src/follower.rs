//! Following one file through an external `tail -F` style process.
//!
//! A follower owns exactly one subprocess and its stdout for its whole
//! lifetime. Every exit path (end of stream, cancellation, read error)
//! goes through the same teardown: stop reading, ask the process to
//! terminate, reap it within a timeout, close the stream, then report
//! completion.

use crate::config::{FollowCommand, PATH_PLACEHOLDER};
use crate::error::{Error, Result};
use crate::handler::LineHandler;
use crate::reader::LineReader;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// How a follower finished.
#[derive(Debug)]
pub enum FollowOutcome {
    /// Stopped on request.
    Cancelled,
    /// The follow process closed its output on its own.
    Ended,
    /// The process could not be started or its output could not be read.
    Failed(Error),
}

impl FollowOutcome {
    pub fn was_cancelled(&self) -> bool {
        matches!(self, FollowOutcome::Cancelled)
    }
}

/// Starts followers that share one line handler and follow command.
#[derive(Clone)]
pub struct Follower {
    handler: Arc<dyn LineHandler>,
    command: FollowCommand,
    reap_timeout: Duration,
}

impl Follower {
    pub fn new(
        handler: Arc<dyn LineHandler>,
        command: FollowCommand,
        reap_timeout: Duration,
    ) -> Self {
        Self {
            handler,
            command,
            reap_timeout,
        }
    }

    /// Spawns a background task following `path`.
    pub fn spawn(&self, path: PathBuf) -> FollowerHandle {
        self.spawn_with(path, self.command.clone())
    }

    /// Like [`spawn`](Self::spawn), but starts at the current end of the file.
    ///
    /// Used when a follower is restarted on a path whose earlier lines were
    /// already delivered. See [`FollowCommand::resumed`].
    pub fn resume(&self, path: PathBuf) -> FollowerHandle {
        self.spawn_with(path, self.command.resumed())
    }

    fn spawn_with(&self, path: PathBuf, command: FollowCommand) -> FollowerHandle {
        let (stop_tx, stop_rx) = broadcast::channel(1);
        let task = tokio::spawn(follow(
            path.clone(),
            command,
            Arc::clone(&self.handler),
            self.reap_timeout,
            stop_rx,
        ));

        FollowerHandle {
            target_path: path,
            stop_tx,
            task,
        }
    }
}

/// The live state of one follow operation.
///
/// Shutdown is two-phase: [`request_stop`](Self::request_stop), then
/// [`stopped`](Self::stopped) to wait until the process has been reaped.
/// Dropping the handle also requests a stop.
pub struct FollowerHandle {
    target_path: PathBuf,
    stop_tx: broadcast::Sender<()>,
    task: JoinHandle<FollowOutcome>,
}

impl FollowerHandle {
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Asks the follower to stop after the line it is currently delivering.
    pub fn request_stop(&self) {
        // No receiver means the task has already returned.
        let _ = self.stop_tx.send(());
    }

    /// True once the follower has fully torn down.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the follower to finish without requesting a stop.
    pub async fn stopped(self) -> FollowOutcome {
        let Self { stop_tx, task, .. } = self;
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => FollowOutcome::Failed(Error::Task(e)),
        };
        drop(stop_tx);
        outcome
    }

    pub(crate) fn stop_sender(&self) -> broadcast::Sender<()> {
        self.stop_tx.clone()
    }
}

/// Build the command arguments, replacing `{path}` placeholders with the target path.
/// The path is appended when no argument mentions it.
fn build_args(command: &FollowCommand, path: &Path) -> Vec<String> {
    let path = path.to_string_lossy();
    let mut args: Vec<String> = command
        .args
        .iter()
        .map(|arg| arg.replace(PATH_PLACEHOLDER, &path))
        .collect();
    if !command.args.iter().any(|arg| arg.contains(PATH_PLACEHOLDER)) {
        args.push(path.into_owned());
    }
    args
}

fn spawn_process(command: &FollowCommand, path: &Path) -> Result<Child> {
    Command::new(&command.program)
        .args(build_args(command, path))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| Error::Spawn {
            program: command.program.clone(),
            source,
        })
}

async fn follow(
    path: PathBuf,
    command: FollowCommand,
    handler: Arc<dyn LineHandler>,
    reap_timeout: Duration,
    mut stop_rx: broadcast::Receiver<()>,
) -> FollowOutcome {
    let mut child = match spawn_process(&command, &path) {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to start follow process");
            return FollowOutcome::Failed(e);
        }
    };
    let pid = child.id();

    let Some(stdout) = child.stdout.take() else {
        tracing::warn!(path = %path.display(), ?pid, "follow process has no stdout");
        terminate(&mut child, reap_timeout).await;
        return FollowOutcome::Failed(Error::MissingStdout);
    };
    let stderr_task = child
        .stderr
        .take()
        .map(|stderr| tokio::spawn(drain_stderr(path.clone(), stderr)));

    tracing::info!(path = %path.display(), ?pid, "following log file");

    let mut lines = LineReader::new(stdout);
    let mut delivered = 0u64;
    let outcome = loop {
        tokio::select! {
            biased;

            // A closed channel means the handle was dropped.
            _ = stop_rx.recv() => break FollowOutcome::Cancelled,

            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    deliver(handler.as_ref(), line, &path).await;
                    delivered += 1;
                }
                Ok(None) => break FollowOutcome::Ended,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read follow output");
                    break FollowOutcome::Failed(e.into());
                }
            },
        }
    };

    terminate(&mut child, reap_timeout).await;
    drop(lines);
    if let Some(task) = stderr_task {
        task.abort();
    }

    tracing::info!(
        path = %path.display(),
        ?pid,
        delivered,
        cancelled = outcome.was_cancelled(),
        "follower stopped"
    );
    outcome
}

/// Hands one line to the handler. Errors and panics are logged, never propagated.
async fn deliver(handler: &dyn LineHandler, line: String, path: &Path) {
    let result = AssertUnwindSafe(async move { handler.handle(line).await })
        .catch_unwind()
        .await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(path = %path.display(), error = %e, "line handler failed");
        }
        Err(_) => {
            tracing::error!(path = %path.display(), "line handler panicked");
        }
    }
}

async fn drain_stderr(path: PathBuf, stderr: ChildStderr) {
    let mut lines = LineReader::new(stderr);
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(path = %path.display(), "follow process: {line}");
    }
}

/// Terminates and reaps the child. Never fails: a process that is already
/// gone, or that cannot be reaped, is logged and treated as reaped.
async fn terminate(child: &mut Child, reap_timeout: Duration) {
    match child.try_wait() {
        Ok(Some(status)) => {
            tracing::debug!(?status, "follow process already exited");
            return;
        }
        Ok(None) => {}
        Err(e) => tracing::debug!(error = %e, "could not poll follow process"),
    }

    request_termination(child);

    match tokio::time::timeout(reap_timeout, child.wait()).await {
        Ok(Ok(status)) => tracing::debug!(?status, "follow process reaped"),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "failed to wait for follow process; treating as reaped");
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = reap_timeout.as_millis() as u64,
                "follow process ignored termination; killing"
            );
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "failed to kill follow process; treating as reaped");
            }
        }
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    let Some(pid) = child.id() else {
        tracing::debug!("follow process already reaped");
        return;
    };
    if !send_sigterm(pid) {
        let _ = child.start_kill();
    }
}

/// Sends SIGTERM to `pid`. Returns false only when the pid cannot be signalled
/// at all; a process that has already exited counts as signalled.
#[cfg(unix)]
fn send_sigterm(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => true,
        Err(Errno::ESRCH) => {
            tracing::debug!(pid, "follow process already gone");
            true
        }
        Err(e) => {
            tracing::warn!(pid, error = %e, "failed to signal follow process");
            true
        }
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::debug!(error = %e, "follow process already gone");
    }
}
