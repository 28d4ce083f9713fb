//! Following whichever matching log file is newest.
//!
//! A [`RotationWatcher`] rescans a directory on a fixed interval and keeps
//! exactly one follower pointed at the newest file matching its pattern.
//! A replacement follower is never started before the previous one has
//! completed its teardown, so two followers never deliver lines at once.

use crate::config::WatchSettings;
use crate::error::Result;
use crate::follower::{FollowOutcome, Follower, FollowerHandle};
use crate::handler::LineHandler;
use crate::scan;
use crate::watcher::DirectoryEvents;
use glob::Pattern;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// What to follow and where each line goes.
#[derive(Clone)]
pub struct MonitorSpec {
    pub directory: PathBuf,
    /// A literal file name, or a glob using `*`, `?` and `[...]`.
    pub name_pattern: String,
    pub on_line: Arc<dyn LineHandler>,
}

impl MonitorSpec {
    pub fn new(
        directory: impl Into<PathBuf>,
        name_pattern: impl Into<String>,
        on_line: impl LineHandler,
    ) -> Self {
        Self {
            directory: directory.into(),
            name_pattern: name_pattern.into(),
            on_line: Arc::new(on_line),
        }
    }
}

/// Lifecycle notifications, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A directory scan finished; `selected` is the newest matching file.
    Scanned { selected: Option<PathBuf> },
    FollowerStarted { path: PathBuf },
    StopRequested { path: PathBuf },
    /// A stopping follower is still tearing down after another grace period.
    StopOverdue { path: PathBuf },
    /// A follower completed its teardown.
    FollowerStopped { path: PathBuf, cancelled: bool },
}

#[derive(Default)]
struct WatchState {
    current_target: Option<PathBuf>,
    current: Option<FollowerHandle>,
}

/// Keeps one follower on the newest file matching a pattern.
pub struct RotationWatcher {
    spec: MonitorSpec,
    pattern: Pattern,
    settings: WatchSettings,
    follower: Follower,
    events: Option<mpsc::UnboundedSender<WatchEvent>>,
    state: WatchState,
}

impl RotationWatcher {
    /// Fails only if `name_pattern` is not a valid glob.
    pub fn new(spec: MonitorSpec, settings: WatchSettings) -> Result<Self> {
        let pattern = Pattern::new(&spec.name_pattern)?;
        let follower = Follower::new(
            Arc::clone(&spec.on_line),
            settings.command.clone(),
            settings.reap_timeout(),
        );

        Ok(Self {
            spec,
            pattern,
            settings,
            follower,
            events: None,
            state: WatchState::default(),
        })
    }

    /// Reports lifecycle events to `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<WatchEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Watches until the process exits.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Watches until `shutdown` resolves, then stops the active follower and
    /// waits for it.
    ///
    /// A pattern without wildcards names one fixed file: a single follower is
    /// started and this returns when it ends.
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if !scan::has_wildcards(&self.spec.name_pattern) {
            self.follow_literal(shutdown).await;
            return;
        }

        let mut wakeups = self.directory_events();
        loop {
            self.scan_once().await;

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.settings.poll_interval()) => {}
                _ = next_wakeup(&mut wakeups) => {
                    tracing::debug!(directory = %self.spec.directory.display(), "directory changed; rescanning");
                }
            }
        }

        self.retire_current().await;
        tracing::info!(directory = %self.spec.directory.display(), pattern = %self.spec.name_pattern, "rotation watcher stopped");
    }

    async fn follow_literal<F>(mut self, shutdown: std::pin::Pin<&mut F>)
    where
        F: Future<Output = ()>,
    {
        let path = self.spec.directory.join(&self.spec.name_pattern);
        tracing::info!(path = %path.display(), "pattern has no wildcards; following fixed file");

        let handle = self.start(path.clone(), false);
        let stop_tx = handle.stop_sender();
        let stopped = handle.stopped();
        tokio::pin!(stopped);

        let outcome = tokio::select! {
            outcome = &mut stopped => outcome,
            _ = shutdown => {
                let _ = stop_tx.send(());
                self.emit(WatchEvent::StopRequested { path: path.clone() });
                stopped.await
            }
        };
        self.finish(path, &outcome);
        self.state.current_target = None;
    }

    /// One pass of scan, select, compare and swap.
    async fn scan_once(&mut self) {
        let selected = match scan::newest_match(&self.spec.directory, &self.pattern).await {
            Ok(selected) => selected,
            Err(e) => {
                tracing::warn!(directory = %self.spec.directory.display(), error = %e, "failed to scan log directory");
                None
            }
        };
        self.emit(WatchEvent::Scanned {
            selected: selected.clone(),
        });

        let Some(newest) = selected else {
            tracing::info!(
                directory = %self.spec.directory.display(),
                pattern = %self.spec.name_pattern,
                "no matching log file; waiting for a fresh one"
            );
            return;
        };

        if self.state.current_target.as_ref() == Some(&newest) {
            let ended = self.state.current.as_ref().is_none_or(|h| h.is_finished());
            if ended && self.settings.restart_ended {
                tracing::info!(path = %newest.display(), "follower ended on its own; resuming at end of file");
                self.retire_current().await;
                self.state.current = Some(self.start(newest, true));
            }
            return;
        }

        tracing::info!(
            path = %newest.display(),
            previous = ?self.state.current_target,
            "new log file detected"
        );
        self.retire_current().await;
        self.state.current = Some(self.start(newest, false));
    }

    /// Spawns a follower and records `path` as the current target.
    ///
    /// With `resume` the follower skips the lines already in the file.
    fn start(&mut self, path: PathBuf, resume: bool) -> FollowerHandle {
        let handle = if resume {
            self.follower.resume(path.clone())
        } else {
            self.follower.spawn(path.clone())
        };
        self.emit(WatchEvent::FollowerStarted { path: path.clone() });
        self.state.current_target = Some(path);
        handle
    }

    /// Cancels the active follower and waits for its teardown, warning every
    /// grace period while it is still pending.
    async fn retire_current(&mut self) {
        let Some(handle) = self.state.current.take() else {
            return;
        };
        let path = handle.target_path().to_path_buf();

        if !handle.is_finished() {
            handle.request_stop();
            self.emit(WatchEvent::StopRequested { path: path.clone() });
        }

        let started = tokio::time::Instant::now();
        let stopped = handle.stopped();
        tokio::pin!(stopped);
        let outcome = loop {
            tokio::select! {
                outcome = &mut stopped => break outcome,
                _ = tokio::time::sleep(self.settings.stop_grace()) => {
                    tracing::warn!(
                        path = %path.display(),
                        waited_ms = started.elapsed().as_millis() as u64,
                        "still waiting for follower to stop"
                    );
                    self.emit(WatchEvent::StopOverdue { path: path.clone() });
                }
            }
        };
        self.finish(path, &outcome);
    }

    fn finish(&self, path: PathBuf, outcome: &FollowOutcome) {
        if let FollowOutcome::Failed(e) = outcome {
            tracing::warn!(path = %path.display(), error = %e, "follower failed");
        }
        self.emit(WatchEvent::FollowerStopped {
            path,
            cancelled: outcome.was_cancelled(),
        });
    }

    fn emit(&self, event: WatchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn directory_events(&self) -> Option<DirectoryEvents> {
        if !self.settings.use_notify {
            return None;
        }
        match DirectoryEvents::start(&self.spec.directory) {
            Ok(events) => Some(events),
            Err(e) => {
                tracing::warn!(
                    directory = %self.spec.directory.display(),
                    error = %e,
                    "directory notifications unavailable; polling only"
                );
                None
            }
        }
    }
}

async fn next_wakeup(events: &mut Option<DirectoryEvents>) {
    match events {
        Some(events) => events.next_rotation().await,
        None => std::future::pending().await,
    }
}
