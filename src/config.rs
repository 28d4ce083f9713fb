//! Settings for followers and rotation watchers, and the TOML monitor file.

use crate::error::Result;
use crate::format::LineFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder in [`FollowCommand::args`] replaced by the followed path.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Tuning for a [`RotationWatcher`](crate::RotationWatcher) and its followers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Delay between directory rescans.
    pub poll_interval_ms: u64,
    /// How often to warn while a cancelled follower has not finished tearing down.
    pub stop_grace_ms: u64,
    /// How long to wait for the follow process after asking it to terminate.
    pub reap_timeout_ms: u64,
    /// Restart a follower that ended without being cancelled.
    pub restart_ended: bool,
    /// Rescan early on directory events, in addition to polling.
    pub use_notify: bool,
    /// Capacity of the line channel behind [`LogLines`](crate::LogLines).
    pub line_buffer: usize,
    pub command: FollowCommand,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            stop_grace_ms: 10_000,
            reap_timeout_ms: 3_000,
            restart_ended: true,
            use_notify: true,
            line_buffer: 64,
            command: FollowCommand::default(),
        }
    }
}

impl WatchSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn reap_timeout(&self) -> Duration {
        Duration::from_millis(self.reap_timeout_ms)
    }
}

/// The external line-follow program, `tail -F` by default.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FollowCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for FollowCommand {
    fn default() -> Self {
        Self {
            program: "tail".to_string(),
            args: vec![
                "-n".to_string(),
                "10".to_string(),
                "-F".to_string(),
                PATH_PLACEHOLDER.to_string(),
            ],
        }
    }
}

impl FollowCommand {
    /// The same command with every `tail` line count (`-n N`, `-nN`, `--lines N`,
    /// `--lines=N`) set to 0, for restarting on a file whose lines were already delivered.
    ///
    /// Commands without a line-count option are returned unchanged.
    pub fn resumed(&self) -> FollowCommand {
        let mut args = Vec::with_capacity(self.args.len());
        let mut iter = self.args.iter();
        while let Some(arg) = iter.next() {
            if arg == "-n" || arg == "--lines" {
                args.push(arg.clone());
                if iter.next().is_some() {
                    args.push("0".to_string());
                }
            } else if arg.starts_with("--lines=") {
                args.push("--lines=0".to_string());
            } else if arg.len() > 2 && arg.starts_with("-n") {
                args.push("-n0".to_string());
            } else {
                args.push(arg.clone());
            }
        }
        FollowCommand {
            program: self.program.clone(),
            args,
        }
    }
}

/// Top-level configuration for the `log-follow` binary.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub settings: WatchSettings,
    #[serde(rename = "monitor")]
    pub monitors: Vec<MonitorEntry>,
}

/// One monitored directory and file name pattern.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorEntry {
    pub name: Option<String>,
    pub directory: PathBuf,
    pub pattern: String,
    #[serde(default)]
    pub format: LineFormat,
}

impl MonitorEntry {
    /// Label used in output, falling back to the pattern.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.pattern)
    }
}

impl MonitorConfig {
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }
}
