//! Follows a log file that is renamed on every restart of the program writing it.
//!
//! A [`RotationWatcher`] polls a directory for the newest file matching a
//! pattern and keeps one [`Follower`] (an external `tail -F` process) on it.
//! Each new line is handed, in order, to an async [`LineHandler`]. When a
//! newer file appears the old follower is stopped and reaped before the new
//! one starts.
//!
//! # Example
//!
//! ```rust,no_run
//! use log_follow::{WatchSettings, watch_log};
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut lines = watch_log("/home/pzserver/Zomboid/Logs", "*chat.txt", WatchSettings::default())?;
//!
//!     while let Some(line) = lines.next().await {
//!         println!("New line: {}", line);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod follower;
mod format;
mod handler;
mod reader;
mod rotation;
mod scan;
mod stream;
mod watcher;

#[cfg(test)]
mod test_helpers;

// Public API exports
pub use config::{FollowCommand, MonitorConfig, MonitorEntry, PATH_PLACEHOLDER, WatchSettings};
pub use error::{Error, Result};
pub use follower::{FollowOutcome, Follower, FollowerHandle};
pub use format::LineFormat;
pub use handler::{BoxError, LineHandler};
pub use rotation::{MonitorSpec, RotationWatcher, WatchEvent};
pub use scan::has_wildcards;
pub use stream::LogLines;

use std::path::PathBuf;
use tokio_stream::Stream;

/// Creates a stream of lines from the newest file in `directory` matching `pattern`.
///
/// # Arguments
///
/// * `directory` - Directory holding the log files
/// * `pattern` - A literal file name, or a glob such as `*chat.txt`
/// * `settings` - Poll interval, follow command and timeouts
///
/// # Example
///
/// ```rust,no_run
/// use log_follow::{WatchSettings, watch_log};
/// use tokio_stream::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut lines = watch_log("/var/log/game", "console.log", WatchSettings::default())?;
///
///     while let Some(line) = lines.next().await {
///         println!("{}", line);
///     }
///
///     Ok(())
/// }
/// ```
pub fn watch_log(
    directory: impl Into<PathBuf>,
    pattern: impl Into<String>,
    settings: WatchSettings,
) -> Result<impl Stream<Item = String> + Unpin> {
    LogLines::new(directory, pattern, settings)
}
