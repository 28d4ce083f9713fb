//! Test utilities for scratch log directories and collecting delivered lines.

#[cfg(test)]
use crate::config::{FollowCommand, PATH_PLACEHOLDER, WatchSettings};
#[cfg(test)]
use crate::handler::{BoxError, LineHandler};
#[cfg(test)]
use std::fs::OpenOptions;
#[cfg(test)]
use std::io::Write;
#[cfg(test)]
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::time::Duration;
#[cfg(test)]
use tokio::sync::mpsc;

#[cfg(test)]
pub struct TempLogDir {
    _temp_dir: tempfile::TempDir,
    path: PathBuf,
}

#[cfg(test)]
impl TempLogDir {
    /// Create a new empty temporary log directory
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().to_path_buf();
        Ok(Self {
            _temp_dir: temp_dir,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Create (or replace) a log file with initial content
    pub fn create(&self, name: &str, content: &str) -> std::io::Result<PathBuf> {
        let path = self.file(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Append one line to a log file
    pub fn append_line(&self, name: &str, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file(name))?;
        writeln!(file, "{}", line)?;
        file.flush()
    }
}

/// `tail -F` starting from the first line, so tests see every line written.
#[cfg(test)]
pub fn tail_from_start() -> FollowCommand {
    FollowCommand {
        program: "tail".to_string(),
        args: vec![
            "-n".to_string(),
            "+1".to_string(),
            "-F".to_string(),
            PATH_PLACEHOLDER.to_string(),
        ],
    }
}

/// A follow command that prints the file once and exits.
#[cfg(test)]
pub fn cat_once() -> FollowCommand {
    FollowCommand {
        program: "cat".to_string(),
        args: vec![PATH_PLACEHOLDER.to_string()],
    }
}

/// Fast settings for tests: short intervals, no notify.
#[cfg(test)]
pub fn fast_settings(command: FollowCommand) -> WatchSettings {
    WatchSettings {
        poll_interval_ms: 50,
        stop_grace_ms: 1_000,
        reap_timeout_ms: 1_000,
        restart_ended: true,
        use_notify: false,
        line_buffer: 16,
        command,
    }
}

/// A handler that forwards every line into a channel.
#[cfg(test)]
pub fn channel_handler() -> (impl LineHandler, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = move |line: String| {
        let tx = tx.clone();
        async move { tx.send(line).map_err(BoxError::from) }
    };
    (handler, rx)
}

/// Receive exactly `count` lines, failing the test if they do not arrive in time.
#[cfg(test)]
pub async fn recv_lines(
    rx: &mut mpsc::UnboundedReceiver<String>,
    count: usize,
    timeout: Duration,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(count);
    while lines.len() < count {
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(line)) => lines.push(line),
            Ok(None) => break,
            Err(_) => panic!("timed out after {} of {} lines: {:?}", lines.len(), count, lines),
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_log_dir_create_and_append() {
        let dir = TempLogDir::new().unwrap();
        let path = dir.create("app.log", "first\n").unwrap();
        dir.append_line("app.log", "second").unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "first\nsecond\n");
    }

    #[tokio::test]
    async fn test_channel_handler_forwards_lines() {
        let (handler, mut rx) = channel_handler();
        handler.handle("one".to_string()).await.unwrap();
        handler.handle("two".to_string()).await.unwrap();

        let lines = recv_lines(&mut rx, 2, Duration::from_millis(100)).await;
        assert_eq!(lines, vec!["one", "two"]);
    }
}
