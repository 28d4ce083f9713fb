//! A stream of lines from a rotating log file.

use crate::config::WatchSettings;
use crate::error::{Error, Result};
use crate::handler::BoxError;
use crate::rotation::{MonitorSpec, RotationWatcher};
use futures::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Lines from whichever matching file is newest, in delivery order.
///
/// The channel behind the stream is bounded, so a consumer that stops
/// polling pauses the follower instead of buffering without limit.
/// Dropping the stream shuts the watcher down.
pub struct LogLines {
    receiver: mpsc::Receiver<String>,
    _shutdown_tx: broadcast::Sender<()>,
    _task_handle: JoinHandle<()>,
}

impl LogLines {
    /// Starts a [`RotationWatcher`] on `directory` and `pattern` in the background.
    pub fn new(
        directory: impl Into<PathBuf>,
        pattern: impl Into<String>,
        settings: WatchSettings,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::channel(settings.line_buffer.max(1));
        let handler = move |line: String| {
            let tx = tx.clone();
            async move {
                tx.send(line)
                    .await
                    .map_err(|_| BoxError::from(Error::StreamClosed))
            }
        };

        let watcher = RotationWatcher::new(MonitorSpec::new(directory, pattern, handler), settings)?;
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let task_handle = tokio::spawn(watcher.run_until(async move {
            let _ = shutdown_rx.recv().await;
        }));

        Ok(LogLines {
            receiver: rx,
            _shutdown_tx: shutdown_tx,
            _task_handle: task_handle,
        })
    }

    /// Check if the stream has been closed/dropped
    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

impl Drop for LogLines {
    fn drop(&mut self) {
        // The watcher stops its follower and exits; ignore errors if it already has
        let _ = self._shutdown_tx.send(());
    }
}

impl Stream for LogLines {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}
