//! Directory change notifications using the notify crate.
//!
//! These only wake the rotation loop early; polling stays authoritative.

use crate::error::Result;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Watches one directory (non-recursively) for files appearing, vanishing or being renamed.
pub(crate) struct DirectoryEvents {
    _watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<notify::Result<Event>>,
    directory: PathBuf,
}

impl DirectoryEvents {
    /// Starts watching `directory`.
    pub(crate) fn start<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| forward_event(&tx, res),
            Config::default(),
        )?;
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            directory,
        })
    }

    /// Resolves on the next rotation-relevant event, swallowing any burst
    /// queued behind it. Never resolves once the watcher has shut down.
    pub(crate) async fn next_rotation(&mut self) {
        loop {
            match self.receiver.recv().await {
                Some(Ok(_)) => {
                    while self.receiver.try_recv().is_ok() {}
                    return;
                }
                Some(Err(e)) => {
                    tracing::debug!(directory = %self.directory.display(), error = %e, "directory watch error");
                }
                None => {
                    tracing::debug!(directory = %self.directory.display(), "directory watch closed");
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    #[cfg(test)]
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// Queues rotation events and watch errors. Content writes to the followed
/// file are dropped here so they never accumulate in the channel.
fn forward_event(tx: &mpsc::UnboundedSender<notify::Result<Event>>, res: notify::Result<Event>) {
    if res.as_ref().map_or(true, is_rotation_event) {
        let _ = tx.send(res);
    }
}

/// Whether an event can change which file is newest. Content writes to the
/// followed file are deliberately not relevant.
pub(crate) fn is_rotation_event(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    )
}
