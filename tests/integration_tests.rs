use log_follow::{
    BoxError, FollowCommand, MonitorSpec, RotationWatcher, WatchEvent, WatchSettings, watch_log,
};
use std::path::Path;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;

const WAIT: Duration = Duration::from_secs(5);

fn test_settings() -> WatchSettings {
    WatchSettings {
        poll_interval_ms: 50,
        reap_timeout_ms: 1_000,
        use_notify: false,
        command: FollowCommand {
            program: "tail".to_string(),
            args: vec![
                "-n".to_string(),
                "+1".to_string(),
                "-F".to_string(),
                "{path}".to_string(),
            ],
        },
        ..WatchSettings::default()
    }
}

/// Helper function to collect items from a stream with a timeout
async fn collect_stream_items<T>(
    stream: &mut (impl StreamExt<Item = T> + Unpin),
    count: usize,
) -> Vec<T> {
    let mut items = Vec::new();
    let timeout_future = tokio::time::sleep(WAIT);
    tokio::pin!(timeout_future);

    while items.len() < count {
        tokio::select! {
            item = stream.next() => {
                match item {
                    Some(item) => items.push(item),
                    None => break,
                }
            }
            _ = &mut timeout_future => break,
        }
    }

    items
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

#[tokio::test]
async fn test_watch_log_happy_path() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "server1_chat.txt", "hello\nworld\n");

    let mut stream = watch_log(dir.path(), "*chat.txt", test_settings()).unwrap();
    let items = collect_stream_items(&mut stream, 2).await;

    assert_eq!(items, vec!["hello", "world"]);
}

#[tokio::test]
async fn test_watch_log_invalid_pattern() {
    let result = watch_log("/tmp", "[", test_settings());
    assert!(result.is_err());
}

#[tokio::test]
async fn test_rotation_scenario_cancels_before_starting_next() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("server1_chat.txt");
    let second = dir.path().join("server2_chat.txt");
    write(dir.path(), "server1_chat.txt", "from one\n");

    let (line_tx, mut lines) = mpsc::unbounded_channel();
    let handler = move |line: String| {
        let line_tx = line_tx.clone();
        async move { line_tx.send(line).map_err(BoxError::from) }
    };
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let watcher = RotationWatcher::new(
        MonitorSpec::new(dir.path(), "*chat.txt", handler),
        test_settings(),
    )
    .unwrap()
    .with_events(event_tx);
    let task = tokio::spawn(watcher.run_until(async move {
        let _ = shutdown_rx.await;
    }));

    let line = tokio::time::timeout(WAIT, lines.recv()).await.unwrap();
    assert_eq!(line.as_deref(), Some("from one"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    write(dir.path(), "server2_chat.txt", "from two\n");

    let line = tokio::time::timeout(WAIT, lines.recv()).await.unwrap();
    assert_eq!(line.as_deref(), Some("from two"));

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(WAIT, task).await.unwrap().unwrap();

    let mut lifecycle = Vec::new();
    while let Ok(event) = events.try_recv() {
        if !matches!(event, WatchEvent::Scanned { .. }) {
            lifecycle.push(event);
        }
    }

    assert_eq!(
        lifecycle,
        vec![
            WatchEvent::FollowerStarted {
                path: first.clone()
            },
            WatchEvent::StopRequested {
                path: first.clone()
            },
            WatchEvent::FollowerStopped {
                path: first,
                cancelled: true
            },
            WatchEvent::FollowerStarted {
                path: second.clone()
            },
            WatchEvent::StopRequested {
                path: second.clone()
            },
            WatchEvent::FollowerStopped {
                path: second,
                cancelled: true
            },
        ]
    );
}
