use clap::Parser;
use futures::future::join_all;
use log_follow::{LineFormat, MonitorConfig, MonitorEntry, MonitorSpec, RotationWatcher};
use std::path::PathBuf;
use std::process;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// Follows rotating game server logs and prints the chat lines they contain.
#[derive(Parser, Debug)]
#[command(name = "log-follow", version, about)]
struct Cli {
    /// Directory holding the log files (ignored with --config)
    #[arg(value_name = "DIRECTORY", required_unless_present = "config")]
    directory: Option<PathBuf>,

    /// Log file name, or a glob such as '*chat.txt'
    #[arg(value_name = "PATTERN", required_unless_present = "config")]
    pattern: Option<String>,

    /// TOML file listing monitors
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Line format: raw, zomboid or valheim
    #[arg(short, long, default_value = "raw")]
    format: LineFormat,

    /// Rescan interval in milliseconds (overrides config)
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Debug logging (follow process output, scan decisions)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
    tracing::debug!(?cli, "parsed CLI arguments");

    let mut config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };
    if let Some(poll_ms) = cli.poll_ms {
        config.settings.poll_interval_ms = poll_ms;
    }
    if config.monitors.is_empty() {
        eprintln!("No monitors configured");
        process::exit(1);
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut watchers = Vec::new();
    for entry in &config.monitors {
        let spec = MonitorSpec::new(&entry.directory, &entry.pattern, printer(entry));
        match RotationWatcher::new(spec, config.settings.clone()) {
            Ok(watcher) => {
                let mut shutdown_rx = shutdown_tx.subscribe();
                watchers.push(tokio::spawn(watcher.run_until(async move {
                    let _ = shutdown_rx.recv().await;
                })));
            }
            Err(e) => {
                eprintln!("Invalid monitor `{}`: {}", entry.label(), e);
                process::exit(1);
            }
        }
    }
    tracing::info!(monitors = watchers.len(), "log-follow started");

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
            let _ = shutdown_tx.send(());
        }
    });

    // Literal-name monitors return once their follower ends; pattern monitors run until Ctrl-C.
    join_all(watchers).await;
}

fn load_config(cli: &Cli) -> log_follow::Result<MonitorConfig> {
    if let Some(path) = &cli.config {
        return MonitorConfig::load(path);
    }
    let mut config = MonitorConfig::default();
    if let (Some(directory), Some(pattern)) = (&cli.directory, &cli.pattern) {
        config.monitors.push(MonitorEntry {
            name: None,
            directory: directory.clone(),
            pattern: pattern.clone(),
            format: cli.format,
        });
    }
    Ok(config)
}

/// Prints the text extracted from each line, prefixed by the monitor's label.
fn printer(
    entry: &MonitorEntry,
) -> impl Fn(String) -> std::future::Ready<Result<(), log_follow::BoxError>> + Send + Sync + 'static
{
    let label = entry.label().to_string();
    let format = entry.format;
    move |line: String| {
        if let Some(text) = format.extract(&line) {
            println!("[{}] {}", label, text);
        }
        std::future::ready(Ok(()))
    }
}
