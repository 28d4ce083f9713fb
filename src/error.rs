//! Error types for the log follower library.

use thiserror::Error;

/// The main error type for log follower operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors when scanning directories or reading subprocess output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory watching errors from the notify crate.
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// The file name pattern is not a valid glob.
    #[error("Invalid name pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// The follow process could not be started.
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The follow process was started without a readable stdout.
    #[error("Follow process has no stdout")]
    MissingStdout,

    /// The follower task panicked or was aborted.
    #[error("Follower task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Stream has been closed or dropped.
    #[error("Stream closed")]
    StreamClosed,
}

/// A convenient Result type for log follower operations.
pub type Result<T> = std::result::Result<T, Error>;
