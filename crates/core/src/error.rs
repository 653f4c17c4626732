use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Result type for check operations
pub type Result<T> = std::result::Result<T, CheckError>;

/// Infrastructure failures. Any of these makes the whole run unreliable and ends it.
///
/// Malformed JSON is not an error here; it is reported as
/// [`ParseOutcome::Invalid`](crate::ParseOutcome::Invalid).
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("seek {} to {offset}: {source}", path.display())]
    Seek {
        path: PathBuf,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("read {} ({len} bytes at {offset}): {source}", path.display())]
    Read {
        path: PathBuf,
        offset: u64,
        len: usize,
        #[source]
        source: std::io::Error,
    },

    /// Reading the candidate path stream failed
    #[error("read candidate paths: {0}")]
    PathStream(#[source] std::io::Error),

    #[error("spawn git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git exited with {status}: {stderr}")]
    Git { status: ExitStatus, stderr: String },

    /// A validation task panicked or was cancelled
    #[error("validation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
