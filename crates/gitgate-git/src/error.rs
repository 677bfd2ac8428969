//! Error types for the git process boundary.

use thiserror::Error;

/// Errors that can occur while framing protocol data or invoking git.
#[derive(Debug, Error)]
pub enum GitError {
    /// Invalid pkt-line format.
    #[error("invalid pkt-line: {0}")]
    InvalidPktLine(String),

    /// The git process exited with a non-zero status.
    #[error("git {command} exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// I/O error (spawn failure, pipe error).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
