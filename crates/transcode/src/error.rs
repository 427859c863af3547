//! Transcode Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Discovery and liveness probing never produce these; a missing binary is a
//! warning and a dead one is `false`. Errors only surface once a transcoding
//! job actually runs.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A transcode error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for transcode operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The binary could not be started at all (missing, not executable).
    #[display("failed to start {}", _0.display())]
    Spawn(#[error(not(source))] PathBuf),
    /// The binary exited with a non-zero exit code.
    #[display("transcoder exited with code: {_0}")]
    Failed(#[error(not(source))] i32),
    /// The binary was terminated by a signal, without an exit code.
    #[display("transcoder was terminated")]
    Terminated,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}
