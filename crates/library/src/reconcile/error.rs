//! Error types for the [`reconcile`](super) module.
//!
//! Only failures that make the whole run meaningless are errors. Per-file
//! problems are collected in the [`CleanupReport`](super::CleanupReport)
//! instead.

use derive_more::{Display, Error};

/// A reconcile error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for reconcile operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The media directory could not be listed.
    #[display("failed to list media directory")]
    FileSystem,
    /// Recorded filenames could not be fetched from the media index.
    #[display("failed to query media index")]
    Database,
    /// Backups were requested but no backup location is configured.
    #[display("backup requested without a backup location")]
    NoBackupTarget,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FileSystem | Self::Database)
    }
}
