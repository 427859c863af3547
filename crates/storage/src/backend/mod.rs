//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! interface over a flat directory of media files.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
use crate::FileInfo;
use crate::error::Result;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::PathBuf;
use std::pin::Pin;
use tokio::io::AsyncRead;

pub type EntryStream<'a> = Pin<Box<dyn Stream<Item = Result<String>> + Send + 'a>>;
/// Owned async reader over one file's contents.
pub type BoxAsyncRead = Box<dyn AsyncRead + Send + Unpin>;

/// Unified interface for media storage.
///
/// All names are plain filenames relative to the backend root and are
/// validated with [`validate_name`](crate::validate_name) before use.
///
/// # Examples
///
/// ```
/// use reel_storage::{StorageBackend, error::Result};
///
/// async fn size_or_zero(backend: &dyn StorageBackend, name: &str) -> Result<u64> {
///     match backend.exists(name).await? {
///         true => Ok(backend.stat(name).await?.size),
///         false => Ok(0),
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Where `name` lives in this backend, for reporting. Does not validate.
    fn full_path(&self, name: &str) -> PathBuf;

    /// Stream the names of all regular files at the backend root.
    ///
    /// Subdirectories are neither listed nor descended into. Failing to open
    /// the root yields a single error and ends the stream; an entry that
    /// cannot be inspected or whose name is not valid UTF-8 is skipped with a
    /// warning.
    fn entries(&self) -> EntryStream<'_>;

    /// Collect [`entries()`](Self::entries) into a [`Vec`].
    async fn entry_names(&self) -> Result<Vec<String>> {
        self.entries().try_collect().await
    }

    async fn exists(&self, name: &str) -> Result<bool>;

    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Open a file for streaming reads.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn reader(&self, name: &str) -> Result<BoxAsyncRead>;

    /// Create or overwrite a file. The root must already exist; see
    /// [`ensure_root()`](Self::ensure_root).
    async fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Create or overwrite a file from a reader, returning the number of
    /// bytes written. The data is durable once this returns `Ok`; on error no
    /// partial file is left behind.
    async fn write_stream(&self, name: &str, reader: BoxAsyncRead) -> Result<u64>;

    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Get file metadata without reading contents.
    async fn stat(&self, name: &str) -> Result<FileInfo>;

    /// Create the backend root (and its parents) if missing. Idempotent.
    async fn ensure_root(&self) -> Result<()>;
}

/// Copy `name` from one backend to another without holding the whole file in
/// memory.
///
/// # Examples
///
/// ```
/// use reel_storage::{StorageBackend, copy_file, error::Result};
///
/// async fn back_up(uploads: &dyn StorageBackend, backups: &dyn StorageBackend) -> Result<u64> {
///     backups.ensure_root().await?;
///     copy_file(uploads, backups, "clip.mp4").await
/// }
/// ```
pub async fn copy_file(from: &dyn StorageBackend, to: &dyn StorageBackend, name: &str) -> Result<u64> {
    let reader = from.reader(name).await?;
    to.write_stream(name, reader).await
}
