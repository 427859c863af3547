//! SQLite media index.
//!
//! Every stored media file is recorded by filename, together with its media
//! type, MIME type and size. The index is the source of truth for which files
//! in the media directory are referenced; anything on disk that isn't recorded
//! here is an orphan.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::{MediaAsset, NewAsset};
pub use crate::repo::Repository;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub type IndexHandle = Arc<dyn MediaIndex>;

/// Persistence port for the media index.
///
/// [`Repository`] is the SQLite implementation.
#[async_trait]
pub trait MediaIndex: Send + Sync {
    /// Record a new asset; fails with
    /// [`Duplicate`](error::ErrorKind::Duplicate) if the filename is taken.
    async fn insert(&self, asset: &NewAsset) -> Result<MediaAsset>;

    async fn get_by_filename(&self, filename: &str) -> Result<Option<MediaAsset>>;

    /// All assets whose filename is in `filenames`, ordered by filename.
    async fn find_by_filenames(&self, filenames: &[String]) -> Result<Vec<MediaAsset>>;

    /// Every recorded filename, ordered.
    async fn list_filenames(&self) -> Result<Vec<String>>;

    /// Returns whether a record was removed.
    async fn delete_by_filename(&self, filename: &str) -> Result<bool>;
}
