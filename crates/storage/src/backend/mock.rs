//! In-memory storage backend for testing.

use super::{BoxAsyncRead, EntryStream};
use crate::error::{ErrorKind, Result};
use crate::{FileInfo, StorageBackend, validate_name};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Files are stored in a map behind a [`RwLock`], so all trait methods can
/// operate on `&self` without external synchronisation. Failures can be
/// injected per operation to exercise error paths.
///
/// # Examples
///
/// ```
/// use reel_storage::backend::MockBackend;
/// use reel_storage::StorageBackend;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([("a.jpg", b"jpeg")]);
/// assert!(backend.exists("a.jpg").await?);
///
/// backend.write("b.png", b"png").await?;
/// assert!(backend.exists("b.png").await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<BTreeMap<String, (UtcDateTime, Vec<u8>)>>,
    read_only: bool,
    unlisted: bool,
    unstattable: RwLock<HashSet<String>>,
    unwritable: RwLock<HashSet<String>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any name fails validation. If test setup is wrong, then the
    /// test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let now = UtcDateTime::now();
        let mut map = BTreeMap::new();
        for (name, data) in files {
            let name = name.into();
            if validate_name(&name).is_err() {
                panic!("MockBackend::with_files: invalid name {name:?}");
            }
            map.insert(name, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            read_only: false,
            unlisted: false,
            unstattable: RwLock::new(HashSet::new()),
            unwritable: RwLock::new(HashSet::new()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Reject every `write`, `delete` and `ensure_root` with
    /// [`PermissionDenied`](ErrorKind::PermissionDenied).
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Make [`entries`](StorageBackend::entries) fail as if the root were
    /// unreadable.
    pub fn unlisted(mut self) -> Self {
        self.unlisted = true;
        self
    }

    /// Make [`stat`](StorageBackend::stat) fail for one file.
    pub async fn fail_stat(&self, name: impl Into<String>) {
        self.unstattable.write().await.insert(name.into());
    }

    /// Make [`write`](StorageBackend::write) and
    /// [`write_stream`](StorageBackend::write_stream) fail for one file.
    pub async fn fail_write(&self, name: impl Into<String>) {
        self.unwritable.write().await.insert(name.into());
    }

    /// Override the modification time of a stored file.
    ///
    /// Panics if the file does not exist.
    pub async fn set_modified(&self, name: &str, modified: UtcDateTime) {
        match self.storage.write().await.get_mut(name) {
            Some(entry) => entry.0 = modified,
            None => panic!("MockBackend::set_modified: no file {name:?}"),
        }
    }

    /// Names of all stored files, sorted.
    pub async fn names(&self) -> Vec<String> {
        self.storage.read().await.keys().cloned().collect()
    }

    fn check_writable(&self, name: &str) -> Result<()> {
        if self.read_only {
            exn::bail!(ErrorKind::PermissionDenied(self.full_path(name)));
        }
        Ok(())
    }

    async fn check_file_writable(&self, name: &str) -> Result<()> {
        self.check_writable(name)?;
        if self.unwritable.read().await.contains(name) {
            exn::bail!(ErrorKind::PermissionDenied(self.full_path(name)));
        }
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &[u8]); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn full_path(&self, name: &str) -> PathBuf {
        Path::new(&self.name).join(name)
    }

    fn entries(&self) -> EntryStream<'_> {
        Box::pin(stream! {
            if self.unlisted {
                yield Err(exn::Exn::from(ErrorKind::PermissionDenied(PathBuf::from(&self.name))));
                return;
            }
            // Snapshot under the read lock, then drop it before yielding.
            let names: Vec<String> = self.storage.read().await.keys().cloned().collect();
            for name in names {
                yield Ok(name);
            }
        })
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let name = validate_name(name)?;
        Ok(self.storage.read().await.contains_key(name))
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let name = validate_name(name)?;
        let guard = self.storage.read().await;
        let (_modified, data) = guard.get(name).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(self.full_path(name))))?;
        Ok(data.clone())
    }

    async fn reader(&self, name: &str) -> Result<BoxAsyncRead> {
        let data = self.read(name).await?;
        Ok(Box::new(std::io::Cursor::new(data)))
    }

    async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let name = validate_name(name)?;
        self.check_file_writable(name).await?;
        self.storage.write().await.insert(name.to_string(), (UtcDateTime::now(), data.to_vec()));
        Ok(())
    }

    async fn write_stream(&self, name: &str, mut reader: BoxAsyncRead) -> Result<u64> {
        let name = validate_name(name)?;
        self.check_file_writable(name).await?;
        // Buffered; the mock only ever holds small test fixtures.
        let mut data = Vec::new();
        let copied = reader.read_to_end(&mut data).await.map_err(ErrorKind::Io)?;
        self.storage.write().await.insert(name.to_string(), (UtcDateTime::now(), data));
        Ok(copied as u64)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let name = validate_name(name)?;
        self.check_writable(name)?;
        match self.storage.write().await.remove(name) {
            Some(_) => Ok(()),
            None => Err(exn::Exn::from(ErrorKind::NotFound(self.full_path(name)))),
        }
    }

    async fn stat(&self, name: &str) -> Result<FileInfo> {
        let name = validate_name(name)?;
        if self.unstattable.read().await.contains(name) {
            exn::bail!(ErrorKind::PermissionDenied(self.full_path(name)));
        }
        let guard = self.storage.read().await;
        let (modified, data) = guard.get(name).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(self.full_path(name))))?;
        Ok(FileInfo {
            name: name.to_string(),
            full_path: self.full_path(name),
            size: data.len() as u64,
            modified: *modified,
        })
    }

    async fn ensure_root(&self) -> Result<()> {
        self.check_writable("")
    }
}
