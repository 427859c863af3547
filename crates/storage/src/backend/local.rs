//! Local filesystem storage backend.
//!
//! Files are stored directly in a configured directory and accessed via
//! `tokio::fs`.

use crate::backend::{BoxAsyncRead, EntryStream};
use crate::error::{ErrorKind, Result};
use crate::{FileInfo, StorageBackend, validate_name};
use async_stream::stream;
use async_trait::async_trait;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

/// Local filesystem storage backend.
///
/// # Examples
///
/// ```no_run
/// use reel_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("uploads", "/srv/reel/uploads")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a backend rooted at an absolute directory.
    ///
    /// The directory is not created here; see
    /// [`ensure_root`](StorageBackend::ensure_root).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRoot`](ErrorKind::InvalidRoot) if the path is
    /// relative, or exists but is not a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() || (root.exists() && !root.is_dir()) {
            exn::bail!(ErrorKind::InvalidRoot(root));
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_name(name)?))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    fn file_info(&self, name: &str, path: PathBuf, metadata: &Metadata) -> Result<FileInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?;
        Ok(FileInfo {
            name: name.to_string(),
            full_path: path,
            size: metadata.len(),
            modified: modified.into(),
        })
    }

    /// `Ok(None)` for anything that isn't a regular file with a UTF-8 name.
    async fn process_entry(entry: &DirEntry) -> Result<Option<String>> {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(|e| Self::map_io_error(e, &path))?;
        if !file_type.is_file() {
            // Symlinks are followed so that a linked upload still counts.
            let followed = match file_type.is_symlink() {
                true => fs::metadata(&path).await.is_ok_and(|m| m.is_file()),
                false => false,
            };
            if !followed {
                return Ok(None);
            }
        }
        match entry.file_name().into_string() {
            Ok(name) => Ok(Some(name)),
            Err(raw) => {
                tracing::warn!(name = ?raw, "Skipping file with non UTF-8 name");
                Ok(None)
            },
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn full_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn entries(&self) -> EntryStream<'_> {
        Box::pin(stream! {
            let mut entries = match fs::read_dir(&self.root).await {
                Ok(entries) => entries,
                Err(err) => {
                    yield Err(exn::Exn::from(Self::map_io_error(err, &self.root)));
                    return;
                }
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &self.root)));
                        return;
                    },
                };
                match Self::process_entry(&entry).await {
                    Ok(Some(name)) => yield Ok(name),
                    Ok(None) => {},
                    Err(err) => tracing::warn!(path = %entry.path().display(), error = ?err, "Skipping unreadable entry"),
                }
            }
        })
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.absolute_path(name)?;
        Ok(fs::try_exists(&path).await.map_err(|e| Self::map_io_error(e, &path))?)
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.absolute_path(name)?;
        Ok(fs::read(&path).await.map_err(|e| Self::map_io_error(e, &path))?)
    }

    async fn reader(&self, name: &str) -> Result<BoxAsyncRead> {
        let path = self.absolute_path(name)?;
        let file = fs::File::open(&path).await.map_err(|e| Self::map_io_error(e, &path))?;
        Ok(Box::new(file))
    }

    async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.absolute_path(name)?;
        Ok(fs::write(&path, data).await.map_err(|e| Self::map_io_error(e, &path))?)
    }

    async fn write_stream(&self, name: &str, mut reader: BoxAsyncRead) -> Result<u64> {
        let path = self.absolute_path(name)?;
        let mut file = fs::File::create(&path).await.map_err(|e| Self::map_io_error(e, &path))?;
        let copied = async {
            let copied = tokio::io::copy(&mut reader, &mut file).await?;
            file.sync_all().await?;
            Ok::<_, std::io::Error>(copied)
        }
        .await;
        match copied {
            Ok(copied) => Ok(copied),
            Err(err) => {
                drop(file);
                if let Err(cleanup) = fs::remove_file(&path).await {
                    tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove partial file");
                }
                Err(exn::Exn::from(Self::map_io_error(err, &path)))
            },
        }
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let path = self.absolute_path(name)?;
        Ok(fs::remove_file(&path).await.map_err(|e| Self::map_io_error(e, &path))?)
    }

    async fn stat(&self, name: &str) -> Result<FileInfo> {
        let path = self.absolute_path(name)?;
        let metadata = fs::metadata(&path).await.map_err(|e| Self::map_io_error(e, &path))?;
        self.file_info(name, path, &metadata)
    }

    async fn ensure_root(&self) -> Result<()> {
        Ok(fs::create_dir_all(&self.root).await.map_err(|e| Self::map_io_error(e, &self.root))?)
    }
}
