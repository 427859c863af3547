use std::path::PathBuf;
use time::UtcDateTime;

/// Metadata for a single file in a storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    /// Where the file lives, for reporting. Only meaningful for the backend
    /// that produced it.
    pub full_path: PathBuf,
    pub size: u64,
    pub modified: UtcDateTime,
}
