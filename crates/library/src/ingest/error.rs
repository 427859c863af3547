//! Error types for the [`ingest`](super) module.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The filename is not a single plain path component.
    #[display("invalid filename: {_0}")]
    InvalidName(#[error(not(source))] String),
    /// The MIME type is neither `image/*` nor `video/*`.
    #[display("unsupported media type: {_0}")]
    UnsupportedMedia(#[error(not(source))] String),
    /// A file or index record with this name already exists.
    #[display("media already exists: {_0}")]
    AlreadyExists(#[error(not(source))] String),
    /// Writing to (or rolling back from) the media directory failed.
    #[display("storage operation failed")]
    Storage,
    /// Recording the asset in the media index failed.
    #[display("media index operation failed")]
    Index,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Index)
    }
}
