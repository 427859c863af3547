//! Storage backends for a flat media directory.
//!
//! Files are addressed by plain filenames (see [`validate_name`]). The
//! [`StorageBackend`] trait is the port the rest of the workspace uses;
//! [`LocalBackend`](backend::LocalBackend) is the real implementation.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::{BoxAsyncRead, StorageBackend, copy_file};
pub use crate::models::FileInfo;
pub use crate::path::validate as validate_name;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
