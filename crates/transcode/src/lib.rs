//! Discovery, validation and liveness probing of the `ffmpeg`/`ffprobe`
//! binaries used to transcode uploaded media.
//!
//! A [`BinaryLocator`] is built once by the composition root and shared by
//! reference. Discovery is synchronous and never fails (it falls back to the
//! bare command name); liveness probes are async and bounded by a timeout.

pub mod error;
mod health;
mod locate;
mod locator;
mod probe;
mod toolchain;

pub use crate::health::{HealthReport, SystemInfo, health_check};
pub use crate::locate::{SearchRoots, Source, Tool};
pub use crate::locator::{BinaryLocator, FfmpegPaths};
pub use crate::toolchain::Toolchain;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Bundle directory name, searched relative to the working directory and
    /// to the executable's ancestors.
    pub bundle_dir: PathBuf,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub probe_timeout_ms: u64,
    /// How many parents of the executable's directory to search.
    pub max_ancestor_depth: usize,
    /// Consult `PATH` before falling back to the bare command name.
    pub search_path: bool,
}
impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            bundle_dir: PathBuf::from("vendor"),
            ffmpeg_path: None,
            ffprobe_path: None,
            probe_timeout_ms: 5_000,
            max_ancestor_depth: 3,
            search_path: true,
        }
    }
}
impl LocatorConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}
