//! Candidate enumeration for the transcoder binaries.
//!
//! Binaries ship in a bundle directory whose location depends on how the
//! service was deployed: next to the working directory in local development,
//! next to the executable in containers, a few levels above it in serverless
//! bundles. We try each layout in order and fall back to the system search
//! path, then to the bare command name.

use crate::LocatorConfig;
use derive_more::Display;
use std::env::consts::{ARCH, EXE_SUFFIX, OS};
use std::path::{Path, PathBuf};

/// The two binaries we look for.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Tool {
    #[display("ffmpeg")]
    Ffmpeg,
    #[display("ffprobe")]
    Ffprobe,
}
impl Tool {
    /// Executable file name, e.g. `ffmpeg` or `ffprobe.exe`.
    pub fn command_name(&self) -> String {
        format!("{self}{EXE_SUFFIX}")
    }

    /// Location of the executable inside a bundle directory.
    ///
    /// `ffmpeg` ships as a single static build; `ffprobe` ships one build per
    /// platform and architecture, namespaced `<os>-<arch>` (e.g. `linux-x64`,
    /// `darwin-arm64`).
    pub fn bundle_path(&self) -> PathBuf {
        match self {
            Self::Ffmpeg => Path::new("ffmpeg").join(self.command_name()),
            Self::Ffprobe => Path::new("ffprobe").join(platform_dir()).join(self.command_name()),
        }
    }
}

fn platform_dir() -> String {
    let os = match OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    };
    let arch = match ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "ia32",
        other => other,
    };
    format!("{os}-{arch}")
}

/// Where a resolved path came from; logged so that operators can tell which
/// layout a deployment ended up using.
#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum Source {
    #[display("configured override")]
    Override,
    #[display("working directory bundle")]
    WorkingDir,
    #[display("executable bundle (depth {_0})")]
    ModuleDir(usize),
    #[display("system search path")]
    SearchPath,
    #[display("bare command")]
    Bare,
}

/// Roots to search for bundle directories.
///
/// Injectable so that tests can point a locator at a scratch directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchRoots {
    pub working_dir: Option<PathBuf>,
    /// Directory containing the running executable.
    pub module_dir: Option<PathBuf>,
}
impl SearchRoots {
    pub fn from_env() -> Self {
        Self {
            working_dir: std::env::current_dir().ok(),
            module_dir: std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)),
        }
    }
}

/// Filesystem candidates in priority order. Does not touch the filesystem.
pub(crate) fn candidates(tool: Tool, roots: &SearchRoots, config: &LocatorConfig) -> Vec<(Source, PathBuf)> {
    let mut candidates = Vec::new();
    let configured = match tool {
        Tool::Ffmpeg => config.ffmpeg_path.as_ref(),
        Tool::Ffprobe => config.ffprobe_path.as_ref(),
    };
    if let Some(path) = configured {
        candidates.push((Source::Override, path.clone()));
    }
    let relative = config.bundle_dir.join(tool.bundle_path());
    if let Some(cwd) = &roots.working_dir {
        candidates.push((Source::WorkingDir, cwd.join(&relative)));
    }
    if let Some(module_dir) = &roots.module_dir {
        // Path::ancestors() starts with the directory itself (depth 0).
        for (depth, ancestor) in module_dir.ancestors().take(config.max_ancestor_depth + 1).enumerate() {
            candidates.push((Source::ModuleDir(depth), ancestor.join(&relative)));
        }
    }
    candidates
}

/// Resolve a binary path. Never fails: when nothing is found on disk the bare
/// command name is returned and left for the OS to resolve at spawn time.
pub(crate) fn detect(tool: Tool, roots: &SearchRoots, config: &LocatorConfig) -> (Source, PathBuf) {
    for (source, path) in candidates(tool, roots, config) {
        if path.is_file() {
            tracing::debug!(tool = %tool, source = %source, path = %path.display(), "Transcoder binary found");
            return (source, path);
        }
        if source == Source::Override {
            tracing::warn!(tool = %tool, path = %path.display(), "Configured binary does not exist; searching elsewhere");
        } else {
            tracing::trace!(tool = %tool, source = %source, path = %path.display(), "Candidate not found");
        }
    }
    if config.search_path {
        if let Ok(path) = which::which(tool.command_name()) {
            tracing::debug!(tool = %tool, path = %path.display(), "Transcoder binary found in PATH");
            return (Source::SearchPath, path);
        }
        tracing::info!(tool = %tool, "Transcoder binary not found in PATH");
    }
    tracing::warn!(tool = %tool, "No transcoder binary found on disk; falling back to bare command name");
    (Source::Bare, PathBuf::from(tool.command_name()))
}
