use crate::locate::{self, SearchRoots, Tool};
use crate::probe;
use crate::{LocatorConfig, Toolchain};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Resolved binary paths. `None` until the corresponding detection has run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FfmpegPaths {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct State {
    paths: FfmpegPaths,
    toolchain: Option<Toolchain>,
    /// Set once [`BinaryLocator::validate`] has applied the current paths,
    /// whether or not that succeeded.
    validated: bool,
}
impl State {
    fn path(&mut self, tool: Tool, roots: &SearchRoots, config: &LocatorConfig) -> PathBuf {
        let slot = match tool {
            Tool::Ffmpeg => &mut self.paths.ffmpeg,
            Tool::Ffprobe => &mut self.paths.ffprobe,
        };
        slot.get_or_insert_with(|| locate::detect(tool, roots, config).1).clone()
    }
}

/// Finds, caches and validates the transcoder binaries.
///
/// Detection runs lazily on first use and the result is cached for the
/// lifetime of the locator; only [`redetect`](Self::redetect) and
/// [`override_paths`](Self::override_paths) change it.
pub struct BinaryLocator {
    config: LocatorConfig,
    roots: SearchRoots,
    state: Mutex<State>,
}
impl BinaryLocator {
    /// Locator searching relative to the current working directory and the
    /// running executable.
    pub fn new(config: LocatorConfig) -> Self {
        Self::with_roots(config, SearchRoots::from_env())
    }

    pub fn with_roots(config: LocatorConfig, roots: SearchRoots) -> Self {
        Self { config, roots, state: Mutex::new(State::default()) }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // Every mutation leaves the state consistent, so a poisoned lock is
        // still safe to use.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn detect_primary_path(&self) -> PathBuf {
        self.state().path(Tool::Ffmpeg, &self.roots, &self.config)
    }

    pub fn detect_probe_path(&self) -> PathBuf {
        self.state().path(Tool::Ffprobe, &self.roots, &self.config)
    }

    /// Currently cached paths, without triggering detection.
    pub fn paths(&self) -> FfmpegPaths {
        self.state().paths.clone()
    }

    /// Apply both detected paths to the transcoder configuration.
    ///
    /// Runs at most once per locator (until the next
    /// [`redetect`](Self::redetect) or [`override_paths`](Self::override_paths));
    /// later calls return the first outcome without detecting again.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn validate(&self) -> bool {
        let mut state = self.state();
        if state.validated {
            return state.toolchain.is_some();
        }
        let ffmpeg = state.path(Tool::Ffmpeg, &self.roots, &self.config);
        let ffprobe = state.path(Tool::Ffprobe, &self.roots, &self.config);
        state.validated = true;
        state.toolchain = Toolchain::new(ffmpeg, ffprobe);
        match &state.toolchain {
            Some(toolchain) => {
                tracing::info!(
                    ffmpeg = %toolchain.ffmpeg_path().display(),
                    ffprobe = %toolchain.ffprobe_path().display(),
                    "Transcoder configured"
                );
                true
            },
            None => {
                tracing::error!("Transcoder configuration failed");
                false
            },
        }
    }

    /// Forget cached paths, detect again and re-validate.
    #[tracing::instrument(skip(self))]
    pub fn redetect(&self) -> FfmpegPaths {
        *self.state() = State::default();
        self.validate();
        self.paths()
    }

    /// Replace the cached paths. Fields left as `None` keep their current
    /// value; the next [`validate`](Self::validate) applies the result.
    pub fn override_paths(&self, paths: FfmpegPaths) {
        let mut state = self.state();
        if let Some(ffmpeg) = paths.ffmpeg {
            state.paths.ffmpeg = Some(ffmpeg);
        }
        if let Some(ffprobe) = paths.ffprobe {
            state.paths.ffprobe = Some(ffprobe);
        }
        state.validated = false;
        state.toolchain = None;
    }

    /// The applied configuration, once [`validate`](Self::validate) has
    /// succeeded.
    pub fn toolchain(&self) -> Option<Toolchain> {
        self.state().toolchain.clone()
    }

    /// Whether `ffmpeg -version` exits cleanly within the probe timeout.
    pub async fn test_primary(&self) -> bool {
        let path = self.detect_primary_path();
        probe::responds(&path, self.config.probe_timeout()).await
    }

    /// Whether `ffprobe -version` exits cleanly within the probe timeout.
    pub async fn test_probe(&self) -> bool {
        let path = self.detect_probe_path();
        probe::responds(&path, self.config.probe_timeout()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    struct Bundle {
        dir: tempfile::TempDir,
    }
    impl Bundle {
        fn new() -> Self {
            Self { dir: tempfile::tempdir().unwrap() }
        }

        fn path(&self, tool: Tool) -> PathBuf {
            self.dir.path().join("vendor").join(tool.bundle_path())
        }

        fn install(&self, tool: Tool) -> PathBuf {
            let path = self.path(tool);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"").unwrap();
            path
        }

        fn locator(&self) -> BinaryLocator {
            let config = LocatorConfig { search_path: false, ..Default::default() };
            let roots = SearchRoots { working_dir: Some(self.dir.path().to_path_buf()), module_dir: None };
            BinaryLocator::with_roots(config, roots)
        }
    }

    fn bare(tool: Tool) -> PathBuf {
        PathBuf::from(tool.command_name())
    }

    #[test]
    fn test_detection_is_cached() {
        let bundle = Bundle::new();
        let installed = bundle.install(Tool::Ffmpeg);
        let locator = bundle.locator();
        assert_eq!(locator.detect_primary_path(), installed);
        fs::remove_file(&installed).unwrap();
        assert_eq!(locator.detect_primary_path(), installed);
    }

    #[test]
    fn test_falls_back_to_bare_names() {
        let locator = Bundle::new().locator();
        assert_eq!(locator.detect_primary_path(), bare(Tool::Ffmpeg));
        assert_eq!(locator.detect_probe_path(), bare(Tool::Ffprobe));
    }

    #[test]
    fn test_paths_are_lazy() {
        let locator = Bundle::new().locator();
        assert_eq!(locator.paths(), FfmpegPaths::default());
        locator.detect_probe_path();
        assert_eq!(locator.paths(), FfmpegPaths { ffmpeg: None, ffprobe: Some(bare(Tool::Ffprobe)) });
    }

    #[test]
    fn test_validate_applies_detected_paths_once() {
        let bundle = Bundle::new();
        let ffmpeg = bundle.install(Tool::Ffmpeg);
        let ffprobe = bundle.install(Tool::Ffprobe);
        let locator = bundle.locator();
        assert!(locator.toolchain().is_none());
        assert!(locator.validate());
        let toolchain = locator.toolchain().unwrap();
        assert_eq!((toolchain.ffmpeg_path(), toolchain.ffprobe_path()), (ffmpeg.as_path(), ffprobe.as_path()));

        // Validation is not repeated, even once the binary is gone.
        fs::remove_file(&ffmpeg).unwrap();
        assert!(locator.validate());
        assert_eq!(locator.toolchain().unwrap().ffmpeg_path(), ffmpeg);
    }

    #[test]
    fn test_redetect_picks_up_changes() {
        let bundle = Bundle::new();
        let locator = bundle.locator();
        assert_eq!(locator.detect_primary_path(), bare(Tool::Ffmpeg));
        let installed = bundle.install(Tool::Ffmpeg);
        assert_eq!(locator.detect_primary_path(), bare(Tool::Ffmpeg));
        let paths = locator.redetect();
        assert_eq!(paths.ffmpeg, Some(installed.clone()));
        assert_eq!(paths.ffprobe, Some(bare(Tool::Ffprobe)));
        assert_eq!(locator.toolchain().unwrap().ffmpeg_path(), installed);
    }

    #[test]
    fn test_override_invalidates_configuration() {
        let locator = Bundle::new().locator();
        assert!(locator.validate());
        locator.override_paths(FfmpegPaths { ffmpeg: Some("/opt/ffmpeg/bin/ffmpeg".into()), ffprobe: None });
        assert!(locator.toolchain().is_none());
        assert!(locator.validate());
        let toolchain = locator.toolchain().unwrap();
        assert_eq!(toolchain.ffmpeg_path(), Path::new("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(toolchain.ffprobe_path(), bare(Tool::Ffprobe));
    }

    #[test]
    fn test_empty_override_fails_validation() {
        let locator = Bundle::new().locator();
        locator.override_paths(FfmpegPaths { ffmpeg: Some(PathBuf::new()), ffprobe: None });
        assert!(!locator.validate());
        assert!(!locator.validate());
        assert!(locator.toolchain().is_none());
    }

    #[test]
    fn test_configured_override_is_preferred() {
        let bundle = Bundle::new();
        bundle.install(Tool::Ffmpeg);
        let custom = bundle.dir.path().join("custom-ffmpeg");
        fs::write(&custom, b"").unwrap();
        let config = LocatorConfig { ffmpeg_path: Some(custom.clone()), search_path: false, ..Default::default() };
        let roots = SearchRoots { working_dir: Some(bundle.dir.path().to_path_buf()), module_dir: None };
        let locator = BinaryLocator::with_roots(config, roots);
        assert_eq!(locator.detect_primary_path(), custom);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_liveness_uses_detected_paths() {
        use crate::probe::tests::script;
        let bundle = Bundle::new();
        let ffmpeg = bundle.path(Tool::Ffmpeg);
        let ffprobe = bundle.path(Tool::Ffprobe);
        script(ffmpeg.parent().unwrap(), &Tool::Ffmpeg.command_name(), "exit 0");
        script(ffprobe.parent().unwrap(), &Tool::Ffprobe.command_name(), "exit 1");
        let locator = bundle.locator();
        assert!(locator.test_primary().await);
        assert!(!locator.test_probe().await);
    }

    #[tokio::test]
    async fn test_missing_binaries_are_not_alive() {
        let bundle = Bundle::new();
        let locator = bundle.locator();
        locator.override_paths(FfmpegPaths {
            ffmpeg: Some(bundle.path(Tool::Ffmpeg)),
            ffprobe: Some(bundle.path(Tool::Ffprobe)),
        });
        assert!(!locator.test_primary().await);
        assert!(!locator.test_probe().await);
    }
}
