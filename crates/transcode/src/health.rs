use crate::{BinaryLocator, FfmpegPaths};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub platform: &'static str,
    pub arch: &'static str,
    pub working_dir: Option<PathBuf>,
}
impl SystemInfo {
    fn current() -> Self {
        Self {
            platform: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            working_dir: std::env::current_dir().ok(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub ffmpeg_available: bool,
    pub ffprobe_available: bool,
    pub system: SystemInfo,
    pub paths: FfmpegPaths,
}
impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.ffmpeg_available && self.ffprobe_available
    }
}

/// Probe both binaries concurrently and describe the host.
#[tracing::instrument(skip_all)]
pub async fn health_check(locator: &BinaryLocator) -> HealthReport {
    let (ffmpeg_available, ffprobe_available) = tokio::join!(locator.test_primary(), locator.test_probe());
    let report = HealthReport {
        ffmpeg_available,
        ffprobe_available,
        system: SystemInfo::current(),
        paths: locator.paths(),
    };
    match report.is_healthy() {
        true => tracing::info!("Transcoder binaries are available"),
        false => tracing::warn!(ffmpeg_available, ffprobe_available, "Transcoder binaries are unavailable"),
    }
    report
}
