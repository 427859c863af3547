use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use reel_policy::VideoParams;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Validated binary paths, ready to run transcoding jobs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Toolchain {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}
impl Toolchain {
    /// Returns `None` if either path is empty.
    pub(crate) fn new(ffmpeg: PathBuf, ffprobe: PathBuf) -> Option<Self> {
        if ffmpeg.as_os_str().is_empty() || ffprobe.as_os_str().is_empty() {
            return None;
        }
        Some(Self { ffmpeg, ffprobe })
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn ffprobe_path(&self) -> &Path {
        &self.ffprobe
    }

    pub fn ffmpeg(&self) -> Command {
        command(&self.ffmpeg)
    }

    pub fn ffprobe(&self) -> Command {
        command(&self.ffprobe)
    }

    /// Re-encode `input` into `output` with the given parameters.
    #[tracing::instrument(skip(self, params), fields(input = %input.display(), output = %output.display(), crf = params.crf))]
    pub async fn transcode_video(&self, params: &VideoParams, input: &Path, output: &Path) -> Result<()> {
        let status = self
            .ffmpeg()
            .args(params.ffmpeg_args(input, output))
            .status()
            .await
            .or_raise(|| ErrorKind::Spawn(self.ffmpeg.clone()))?;
        match status.code() {
            Some(0) => {
                tracing::info!("Video transcoded");
                Ok(())
            },
            Some(code) => Err(exn::Exn::from(ErrorKind::Failed(code))),
            None => Err(exn::Exn::from(ErrorKind::Terminated)),
        }
    }
}

fn command(program: &Path) -> Command {
    let mut command = Command::new(program);
    command.stdin(Stdio::null()).stdout(Stdio::null()).kill_on_drop(true);
    command
}
