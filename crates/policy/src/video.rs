use crate::format::MediaType;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::Path;

/// x264/x265 speed presets, fastest first.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[display("ultrafast")]
    Ultrafast,
    #[display("superfast")]
    Superfast,
    #[display("veryfast")]
    Veryfast,
    #[display("faster")]
    Faster,
    #[display("fast")]
    Fast,
    #[display("medium")]
    Medium,
    #[display("slow")]
    Slow,
    #[display("slower")]
    Slower,
    #[display("veryslow")]
    Veryslow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoTier {
    /// Constant rate factor, `0..=51`; higher means smaller and worse.
    pub crf: u8,
    pub preset: Preset,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub enabled: bool,
    pub compression_threshold: u64,
    pub standard: VideoTier,
    pub aggressive: VideoTier,
    pub codec: String,
    pub max_height: u32,
    pub audio_bitrate_kbps: u32,
}
impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            compression_threshold: 50 * 1024 * 1024,
            standard: VideoTier { crf: 23, preset: Preset::Medium },
            aggressive: VideoTier { crf: 28, preset: Preset::Fast },
            codec: "libx264".to_string(),
            max_height: 1080,
            audio_bitrate_kbps: 128,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VideoParams {
    pub should_compress: bool,
    pub codec: String,
    pub crf: u8,
    pub preset: Preset,
    pub max_height: u32,
    pub audio_bitrate_kbps: u32,
}
impl VideoParams {
    /// Arguments for an `ffmpeg` re-encode of `input` into `output`.
    ///
    /// Height is capped at `max_height` (never upscaled) and the width keeps
    /// the aspect ratio, rounded to an even number as most encoders require.
    pub fn ffmpeg_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let crf = self.crf.to_string();
        let preset = self.preset.to_string();
        let scale = format!("scale=-2:'min({},ih)'", self.max_height);
        let audio = format!("{}k", self.audio_bitrate_kbps);
        let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-y".into(), "-i".into(), input.into()];
        args.extend(
            [
                "-c:v",
                self.codec.as_str(),
                "-crf",
                crf.as_str(),
                "-preset",
                preset.as_str(),
                "-vf",
                scale.as_str(),
                "-c:a",
                "aac",
                "-b:a",
                audio.as_str(),
                "-movflags",
                "+faststart",
            ]
            .map(OsString::from),
        );
        args.push(output.into());
        args
    }
}

/// Pick re-encode settings for a video of `size` bytes.
///
/// Same two-tier idea as images: above the threshold the CRF goes up and the
/// preset gets faster. The aggressive CRF is never lower than the standard
/// one.
pub fn video_params(size: u64, mime: &str, config: &VideoConfig) -> VideoParams {
    let standard_crf = config.standard.crf.min(51);
    let tier = match size > config.compression_threshold {
        true => VideoTier {
            crf: config.aggressive.crf.clamp(standard_crf, 51),
            preset: config.aggressive.preset,
        },
        false => VideoTier { crf: standard_crf, preset: config.standard.preset },
    };
    VideoParams {
        should_compress: config.enabled && MediaType::from_mime(mime) == Some(MediaType::Video),
        codec: config.codec.clone(),
        crf: tier.crf,
        preset: tier.preset,
        max_height: config.max_height,
        audio_bitrate_kbps: config.audio_bitrate_kbps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers() {
        let config = VideoConfig::default();
        let small = video_params(10 * 1024 * 1024, "video/mp4", &config);
        let large = video_params(200 * 1024 * 1024, "video/mp4", &config);
        assert_eq!((small.crf, small.preset), (23, Preset::Medium));
        assert_eq!((large.crf, large.preset), (28, Preset::Fast));
        assert!(small.should_compress && large.should_compress);
    }

    #[test]
    fn test_images_are_not_video_compressed() {
        assert!(!video_params(1, "image/png", &VideoConfig::default()).should_compress);
    }

    #[test]
    fn test_aggressive_crf_never_below_standard() {
        let config = VideoConfig {
            aggressive: VideoTier { crf: 10, preset: Preset::Fast },
            ..Default::default()
        };
        assert_eq!(video_params(u64::MAX, "video/mp4", &config).crf, 23);
    }

    #[test]
    fn test_ffmpeg_args() {
        let params = video_params(1, "video/mp4", &VideoConfig::default());
        let args = params.ffmpeg_args(Path::new("in.mov"), Path::new("out.mp4"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args[..4], ["-hide_banner", "-y", "-i", "in.mov"]);
        assert!(args.windows(2).any(|w| w == ["-crf", "23"]));
        assert!(args.windows(2).any(|w| w == ["-preset", "medium"]));
        assert!(args.windows(2).any(|w| w == ["-vf", "scale=-2:'min(1080,ih)'"]));
        assert!(args.windows(2).any(|w| w == ["-b:a", "128k"]));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }
}
