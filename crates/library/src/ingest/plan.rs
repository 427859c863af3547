use reel_policy::{
    CompressionDecision, MediaType, PolicyConfig, VideoParams, WebPParams, WebPStrategy, compression_for_file_size,
    determine_webp_strategy, video_params, webp_params,
};
use serde::Serialize;

/// Everything the upload pipeline needs to know before encoding a file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IngestPlan {
    Image {
        compression: CompressionDecision,
        webp: WebPStrategy,
        /// `None` when `webp` is [`Skip`](WebPStrategy::Skip).
        webp_params: Option<WebPParams>,
    },
    Video(VideoParams),
    /// Neither an image nor a video; store as-is or reject.
    Unsupported,
}
impl IngestPlan {
    pub fn media_type(&self) -> Option<MediaType> {
        match self {
            Self::Image { .. } => Some(MediaType::Image),
            Self::Video(_) => Some(MediaType::Video),
            Self::Unsupported => None,
        }
    }
}

/// Gather every policy decision for one upload.
///
/// Transparency and animation flags are ignored for video.
pub fn plan_upload(
    size: u64,
    mime: &str,
    has_transparency: bool,
    is_animated: bool,
    config: &PolicyConfig,
) -> IngestPlan {
    let plan = match MediaType::from_mime(mime) {
        Some(MediaType::Image) => {
            let webp = determine_webp_strategy(mime, size, has_transparency, is_animated, &config.webp);
            IngestPlan::Image {
                compression: compression_for_file_size(size, mime, &config.compression),
                webp,
                webp_params: webp_params(webp, size, config),
            }
        },
        Some(MediaType::Video) => IngestPlan::Video(video_params(size, mime, &config.video)),
        None => IngestPlan::Unsupported,
    };
    tracing::debug!(size, mime, ?plan, "Planned upload");
    plan
}
