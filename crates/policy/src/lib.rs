//! Compression policy for uploaded media.
//!
//! Everything in this crate is a pure function of its inputs: a file size, a
//! MIME type, a couple of flags and a configuration struct. Nothing touches
//! the filesystem and nothing can fail. Unknown or unsupported input degrades
//! to the safest decision (don't compress, don't convert) instead of erroring.
//!
//! - [`compression_for_file_size`] picks JPEG/PNG/WebP encoder settings from
//!   one of two tiers (standard, aggressive) split by a size threshold.
//! - [`determine_webp_strategy`] and [`webp_params`] decide whether and how an
//!   image is converted to WebP.
//! - [`video_params`] does the same tiering for video re-encodes.
//! - [`format_file_size`] and [`format_compression_ratio`] are presentation
//!   helpers for logs and reports.

mod compression;
mod display;
mod format;
mod video;
mod webp;

pub use crate::compression::{CompressionConfig, CompressionDecision, QualityTier, compression_for_file_size};
pub use crate::display::{format_compression_ratio, format_file_size};
pub use crate::format::{ImageFormat, MediaType, UnknownMediaType};
pub use crate::video::{Preset, VideoConfig, VideoParams, VideoTier, video_params};
pub use crate::webp::{WebPConfig, WebPParams, WebPStrategy, determine_webp_strategy, webp_params};
use serde::{Deserialize, Serialize};

/// 2 MiB; the default boundary between the standard and aggressive image tiers.
pub const DEFAULT_IMAGE_THRESHOLD: u64 = 2 * 1024 * 1024;

/// Every policy knob in one place, as loaded from configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub compression: CompressionConfig,
    pub webp: WebPConfig,
    pub video: VideoConfig,
}
