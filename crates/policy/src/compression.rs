use crate::DEFAULT_IMAGE_THRESHOLD;
use crate::format::ImageFormat;
use serde::{Deserialize, Serialize};

const QUALITY_RANGE: (u8, u8) = (1, 100);
const PNG_LEVEL_MAX: u8 = 9;

/// One set of encoder settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTier {
    /// JPEG quality, `1..=100` (higher is better quality, bigger file).
    pub jpeg_quality: u8,
    /// PNG deflate level, `0..=9` (higher is smaller file, slower).
    pub png_compression_level: u8,
    /// WebP quality, `1..=100`.
    pub webp_quality: u8,
}
impl QualityTier {
    pub const STANDARD: Self = Self {
        jpeg_quality: 85,
        png_compression_level: 6,
        webp_quality: 85,
    };
    pub const AGGRESSIVE: Self = Self {
        jpeg_quality: 80,
        png_compression_level: PNG_LEVEL_MAX,
        webp_quality: 80,
    };

    fn clamped(self) -> Self {
        Self {
            jpeg_quality: self.jpeg_quality.clamp(QUALITY_RANGE.0, QUALITY_RANGE.1),
            png_compression_level: self.png_compression_level.min(PNG_LEVEL_MAX),
            webp_quality: self.webp_quality.clamp(QUALITY_RANGE.0, QUALITY_RANGE.1),
        }
    }

    /// Never gentler than `baseline` on any axis.
    fn at_least(self, baseline: Self) -> Self {
        Self {
            jpeg_quality: self.jpeg_quality.min(baseline.jpeg_quality),
            png_compression_level: self.png_compression_level.max(baseline.png_compression_level),
            webp_quality: self.webp_quality.min(baseline.webp_quality),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub enabled: bool,
    /// Files strictly larger than this many bytes use the aggressive tier.
    pub compression_threshold: u64,
    pub standard: QualityTier,
    pub aggressive: QualityTier,
}
impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            compression_threshold: DEFAULT_IMAGE_THRESHOLD,
            standard: QualityTier::STANDARD,
            aggressive: QualityTier::AGGRESSIVE,
        }
    }
}

/// Encoder settings chosen for one upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CompressionDecision {
    pub should_compress: bool,
    pub jpeg_quality: u8,
    pub png_compression_level: u8,
    pub webp_quality: u8,
}

/// Select compression settings for an image of `size` bytes.
///
/// Files above [`CompressionConfig::compression_threshold`] get the
/// aggressive tier. A file exactly at the threshold is still standard.
/// Configured values are clamped into their valid ranges, and the aggressive
/// tier is tightened so it is never gentler than the standard tier, even if
/// the configuration says otherwise.
///
/// `should_compress` is only `true` for raster formats with tunable encoders
/// (JPEG, PNG, WebP); anything else, including unknown MIME types, comes back
/// with `should_compress: false` and the standard tier.
///
/// ```
/// use reel_policy::{CompressionConfig, compression_for_file_size};
///
/// let decision = compression_for_file_size(3_000_000, "image/jpeg", &CompressionConfig::default());
/// assert!(decision.should_compress);
/// assert_eq!(decision.jpeg_quality, 80);
/// assert_eq!(decision.png_compression_level, 9);
/// ```
pub fn compression_for_file_size(size: u64, mime: &str, config: &CompressionConfig) -> CompressionDecision {
    let format = ImageFormat::from_mime(mime);
    let standard = config.standard.clamped();
    let tier = match format {
        Some(_) if size > config.compression_threshold => config.aggressive.clamped().at_least(standard),
        _ => standard,
    };
    CompressionDecision {
        should_compress: config.enabled && format.is_some_and(|f| f.is_compressible()),
        jpeg_quality: tier.jpeg_quality,
        png_compression_level: tier.png_compression_level,
        webp_quality: tier.webp_quality,
    }
}
