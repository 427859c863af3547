use crate::PolicyConfig;
use crate::format::ImageFormat;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// How (and whether) an image gets converted to WebP.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebPStrategy {
    #[display("LOSSY")]
    Lossy,
    #[display("LOSSLESS")]
    Lossless,
    #[display("ANIMATED")]
    Animated,
    #[display("SKIP")]
    Skip,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebPConfig {
    pub enabled: bool,
    /// Convert animated input (GIF, APNG) to animated WebP.
    pub convert_animated: bool,
    /// Input formats eligible for conversion.
    pub supported_formats: Vec<ImageFormat>,
    /// Inputs larger than this are left alone.
    pub max_file_size: u64,
    pub quality: u8,
    /// Lossy quality for inputs above the compression threshold.
    pub large_file_quality: u8,
    pub lossless_quality: u8,
    pub animated_quality: u8,
    /// Encoder effort, `0..=6`.
    pub effort: u8,
}
impl Default for WebPConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            convert_animated: true,
            supported_formats: vec![
                ImageFormat::Jpeg,
                ImageFormat::Png,
                ImageFormat::Gif,
                ImageFormat::Tiff,
                ImageFormat::Bmp,
            ],
            max_file_size: 50 * 1024 * 1024,
            quality: 85,
            large_file_quality: 80,
            lossless_quality: 100,
            animated_quality: 75,
            effort: 4,
        }
    }
}

/// Concrete encoder parameters for one conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct WebPParams {
    pub quality: u8,
    pub effort: u8,
    pub lossless: bool,
}

/// Decide how an image should be converted to WebP.
///
/// Checks run in a fixed order and the first match wins:
///
/// 1. conversion disabled → [`Skip`](WebPStrategy::Skip)
/// 2. unrecognised or unsupported format → [`Skip`](WebPStrategy::Skip)
/// 3. already WebP → [`Skip`](WebPStrategy::Skip)
/// 4. larger than [`WebPConfig::max_file_size`] → [`Skip`](WebPStrategy::Skip)
/// 5. animated, with animated conversion enabled → [`Animated`](WebPStrategy::Animated)
/// 6. PNG with an alpha channel → [`Lossless`](WebPStrategy::Lossless)
/// 7. anything else → [`Lossy`](WebPStrategy::Lossy)
///
/// Animation is checked before transparency so a transparent APNG keeps its
/// frames, and transparency before the lossy fallback so alpha edges don't
/// get smeared.
pub fn determine_webp_strategy(
    mime: &str,
    size: u64,
    has_transparency: bool,
    is_animated: bool,
    config: &WebPConfig,
) -> WebPStrategy {
    if !config.enabled {
        return WebPStrategy::Skip;
    }
    let Some(format) = ImageFormat::from_mime(mime) else {
        return WebPStrategy::Skip;
    };
    if format == ImageFormat::Webp || !config.supported_formats.contains(&format) {
        return WebPStrategy::Skip;
    }
    if size > config.max_file_size {
        return WebPStrategy::Skip;
    }
    if is_animated && config.convert_animated {
        return WebPStrategy::Animated;
    }
    if format == ImageFormat::Png && has_transparency {
        return WebPStrategy::Lossless;
    }
    WebPStrategy::Lossy
}

/// Map a strategy onto encoder parameters.
///
/// Only [`Lossy`](WebPStrategy::Lossy) is tiered by size, using the same
/// [`compression_threshold`](crate::CompressionConfig::compression_threshold)
/// as [`compression_for_file_size`](crate::compression_for_file_size) so both
/// agree on which tier a file is in. Lossless and animated output use fixed
/// quality. [`Skip`](WebPStrategy::Skip) has no parameters.
pub fn webp_params(strategy: WebPStrategy, size: u64, policy: &PolicyConfig) -> Option<WebPParams> {
    let config = &policy.webp;
    let effort = config.effort.min(6);
    let params = match strategy {
        WebPStrategy::Skip => return None,
        WebPStrategy::Lossy => {
            let standard = quality(config.quality);
            let quality = match size > policy.compression.compression_threshold {
                true => quality(config.large_file_quality).min(standard),
                false => standard,
            };
            WebPParams { quality, effort, lossless: false }
        },
        WebPStrategy::Lossless => WebPParams {
            quality: quality(config.lossless_quality),
            effort,
            lossless: true,
        },
        WebPStrategy::Animated => WebPParams {
            quality: quality(config.animated_quality),
            effort,
            lossless: false,
        },
    };
    Some(params)
}

fn quality(q: u8) -> u8 {
    q.clamp(1, 100)
}
