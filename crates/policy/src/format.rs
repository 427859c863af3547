use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Strip parameters (`; charset=...`) and normalise case.
fn essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

/// Broad classification of a stored media asset.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    #[display("IMAGE")]
    Image,
    #[display("VIDEO")]
    Video,
}
impl MediaType {
    /// Classify by the top-level MIME type. Anything that isn't `image/*` or
    /// `video/*` is not media we handle.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = essence(mime);
        match mime.split_once('/') {
            Some(("image", sub)) if !sub.is_empty() => Some(Self::Image),
            Some(("video", sub)) if !sub.is_empty() => Some(Self::Video),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "IMAGE",
            Self::Video => "VIDEO",
        }
    }
}

#[derive(Debug, Display, Error)]
#[display("unknown media type: {_0}")]
pub struct UnknownMediaType(#[error(not(source))] pub String);

impl FromStr for MediaType {
    type Err = UnknownMediaType;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IMAGE" => Ok(Self::Image),
            "VIDEO" => Ok(Self::Video),
            _ => Err(UnknownMediaType(s.to_string())),
        }
    }
}

/// Raster image formats recognised by MIME type.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[display("jpeg")]
    Jpeg,
    #[display("png")]
    Png,
    #[display("gif")]
    Gif,
    #[display("webp")]
    Webp,
    #[display("tiff")]
    Tiff,
    #[display("bmp")]
    Bmp,
    #[display("avif")]
    Avif,
}
impl ImageFormat {
    pub fn from_mime(mime: &str) -> Option<Self> {
        Some(match essence(mime).as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Self::Jpeg,
            "image/png" | "image/apng" => Self::Png,
            "image/gif" => Self::Gif,
            "image/webp" => Self::Webp,
            "image/tiff" => Self::Tiff,
            "image/bmp" | "image/x-ms-bmp" => Self::Bmp,
            "image/avif" => Self::Avif,
            _ => return None,
        })
    }

    /// Canonical MIME type.
    #[must_use]
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
            Self::Avif => "image/avif",
        }
    }

    /// Formats whose encoders take the quality/level knobs in
    /// [`CompressionDecision`](crate::CompressionDecision).
    #[must_use]
    pub fn is_compressible(&self) -> bool {
        matches!(self, Self::Jpeg | Self::Png | Self::Webp)
    }
}
