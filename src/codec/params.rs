//! Compression parameters: variants, resize settings and quality bounds

use fast_image_resize::{FilterType, ResizeAlg};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::{MAX_QUALITY, MIN_QUALITY};
use crate::error::CompressionError;

/// Clamp a requested quality into the engine-wide domain [10, 100]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_QUALITY, MAX_QUALITY)
}

/// Named preset of encoder parameters layered on top of a base quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionVariant {
    #[default]
    Standard,
    Aggressive,
    Lossless,
    /// Higher-compression JPEG backend (trellis quantization, optimized scans)
    MozjpegEquivalent,
    Progressive,
}

impl CompressionVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Aggressive => "aggressive",
            Self::Lossless => "lossless",
            Self::MozjpegEquivalent => "mozjpeg",
            Self::Progressive => "progressive",
        }
    }
}

impl FromStr for CompressionVariant {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(CompressionVariant::Standard),
            "aggressive" => Ok(CompressionVariant::Aggressive),
            "lossless" => Ok(CompressionVariant::Lossless),
            "mozjpeg" | "mozjpeg-equivalent" => Ok(CompressionVariant::MozjpegEquivalent),
            "progressive" => Ok(CompressionVariant::Progressive),
            _ => Err(CompressionError::invalid_param(
                "variant",
                format!("unknown variant: {}", s),
            )),
        }
    }
}

/// Resampling quality requested for resize operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeQuality {
    #[default]
    Lanczos,
    Bicubic,
    Bilinear,
    Nearest,
}

impl ResizeQuality {
    /// Resampling algorithm closest to the requested kernel
    pub fn algorithm(&self) -> ResizeAlg {
        match self {
            ResizeQuality::Lanczos => ResizeAlg::Convolution(FilterType::Lanczos3),
            ResizeQuality::Bicubic => ResizeAlg::Convolution(FilterType::CatmullRom),
            ResizeQuality::Bilinear => ResizeAlg::Convolution(FilterType::Bilinear),
            ResizeQuality::Nearest => ResizeAlg::Nearest,
        }
    }
}

impl FromStr for ResizeQuality {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lanczos" | "lanczos3" => Ok(ResizeQuality::Lanczos),
            "bicubic" | "cubic" => Ok(ResizeQuality::Bicubic),
            "bilinear" | "linear" => Ok(ResizeQuality::Bilinear),
            "nearest" => Ok(ResizeQuality::Nearest),
            _ => Err(CompressionError::invalid_param(
                "resize_quality",
                format!("unknown resize quality: {}", s),
            )),
        }
    }
}

/// Requested output box; the image is fitted inside it, never enlarged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResizeSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default)]
    pub quality: ResizeQuality,
}

impl ResizeSpec {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width,
            height,
            quality: ResizeQuality::default(),
        }
    }

    pub fn with_quality(mut self, quality: ResizeQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Target dimensions for a source of `src_width` x `src_height`
    ///
    /// Aspect ratio is preserved and the result never exceeds the source.
    pub fn target_dimensions(&self, src_width: u32, src_height: u32) -> (u32, u32) {
        let scale_w = self
            .width
            .map(|w| w as f64 / src_width.max(1) as f64)
            .unwrap_or(f64::INFINITY);
        let scale_h = self
            .height
            .map(|h| h as f64 / src_height.max(1) as f64)
            .unwrap_or(f64::INFINITY);

        let scale = scale_w.min(scale_h).min(1.0);
        if !scale.is_finite() || scale >= 1.0 {
            return (src_width, src_height);
        }

        let width = ((src_width as f64 * scale).round() as u32).max(1);
        let height = ((src_height as f64 * scale).round() as u32).max(1);
        (width, height)
    }
}

/// Inclusive quality range a search may move within
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityBounds {
    pub min: u8,
    pub max: u8,
}

impl QualityBounds {
    /// Build bounds inside [10, 100]; swapped inputs are reordered
    pub fn new(min: u8, max: u8) -> Self {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min: clamp_quality(lo),
            max: clamp_quality(hi),
        }
    }

    pub fn clamp(&self, quality: u8) -> u8 {
        quality.clamp(self.min, self.max)
    }

    pub fn contains(&self, quality: u8) -> bool {
        (self.min..=self.max).contains(&quality)
    }
}
