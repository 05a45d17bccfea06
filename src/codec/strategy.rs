//! Codec strategy selection
//!
//! Maps `(format, variant, quality)` to a concrete encoder parameter set.
//! Pure: no I/O, no pixel access. Every format/variant pair is resolved by an
//! exhaustive match, so adding a format or variant is a compile-time change.

use serde::Serialize;

use super::format::OutputFormat;
use super::params::{clamp_quality, CompressionVariant, ResizeQuality};
use crate::constants::{AGGRESSIVE_JPEG_QUALITY_DROP, AGGRESSIVE_MODERN_QUALITY_DROP, MIN_QUALITY};

/// Which JPEG implementation produces the bitstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JpegBackend {
    /// Plain baseline encoder from the `image` crate
    Baseline,
    /// mozjpeg with trellis quantization
    Mozjpeg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JpegParams {
    pub quality: u8,
    pub backend: JpegBackend,
    pub progressive: bool,
    pub optimize_scans: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PngParams {
    /// oxipng optimization preset (0-6)
    pub effort: u8,
    /// Strip ancillary chunks during optimization
    pub strip_metadata: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WebPParams {
    pub quality: u8,
    pub lossless: bool,
    /// libwebp near-lossless level, 100 disables preprocessing
    pub near_lossless: u8,
    /// libwebp method (0 = fast, 6 = slowest/best)
    pub method: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvifParams {
    pub quality: u8,
    pub lossless: bool,
    /// ravif speed (1 = slowest/best, 10 = fastest)
    pub speed: u8,
}

/// Concrete, format-specific encoder configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum EncoderParams {
    Jpeg(JpegParams),
    Png(PngParams),
    WebP(WebPParams),
    Avif(AvifParams),
    Tiff,
}

impl EncoderParams {
    pub fn format(&self) -> OutputFormat {
        match self {
            EncoderParams::Jpeg(_) => OutputFormat::Jpeg,
            EncoderParams::Png(_) => OutputFormat::Png,
            EncoderParams::WebP(_) => OutputFormat::WebP,
            EncoderParams::Avif(_) => OutputFormat::Avif,
            EncoderParams::Tiff => OutputFormat::Tiff,
        }
    }

    /// Quality the encoder will actually use
    ///
    /// Lossless encodes report 100.
    pub fn effective_quality(&self) -> u8 {
        match self {
            EncoderParams::Jpeg(p) => p.quality,
            EncoderParams::WebP(p) if p.lossless => 100,
            EncoderParams::WebP(p) => p.quality,
            EncoderParams::Avif(p) if p.lossless => 100,
            EncoderParams::Avif(p) => p.quality,
            EncoderParams::Png(_) | EncoderParams::Tiff => 100,
        }
    }
}

/// Everything the selector needs to pick encoder parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyInput {
    pub format: OutputFormat,
    pub variant: CompressionVariant,
    pub quality: u8,
    pub resize_quality: ResizeQuality,
    pub web_optimize: bool,
}

/// Resolved strategy: encoder parameters plus the pixel-stage settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeStrategy {
    pub params: EncoderParams,
    pub resize_quality: ResizeQuality,
    /// Correct orientation, stretch the histogram and strip metadata
    pub web_optimize: bool,
}

fn reduce(quality: u8, drop: u8) -> u8 {
    quality.saturating_sub(drop).max(MIN_QUALITY)
}

/// Resolve the encoder strategy for a request
pub fn select_strategy(input: StrategyInput) -> EncodeStrategy {
    let quality = clamp_quality(input.quality);

    let params = match input.format {
        OutputFormat::Jpeg => EncoderParams::Jpeg(jpeg_params(input.variant, quality)),
        OutputFormat::WebP => EncoderParams::WebP(webp_params(input.variant, quality)),
        OutputFormat::Avif => EncoderParams::Avif(avif_params(input.variant, quality)),
        OutputFormat::Png => EncoderParams::Png(PngParams {
            effort: match input.variant {
                CompressionVariant::Aggressive => 4,
                _ => 2,
            },
            strip_metadata: input.web_optimize,
        }),
        OutputFormat::Tiff => EncoderParams::Tiff,
    };

    tracing::debug!(
        format = %input.format,
        variant = input.variant.as_str(),
        requested_quality = input.quality,
        effective_quality = params.effective_quality(),
        web_optimize = input.web_optimize,
        "Resolved encoder strategy"
    );

    EncodeStrategy {
        params,
        resize_quality: input.resize_quality,
        web_optimize: input.web_optimize,
    }
}

fn jpeg_params(variant: CompressionVariant, quality: u8) -> JpegParams {
    match variant {
        CompressionVariant::Standard => JpegParams {
            quality,
            backend: JpegBackend::Baseline,
            progressive: false,
            optimize_scans: false,
        },
        CompressionVariant::Aggressive => JpegParams {
            quality: reduce(quality, AGGRESSIVE_JPEG_QUALITY_DROP),
            backend: JpegBackend::Mozjpeg,
            progressive: true,
            optimize_scans: true,
        },
        CompressionVariant::Lossless => JpegParams {
            quality: 100,
            backend: JpegBackend::Baseline,
            progressive: false,
            optimize_scans: false,
        },
        CompressionVariant::MozjpegEquivalent => JpegParams {
            quality,
            backend: JpegBackend::Mozjpeg,
            progressive: true,
            optimize_scans: true,
        },
        // Scan layout needs the mozjpeg backend; the baseline encoder is
        // sequential only.
        CompressionVariant::Progressive => JpegParams {
            quality,
            backend: JpegBackend::Mozjpeg,
            progressive: true,
            optimize_scans: true,
        },
    }
}

fn webp_params(variant: CompressionVariant, quality: u8) -> WebPParams {
    match variant {
        CompressionVariant::Aggressive => WebPParams {
            quality: reduce(quality, AGGRESSIVE_MODERN_QUALITY_DROP),
            lossless: false,
            near_lossless: 100,
            method: 6,
        },
        CompressionVariant::Lossless => WebPParams {
            quality: 100,
            lossless: true,
            near_lossless: 100,
            method: 4,
        },
        CompressionVariant::Standard
        | CompressionVariant::MozjpegEquivalent
        | CompressionVariant::Progressive => WebPParams {
            quality,
            lossless: false,
            near_lossless: 100,
            method: 4,
        },
    }
}

fn avif_params(variant: CompressionVariant, quality: u8) -> AvifParams {
    match variant {
        CompressionVariant::Aggressive => AvifParams {
            quality: reduce(quality, AGGRESSIVE_MODERN_QUALITY_DROP),
            lossless: false,
            speed: 8,
        },
        CompressionVariant::Lossless => AvifParams {
            quality: 100,
            lossless: true,
            speed: 10,
        },
        CompressionVariant::Standard
        | CompressionVariant::MozjpegEquivalent
        | CompressionVariant::Progressive => AvifParams {
            quality,
            lossless: false,
            speed: 6,
        },
    }
}
