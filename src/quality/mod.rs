//! Quality metrics engine
//!
//! Pure functions of two decoded images: nothing here touches the encode
//! path. PSNR uses alpha-stripped RGB samples, SSIM uses luminance.

pub mod psnr;
pub mod ssim;

use image::DynamicImage;
use serde::Serialize;
use std::fmt;

use crate::codec::decode_image;
use crate::constants::{PSNR_CEILING_DB, PSNR_FLOOR_DB, SCORE_PSNR_WEIGHT, SCORE_SSIM_WEIGHT};
use crate::error::CompressionError;

/// Categorical grade derived from the quality score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityGrade {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityGrade {
    pub fn from_score(score: u8) -> Self {
        match score {
            85..=u8::MAX => QualityGrade::Excellent,
            70..=84 => QualityGrade::Good,
            50..=69 => QualityGrade::Fair,
            _ => QualityGrade::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityGrade::Excellent => "excellent",
            QualityGrade::Good => "good",
            QualityGrade::Fair => "fair",
            QualityGrade::Poor => "poor",
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fidelity of a compressed image against its original
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityMetrics {
    /// dB, capped at 100 for identical images
    pub psnr: f64,
    /// In [0, 1]
    pub ssim: f64,
    pub quality_score: u8,
    pub quality_grade: QualityGrade,
}

impl QualityMetrics {
    /// Build from raw PSNR/SSIM, deriving score and grade
    pub fn from_components(psnr: f64, ssim: f64) -> Self {
        let quality_score = quality_score(psnr, ssim);
        Self {
            psnr,
            ssim,
            quality_score,
            quality_grade: QualityGrade::from_score(quality_score),
        }
    }

    /// SSIM as a percentage, the way it is reported
    pub fn ssim_percent(&self) -> f64 {
        self.ssim * 100.0
    }
}

/// PSNR mapped linearly from [20 dB, 50 dB] onto [0, 100]
pub fn normalized_psnr(psnr: f64) -> f64 {
    ((psnr - PSNR_FLOOR_DB) / (PSNR_CEILING_DB - PSNR_FLOOR_DB) * 100.0).clamp(0.0, 100.0)
}

/// `round(0.6 * normalized PSNR + 0.4 * SSIM * 100)`
pub fn quality_score(psnr: f64, ssim: f64) -> u8 {
    let ssim = ssim.clamp(0.0, 1.0);
    let score = SCORE_PSNR_WEIGHT * normalized_psnr(psnr) + SCORE_SSIM_WEIGHT * ssim * 100.0;
    score.round().clamp(0.0, 100.0) as u8
}

/// Compare two decoded images of identical dimensions
pub fn assess_quality(
    original: &DynamicImage,
    compressed: &DynamicImage,
) -> Result<QualityMetrics, CompressionError> {
    let original_dims = (original.width(), original.height());
    let compressed_dims = (compressed.width(), compressed.height());
    if original_dims != compressed_dims {
        return Err(CompressionError::DimensionMismatch {
            original: original_dims,
            compressed: compressed_dims,
        });
    }

    let original_rgb = original.to_rgb8();
    let compressed_rgb = compressed.to_rgb8();

    let psnr = psnr::psnr(original_rgb.as_raw(), compressed_rgb.as_raw());
    let ssim = ssim::ssim(
        &ssim::luma_plane(original_rgb.as_raw()),
        &ssim::luma_plane(compressed_rgb.as_raw()),
        original_dims.0,
        original_dims.1,
    )
    .clamp(0.0, 1.0);

    let metrics = QualityMetrics::from_components(psnr, ssim);
    tracing::debug!(
        psnr = metrics.psnr,
        ssim = metrics.ssim,
        score = metrics.quality_score,
        grade = %metrics.quality_grade,
        "Assessed image quality"
    );
    Ok(metrics)
}

/// Decode both encoded buffers, then [`assess_quality`]
pub fn assess_quality_bytes(
    original: &[u8],
    compressed: &[u8],
) -> Result<QualityMetrics, CompressionError> {
    let original = decode_image(original)?;
    let compressed = decode_image(compressed)?;
    assess_quality(&original, &compressed)
}
