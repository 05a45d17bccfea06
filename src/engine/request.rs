//! Compression request and result types

use serde::Serialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::codec::{clamp_quality, CompressionVariant, OutputFormat, ResizeSpec};
use crate::constants::DEFAULT_QUALITY;
use crate::error::CompressionError;

/// Where the source image comes from
#[derive(Debug, Clone)]
pub enum Source {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl Source {
    /// Source bytes, borrowed when already in memory
    pub fn read(&self) -> Result<Cow<'_, [u8]>, CompressionError> {
        match self {
            Source::Path(path) => Ok(Cow::Owned(std::fs::read(path)?)),
            Source::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Source::Path(path) => Some(path),
            Source::Bytes(_) => None,
        }
    }

    /// Human-readable label for logs
    pub fn describe(&self) -> String {
        match self {
            Source::Path(path) => path.display().to_string(),
            Source::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Bytes(bytes)
    }
}

/// One compression job
#[derive(Debug, Clone)]
pub struct CompressionRequest {
    pub source: Source,
    /// Always within [10, 100]
    pub quality: u8,
    pub format: OutputFormat,
    pub variant: CompressionVariant,
    /// Desired output size in bytes; switches on the target-size search
    pub target_size: Option<u64>,
    pub resize: Option<ResizeSpec>,
    pub web_optimize: bool,
    /// Final location of the encoded file; bytes are returned when absent
    pub output: Option<PathBuf>,
}

impl CompressionRequest {
    pub fn new(source: impl Into<Source>, format: OutputFormat) -> Self {
        Self {
            source: source.into(),
            quality: DEFAULT_QUALITY,
            format,
            variant: CompressionVariant::Standard,
            target_size: None,
            resize: None,
            web_optimize: false,
            output: None,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = clamp_quality(quality);
        self
    }

    pub fn with_variant(mut self, variant: CompressionVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_target_size(mut self, bytes: u64) -> Self {
        self.target_size = Some(bytes);
        self
    }

    pub fn with_resize(mut self, resize: ResizeSpec) -> Self {
        self.resize = Some(resize);
        self
    }

    pub fn with_web_optimize(mut self, enabled: bool) -> Self {
        self.web_optimize = enabled;
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Check invariants that builders cannot enforce on public fields
    pub fn validate(&self) -> Result<(), CompressionError> {
        if self.target_size == Some(0) {
            return Err(CompressionError::invalid_param(
                "target_size",
                "must be a positive number of bytes",
            ));
        }
        if let Some(resize) = self.resize {
            if resize.width == Some(0) || resize.height == Some(0) {
                return Err(CompressionError::invalid_param(
                    "resize",
                    "width and height must be positive",
                ));
            }
        }
        Ok(())
    }
}

/// Outcome of one compression job
#[derive(Debug, Clone, Serialize)]
pub struct CompressionResult {
    /// Encoded bytes, `None` when the output was written to `output`
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub content_type: &'static str,
    /// Size of the source as given (the RAW file for RAW inputs)
    pub original_size: u64,
    pub final_size: u64,
    /// May differ from the request when a variant or search adjusted it
    pub quality_used: u8,
    pub width: u32,
    pub height: u32,
    /// Present only in target-size mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    /// Present only in target-size mode; `false` means best effort
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converged: Option<bool>,
    /// Uncompressed intermediate size, RAW inputs only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_size: Option<u64>,
}

impl CompressionResult {
    /// Denominator for ratio reporting: the baseline for RAW, else the source
    pub fn reference_size(&self) -> u64 {
        self.baseline_size.unwrap_or(self.original_size)
    }

    /// Final size over reference size
    pub fn compression_ratio(&self) -> f64 {
        let reference = self.reference_size();
        if reference == 0 {
            0.0
        } else {
            self.final_size as f64 / reference as f64
        }
    }

    /// Percentage saved against the reference size (negative if it grew)
    pub fn percentage_saved(&self) -> f64 {
        let reference = self.reference_size();
        if reference == 0 {
            0.0
        } else {
            (reference as f64 - self.final_size as f64) / reference as f64 * 100.0
        }
    }

    /// RAW output larger than its baseline: a poor-input signal, not an error
    pub fn exceeds_baseline(&self) -> bool {
        self.baseline_size
            .map(|baseline| self.final_size > baseline)
            .unwrap_or(false)
    }
}
