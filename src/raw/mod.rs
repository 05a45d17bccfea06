//! RAW two-stage pipeline
//!
//! 1. Decode the RAW source into an uncompressed TIFF baseline in scratch
//! 2. Re-encode the baseline at a quality kept inside the RAW window
//! 3. Delete the baseline, on every exit path
//!
//! The baseline size is reported so callers can compute ratios against true
//! uncompressed data instead of the already-compressed RAW container.

pub mod decoder;

pub use decoder::{DcrawDecoder, RawDecoder};

use std::path::Path;

use crate::codec::{QualityBounds, RawFormat};
use crate::engine::{Deadline, ScratchFile, ScratchSpace};
use crate::error::CompressionError;

/// Uncompressed intermediate produced by the decode stage
#[derive(Debug)]
pub struct Baseline {
    file: ScratchFile,
    size: u64,
}

impl Baseline {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn read(&self) -> Result<Vec<u8>, CompressionError> {
        self.file.read()
    }
}

/// Encode-stage output plus the baseline size it was measured against
#[derive(Debug)]
pub struct RawOutput<T> {
    pub output: T,
    pub baseline_size: u64,
}

/// Decode, re-encode, clean up
pub struct RawPipeline<'a> {
    decoder: &'a dyn RawDecoder,
    bounds: QualityBounds,
}

impl<'a> RawPipeline<'a> {
    pub fn new(decoder: &'a dyn RawDecoder, bounds: QualityBounds) -> Self {
        Self { decoder, bounds }
    }

    /// Keep the requested quality inside the RAW window, logging adjustments
    pub fn resolve_quality(&self, requested: u8) -> u8 {
        let quality = self.bounds.clamp(requested);
        if quality != requested {
            tracing::warn!(
                requested = requested,
                applied = quality,
                min = self.bounds.min,
                max = self.bounds.max,
                "RAW quality outside allowed window, adjusted"
            );
        }
        quality
    }

    /// Run both stages; `encode` sees the baseline while it still exists
    pub fn run<T, F>(
        &self,
        source: &Path,
        scratch: &ScratchSpace,
        deadline: &Deadline,
        encode: F,
    ) -> Result<RawOutput<T>, CompressionError>
    where
        F: FnOnce(&Baseline) -> Result<T, CompressionError>,
    {
        deadline.check()?;

        let raw_format = RawFormat::from_path(source);
        tracing::info!(
            source = %source.display(),
            raw_format = raw_format.map(|f| f.extension()).unwrap_or("unknown"),
            decoder = self.decoder.name(),
            "Decoding RAW source"
        );

        let mut file = scratch.file("baseline-", "tiff")?;
        let size = self.decoder.decode(source, &mut file, deadline)?;
        let baseline = Baseline { file, size };

        deadline.check()?;
        let output = encode(&baseline)?;

        let baseline_path = baseline.path().to_path_buf();
        drop(baseline);
        tracing::debug!(
            baseline = %baseline_path.display(),
            baseline_size = size,
            "RAW baseline removed"
        );

        Ok(RawOutput {
            output,
            baseline_size: size,
        })
    }
}
