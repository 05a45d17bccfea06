//! Compression engine
//!
//! [`Engine`] is the entry point: it resolves a strategy per request, runs
//! the pixel stage once, then either encodes a single time or drives the
//! target-size search. RAW sources are routed through the two-stage RAW
//! pipeline first. The engine holds no mutable state, so clones share
//! configuration and can run on any thread.

pub mod deadline;
pub mod request;
pub mod scratch;
pub mod target;

pub use deadline::{guard, run_guarded, Deadline, JobKind, TimeoutPolicy};
pub use request::{CompressionRequest, CompressionResult, Source};
pub use scratch::{ScratchFile, ScratchSpace};
pub use target::{SearchOutcome, TargetSizePolicy};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use rayon::prelude::*;

use crate::codec::{
    prepare, select_strategy, CompressionVariant, EncodeStrategy, EncodedImage, EncoderFactory,
    OutputFormat, PrepareOptions, PreparedImage, QualityBounds, RawFormat, SourceFormat, StrategyInput,
};
use crate::config::EngineConfig;
use crate::error::CompressionError;
use crate::quality::{self, QualityMetrics};
use crate::raw::{DcrawDecoder, RawDecoder, RawPipeline};

/// Where the encoded bytes ended up
#[derive(Debug)]
struct Delivered {
    data: Option<Vec<u8>>,
    output: Option<PathBuf>,
    size: u64,
}

/// Encode-stage outcome before it is turned into a [`CompressionResult`]
#[derive(Debug)]
struct Encoded {
    delivered: Delivered,
    quality: u8,
    width: u32,
    height: u32,
    iterations: Option<u32>,
    converged: Option<bool>,
}

/// Stateless compression engine
#[derive(Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    raw_decoder: Arc<dyn RawDecoder>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("raw_decoder", &self.raw_decoder.name())
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Engine using the configured subprocess RAW decoder
    pub fn new(config: EngineConfig) -> Self {
        let decoder = DcrawDecoder::from_config(&config.raw);
        Self::with_raw_decoder(config, Arc::new(decoder))
    }

    pub fn with_raw_decoder(config: EngineConfig, raw_decoder: Arc<dyn RawDecoder>) -> Self {
        Self {
            config: Arc::new(config),
            raw_decoder,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::from_config(&self.config.timeouts)
    }

    /// New request carrying the configured default quality
    pub fn request(&self, source: impl Into<Source>, format: OutputFormat) -> CompressionRequest {
        CompressionRequest::new(source, format).with_quality(self.config.default_quality)
    }

    /// Single-shot encode of a raster source at the request's quality
    pub fn encode(
        &self,
        request: &CompressionRequest,
        deadline: &Deadline,
    ) -> Result<CompressionResult, CompressionError> {
        request.validate()?;
        deadline.check()?;

        let data = request.source.read()?;
        ensure_raster(request, &data)?;
        let prepared = prepare(&data, &prepare_options(request))?;
        deadline.check()?;

        let scratch = self.scratch()?;
        let encoded = self.encode_once(&prepared, request, request.quality, &scratch, deadline)?;
        Ok(self.finish(request, encoded, data.len() as u64, None))
    }

    /// Search for the quality whose output lands near `target_bytes`
    ///
    /// Never fails for lack of convergence: the last attempt comes back with
    /// `converged == Some(false)`.
    pub fn encode_to_target_size(
        &self,
        request: &CompressionRequest,
        target_bytes: u64,
        bounds: QualityBounds,
        deadline: &Deadline,
    ) -> Result<CompressionResult, CompressionError> {
        request.validate()?;
        deadline.check()?;

        let data = request.source.read()?;
        ensure_raster(request, &data)?;
        let prepared = prepare(&data, &prepare_options(request))?;

        let scratch = self.scratch()?;
        let encoded =
            self.encode_searching(&prepared, request, target_bytes, bounds, &scratch, deadline)?;
        Ok(self.finish(request, encoded, data.len() as u64, None))
    }

    /// Decode a RAW file to a baseline and re-encode it
    ///
    /// Quality defaults to the configured default and is kept inside the RAW
    /// quality window.
    pub fn encode_raw(
        &self,
        source: &Path,
        format: OutputFormat,
        quality: Option<u8>,
        deadline: &Deadline,
    ) -> Result<CompressionResult, CompressionError> {
        let request = CompressionRequest::new(source.to_path_buf(), format)
            .with_quality(quality.unwrap_or(self.config.default_quality));
        self.encode_raw_request(&request, deadline)
    }

    /// Route a request to the RAW, target-size or single-shot path
    pub fn compress(
        &self,
        request: &CompressionRequest,
        deadline: &Deadline,
    ) -> Result<CompressionResult, CompressionError> {
        request.validate()?;

        let result = if is_raw_source(&request.source) {
            self.encode_raw_request(request, deadline)
        } else if let Some(target) = request.target_size {
            self.encode_to_target_size(request, target, self.config.target_bounds(), deadline)
        } else {
            self.encode(request, deadline)
        };

        match &result {
            Ok(done) => tracing::info!(
                source = %request.source.describe(),
                format = %done.format,
                original_size = done.original_size,
                final_size = done.final_size,
                quality = done.quality_used,
                saved_pct = done.percentage_saved(),
                "Compression finished"
            ),
            Err(e) => tracing::warn!(
                source = %request.source.describe(),
                format = %request.format,
                error = %e,
                "Compression failed"
            ),
        }
        result
    }

    /// Compress many requests in parallel under one shared deadline
    ///
    /// Results come back in input order; one failure does not stop the rest.
    pub fn compress_batch(
        &self,
        requests: &[CompressionRequest],
        deadline: &Deadline,
    ) -> Vec<Result<CompressionResult, CompressionError>> {
        let results: Vec<_> = requests
            .par_iter()
            .map(|request| self.compress(request, deadline))
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        tracing::info!(
            total = results.len(),
            failed = failed,
            "Batch finished"
        );
        results
    }

    /// [`Engine::compress`] on the blocking pool, bounded by `deadline`
    ///
    /// On timeout the caller gets `EncodeTimeout` right away; the abandoned
    /// work stops at its next deadline check and cleans up its scratch files.
    pub async fn compress_guarded(
        &self,
        request: CompressionRequest,
        deadline: Deadline,
    ) -> Result<CompressionResult, CompressionError> {
        let engine = self.clone();
        run_guarded(deadline, move |deadline| engine.compress(&request, &deadline)).await
    }

    /// [`Engine::compress_batch`] on the blocking pool, bounded by `deadline`
    pub async fn compress_batch_guarded(
        &self,
        requests: Vec<CompressionRequest>,
        deadline: Deadline,
    ) -> Result<Vec<Result<CompressionResult, CompressionError>>, CompressionError> {
        let engine = self.clone();
        run_guarded(deadline, move |deadline| {
            Ok(engine.compress_batch(&requests, &deadline))
        })
        .await
    }

    /// PSNR/SSIM/score/grade of `compressed` against `original`
    pub fn assess_quality(
        &self,
        original: &DynamicImage,
        compressed: &DynamicImage,
    ) -> Result<QualityMetrics, CompressionError> {
        quality::assess_quality(original, compressed)
    }

    /// Optional assessment on encoded bytes; failures are logged, not raised
    pub fn try_assess(&self, original: &[u8], compressed: &[u8]) -> Option<QualityMetrics> {
        match quality::assess_quality_bytes(original, compressed) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                tracing::warn!(error = %e, "Quality assessment skipped");
                None
            }
        }
    }

    fn scratch(&self) -> Result<ScratchSpace, CompressionError> {
        ScratchSpace::new(self.config.scratch_dir.as_deref())
    }

    fn strategy(&self, request: &CompressionRequest, quality: u8) -> EncodeStrategy {
        select_strategy(StrategyInput {
            format: request.format,
            variant: request.variant,
            quality,
            resize_quality: request
                .resize
                .map(|r| r.quality)
                .unwrap_or_default(),
            web_optimize: request.web_optimize,
        })
    }

    fn encode_once(
        &self,
        prepared: &PreparedImage,
        request: &CompressionRequest,
        quality: u8,
        scratch: &ScratchSpace,
        deadline: &Deadline,
    ) -> Result<Encoded, CompressionError> {
        let strategy = self.strategy(request, quality);
        let encoded = run_encoder(prepared, &strategy)?;
        let quality = encoded.quality;
        let delivered = deliver_bytes(encoded, request.output.as_deref(), scratch, deadline)?;

        Ok(Encoded {
            delivered,
            quality,
            width: prepared.width,
            height: prepared.height,
            iterations: None,
            converged: None,
        })
    }

    fn encode_searching(
        &self,
        prepared: &PreparedImage,
        request: &CompressionRequest,
        target_bytes: u64,
        bounds: QualityBounds,
        scratch: &ScratchSpace,
        deadline: &Deadline,
    ) -> Result<Encoded, CompressionError> {
        let mut policy = TargetSizePolicy::from_config(&self.config.target_size).with_bounds(bounds);
        if !request.format.is_lossy() || request.variant == CompressionVariant::Lossless {
            // Quality does not change the size of lossless encodes
            tracing::debug!(
                format = %request.format,
                variant = request.variant.as_str(),
                "Lossless encode, single target-size attempt"
            );
            policy = policy.with_max_iterations(1);
        }

        let outcome = target::search(target_bytes, &policy, deadline, |quality| {
            let strategy = self.strategy(request, quality);
            let encoded = run_encoder(prepared, &strategy)?;
            let mut file = scratch.file("attempt-", request.format.extension())?;
            file.write_all(&encoded.data)?;
            let size = file.len()?;
            Ok(((file, encoded.quality), size))
        })?;

        let (file, quality) = outcome.artifact;
        let delivered = deliver_file(file, request.output.as_deref(), deadline)?;

        Ok(Encoded {
            delivered,
            quality,
            width: prepared.width,
            height: prepared.height,
            iterations: Some(outcome.iterations),
            converged: Some(outcome.converged),
        })
    }

    fn encode_raw_request(
        &self,
        request: &CompressionRequest,
        deadline: &Deadline,
    ) -> Result<CompressionResult, CompressionError> {
        request.validate()?;
        let source = request.source.path().ok_or_else(|| {
            CompressionError::invalid_param("source", "RAW input must be a file path")
        })?;
        let original_size = std::fs::metadata(source)?.len();

        let scratch = self.scratch()?;
        let bounds = self.config.raw_bounds();
        let pipeline = RawPipeline::new(self.raw_decoder.as_ref(), bounds);
        let quality = pipeline.resolve_quality(request.quality);

        let raw = pipeline.run(source, &scratch, deadline, |baseline| {
            let data = baseline.read()?;
            let prepared = prepare(&data, &prepare_options(request))?;
            deadline.check()?;
            match request.target_size {
                Some(target) => {
                    self.encode_searching(&prepared, request, target, bounds, &scratch, deadline)
                }
                None => self.encode_once(&prepared, request, quality, &scratch, deadline),
            }
        })?;

        let result = self.finish(request, raw.output, original_size, Some(raw.baseline_size));
        if result.exceeds_baseline() {
            tracing::warn!(
                source = %source.display(),
                baseline_size = raw.baseline_size,
                final_size = result.final_size,
                "RAW output is larger than its uncompressed baseline"
            );
        }
        Ok(result)
    }

    fn finish(
        &self,
        request: &CompressionRequest,
        encoded: Encoded,
        original_size: u64,
        baseline_size: Option<u64>,
    ) -> CompressionResult {
        CompressionResult {
            data: encoded.delivered.data,
            output: encoded.delivered.output,
            format: request.format,
            content_type: request.format.content_type(),
            original_size,
            final_size: encoded.delivered.size,
            quality_used: encoded.quality,
            width: encoded.width,
            height: encoded.height,
            iterations: encoded.iterations,
            converged: encoded.converged,
            baseline_size,
        }
    }
}

fn prepare_options(request: &CompressionRequest) -> PrepareOptions {
    PrepareOptions {
        resize: request.resize,
        web_optimize: request.web_optimize,
    }
}

fn is_raw_source(source: &Source) -> bool {
    source.path().and_then(RawFormat::from_path).is_some()
}

/// Reject RAW and unknown inputs on the raster-only paths
fn ensure_raster(request: &CompressionRequest, data: &[u8]) -> Result<(), CompressionError> {
    match SourceFormat::detect(request.source.path(), data)? {
        SourceFormat::Raster(_) => Ok(()),
        SourceFormat::Raw(raw) => Err(CompressionError::invalid_param(
            "source",
            format!("{} is a RAW format, use the RAW pipeline", raw.extension()),
        )),
    }
}

fn run_encoder(
    prepared: &PreparedImage,
    strategy: &EncodeStrategy,
) -> Result<EncodedImage, CompressionError> {
    let encoder = EncoderFactory::create(strategy.params);
    encoder.encode(&prepared.rgba, prepared.width, prepared.height)
}

fn deliver_bytes(
    encoded: EncodedImage,
    output: Option<&Path>,
    scratch: &ScratchSpace,
    deadline: &Deadline,
) -> Result<Delivered, CompressionError> {
    match output {
        Some(dest) => {
            let mut file = scratch.file("final-", encoded.format.extension())?;
            file.write_all(&encoded.data)?;
            deliver_file(file, Some(dest), deadline)
        }
        None => Ok(Delivered {
            size: encoded.data.len() as u64,
            data: Some(encoded.data),
            output: None,
        }),
    }
}

/// Hand the final artifact over, promoting it only while the deadline holds
///
/// A job abandoned by the Timeout Guard fails here and its scratch file is
/// dropped, so the destination is never written after a timeout.
fn deliver_file(
    file: ScratchFile,
    output: Option<&Path>,
    deadline: &Deadline,
) -> Result<Delivered, CompressionError> {
    let size = file.len()?;
    match output {
        Some(dest) => {
            deadline.check()?;
            Ok(Delivered {
                data: None,
                output: Some(file.promote(dest)?),
                size,
            })
        }
        None => Ok(Delivered {
            data: Some(file.read()?),
            output: None,
            size,
        }),
    }
}
