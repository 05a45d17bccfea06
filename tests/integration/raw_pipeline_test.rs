//! RAW two-stage pipeline with injected decoders

use super::test_images::*;
use pixelsqueeze::codec::OutputFormat;
use pixelsqueeze::engine::{CompressionRequest, Deadline, Engine, ScratchFile};
use pixelsqueeze::raw::{DcrawDecoder, RawDecoder};
use pixelsqueeze::{CompressionError, EngineConfig};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Writes a prepared baseline and records every baseline path it was given
struct FakeDecoder {
    baseline: Vec<u8>,
    paths: Mutex<Vec<PathBuf>>,
}

impl FakeDecoder {
    fn new(baseline: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            baseline,
            paths: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<PathBuf> {
        self.paths.lock().unwrap().clone()
    }
}

impl RawDecoder for FakeDecoder {
    fn name(&self) -> &str {
        "fake-raw"
    }

    fn decode(
        &self,
        _source: &Path,
        baseline: &mut ScratchFile,
        _deadline: &Deadline,
    ) -> Result<u64, CompressionError> {
        self.paths.lock().unwrap().push(baseline.path().to_path_buf());
        baseline.write_all(&self.baseline)?;
        baseline.len()
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    source: PathBuf,
    scratch: PathBuf,
}

fn fixture(name: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join(name);
    std::fs::write(&source, vec![0x42u8; 4096]).unwrap();
    let scratch = dir.path().join("scratch");
    std::fs::create_dir_all(&scratch).unwrap();
    Fixture {
        _dir: dir,
        source,
        scratch,
    }
}

fn engine_with(decoder: Arc<FakeDecoder>, scratch: &Path) -> Engine {
    let config = EngineConfig {
        scratch_dir: Some(scratch.to_path_buf()),
        ..Default::default()
    };
    Engine::with_raw_decoder(config, decoder)
}

#[test]
fn test_encode_raw_reports_baseline_and_cleans_up() {
    let fx = fixture("shot.cr2");
    let baseline = tiff_bytes(&textured(120, 80));
    let decoder = FakeDecoder::new(baseline.clone());
    let engine = engine_with(decoder.clone(), &fx.scratch);

    let result = engine
        .encode_raw(&fx.source, OutputFormat::Jpeg, Some(85), &Deadline::unbounded())
        .unwrap();

    assert_eq!(result.baseline_size, Some(baseline.len() as u64));
    assert_eq!(result.original_size, 4096);
    assert_eq!(result.reference_size(), baseline.len() as u64);
    assert_eq!(result.quality_used, 85);
    assert_eq!((result.width, result.height), (120, 80));
    assert!(result.final_size < baseline.len() as u64);

    let seen = decoder.seen();
    assert_eq!(seen.len(), 1);
    assert!(!seen[0].exists());
    assert_eq!(std::fs::read_dir(&fx.scratch).unwrap().count(), 0);
}

#[test]
fn test_baseline_deleted_when_encode_stage_fails() {
    let fx = fixture("shot.nef");
    // Not an image: the encode stage fails after the baseline exists
    let decoder = FakeDecoder::new(b"corrupted baseline".to_vec());
    let engine = engine_with(decoder.clone(), &fx.scratch);

    let err = engine
        .encode_raw(&fx.source, OutputFormat::Jpeg, None, &Deadline::unbounded())
        .unwrap_err();
    assert!(matches!(err, CompressionError::DecodeFailed { .. }));

    let seen = decoder.seen();
    assert_eq!(seen.len(), 1);
    assert!(!seen[0].exists());
    assert_eq!(std::fs::read_dir(&fx.scratch).unwrap().count(), 0);
}

#[test]
fn test_raw_quality_is_clamped_into_window() {
    let fx = fixture("shot.arw");
    let decoder = FakeDecoder::new(tiff_bytes(&textured(64, 64)));
    let engine = engine_with(decoder, &fx.scratch);

    let low = engine
        .encode_raw(&fx.source, OutputFormat::Jpeg, Some(20), &Deadline::unbounded())
        .unwrap();
    assert_eq!(low.quality_used, 75);

    let high = engine
        .encode_raw(&fx.source, OutputFormat::Jpeg, Some(100), &Deadline::unbounded())
        .unwrap();
    assert_eq!(high.quality_used, 95);
}

#[test]
fn test_compress_routes_raw_extension() {
    let fx = fixture("IMG_0001.DNG");
    let decoder = FakeDecoder::new(tiff_bytes(&textured(64, 48)));
    let engine = engine_with(decoder.clone(), &fx.scratch);
    let dest = fx.scratch.parent().unwrap().join("out.webp");

    let request = CompressionRequest::new(fx.source.clone(), OutputFormat::WebP).with_output(&dest);
    let result = engine.compress(&request, &Deadline::unbounded()).unwrap();

    assert_eq!(decoder.seen().len(), 1);
    assert!(result.baseline_size.is_some());
    assert_eq!(std::fs::metadata(&dest).unwrap().len(), result.final_size);
}

#[test]
fn test_raw_with_target_size_stays_in_raw_window() {
    let fx = fixture("shot.orf");
    let decoder = FakeDecoder::new(tiff_bytes(&textured(128, 96)));
    let engine = engine_with(decoder.clone(), &fx.scratch);

    let request = CompressionRequest::new(fx.source.clone(), OutputFormat::Jpeg).with_target_size(100);
    let result = engine.compress(&request, &Deadline::unbounded()).unwrap();

    assert!(result.iterations.is_some());
    assert!(result.quality_used >= 75);
    assert!(!decoder.seen()[0].exists());
    assert_eq!(std::fs::read_dir(&fx.scratch).unwrap().count(), 0);
}

#[test]
fn test_missing_decoder_is_first_class_error() {
    let fx = fixture("shot.cr3");
    let config = EngineConfig {
        scratch_dir: Some(fx.scratch.clone()),
        ..Default::default()
    };
    let engine = Engine::with_raw_decoder(
        config,
        Arc::new(DcrawDecoder::new("pixelsqueeze-missing-decoder", vec!["-c".into()])),
    );

    let err = engine
        .encode_raw(&fx.source, OutputFormat::Jpeg, None, &Deadline::unbounded())
        .unwrap_err();
    assert!(matches!(err, CompressionError::RawDecodeUnavailable { .. }));
    assert!(err.to_string().contains("convert the file"));
    assert_eq!(std::fs::read_dir(&fx.scratch).unwrap().count(), 0);
}
