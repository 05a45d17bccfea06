//! Timeout guard behavior around the engine

use super::test_images::*;
use pixelsqueeze::codec::OutputFormat;
use pixelsqueeze::engine::{CompressionRequest, Deadline, Engine, ScratchFile};
use pixelsqueeze::raw::RawDecoder;
use pixelsqueeze::{CompressionError, EngineConfig};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Decoder that writes a baseline, then stalls well past any test deadline
struct StallingDecoder {
    stall: Duration,
    baseline: Mutex<Option<PathBuf>>,
}

impl RawDecoder for StallingDecoder {
    fn name(&self) -> &str {
        "stalling"
    }

    fn decode(
        &self,
        _source: &Path,
        baseline: &mut ScratchFile,
        _deadline: &Deadline,
    ) -> Result<u64, CompressionError> {
        *self.baseline.lock().unwrap() = Some(baseline.path().to_path_buf());
        baseline.write_all(&tiff_bytes(&textured(32, 32)))?;
        std::thread::sleep(self.stall);
        baseline.len()
    }
}

#[tokio::test]
async fn test_guarded_compress_succeeds_within_budget() {
    let engine = Engine::default();
    let request = CompressionRequest::new(png_bytes(&textured(64, 64)), OutputFormat::Jpeg);
    let result = engine
        .compress_guarded(request, Deadline::after(Duration::from_secs(30)))
        .await
        .unwrap();
    assert!(result.final_size > 0);
}

#[tokio::test]
async fn test_stalled_raw_job_times_out_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("slow.cr2");
    std::fs::write(&source, b"raw").unwrap();
    let scratch = dir.path().join("scratch");

    let decoder = Arc::new(StallingDecoder {
        stall: Duration::from_millis(600),
        baseline: Mutex::new(None),
    });
    let config = EngineConfig {
        scratch_dir: Some(scratch.clone()),
        ..Default::default()
    };
    let engine = Engine::with_raw_decoder(config, decoder.clone());

    let started = Instant::now();
    let result = engine
        .compress_guarded(
            CompressionRequest::new(source, OutputFormat::Jpeg),
            Deadline::after(Duration::from_millis(100)),
        )
        .await;

    match result {
        Err(CompressionError::EncodeTimeout { timeout_ms }) => assert_eq!(timeout_ms, 100),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_millis(500));

    // The abandoned job notices the deadline after the stall and unwinds
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let baseline = decoder.baseline.lock().unwrap().clone().unwrap();
    assert!(!baseline.exists());
    assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
}

#[tokio::test]
async fn test_timed_out_job_leaves_no_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("slow.nef");
    std::fs::write(&source, b"raw").unwrap();
    let dest = dir.path().join("out").join("slow.jpg");

    let decoder = Arc::new(StallingDecoder {
        stall: Duration::from_millis(300),
        baseline: Mutex::new(None),
    });
    let engine = Engine::with_raw_decoder(EngineConfig::default(), decoder);

    let result = engine
        .compress_guarded(
            CompressionRequest::new(source, OutputFormat::Jpeg).with_output(&dest),
            Deadline::after(Duration::from_millis(100)),
        )
        .await;
    assert!(matches!(result, Err(CompressionError::EncodeTimeout { .. })));

    // Give the abandoned job time to run to completion
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_guarded_batch_returns_per_item_results() {
    let engine = Engine::default();
    let requests = vec![
        CompressionRequest::new(png_bytes(&textured(32, 32)), OutputFormat::WebP),
        CompressionRequest::new(b"nope".to_vec(), OutputFormat::WebP),
    ];
    let results = engine
        .compress_batch_guarded(requests, Deadline::after(Duration::from_secs(30)))
        .await
        .unwrap();
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}

#[test]
fn test_expired_deadline_fails_fast() {
    let engine = Engine::default();
    let request = CompressionRequest::new(png_bytes(&textured(32, 32)), OutputFormat::Jpeg)
        .with_target_size(1_000);
    let err = engine
        .compress(&request, &Deadline::after(Duration::ZERO))
        .unwrap_err();
    assert!(err.is_retryable());
}
