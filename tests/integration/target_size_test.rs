//! Target-size convergence against real encoders

use super::test_images::*;
use pixelsqueeze::codec::{CompressionVariant, OutputFormat, QualityBounds};
use pixelsqueeze::engine::target::relative_error;
use pixelsqueeze::engine::{CompressionRequest, Deadline, Engine};
use pixelsqueeze::EngineConfig;
use rstest::rstest;

fn single_shot_size(engine: &Engine, data: &[u8], format: OutputFormat, quality: u8) -> u64 {
    engine
        .encode(
            &CompressionRequest::new(data.to_vec(), format).with_quality(quality),
            &Deadline::unbounded(),
        )
        .unwrap()
        .final_size
}

#[rstest]
#[case::jpeg_half(OutputFormat::Jpeg, 0.5)]
#[case::webp_half(OutputFormat::WebP, 0.5)]
#[case::jpeg_most(OutputFormat::Jpeg, 0.8)]
#[case::webp_most(OutputFormat::WebP, 0.8)]
fn test_reachable_target_converges_below_75(#[case] format: OutputFormat, #[case] share: f64) {
    let engine = Engine::default();
    let data = png_bytes(&textured(256, 192));
    let target = (single_shot_size(&engine, &data, format, 75) as f64 * share) as u64;

    let request = CompressionRequest::new(data, format);
    let result = engine
        .encode_to_target_size(&request, target, QualityBounds::new(10, 95), &Deadline::unbounded())
        .unwrap();

    let iterations = result.iterations.unwrap();
    assert!((2..=4).contains(&iterations), "iterations {}", iterations);
    assert!(result.quality_used < 75);
    assert_eq!(result.converged, Some(true));
    let error = relative_error(result.final_size, target);
    assert!(error <= 0.15, "size {} vs target {}: error {}", result.final_size, target, error);
}

#[test]
fn test_q75_size_target_converges_immediately() {
    let engine = Engine::default();
    let data = png_bytes(&textured(128, 128));
    let target = single_shot_size(&engine, &data, OutputFormat::Jpeg, 75);

    let request = CompressionRequest::new(data, OutputFormat::Jpeg);
    let result = engine
        .encode_to_target_size(&request, target, QualityBounds::new(10, 95), &Deadline::unbounded())
        .unwrap();

    assert_eq!(result.iterations, Some(1));
    assert_eq!(result.converged, Some(true));
    assert_eq!(result.quality_used, 75);
    assert_eq!(result.final_size, target);
}

#[test]
fn test_unreachable_target_returns_best_effort() {
    let engine = Engine::default();
    let data = png_bytes(&textured(128, 128));

    let request = CompressionRequest::new(data, OutputFormat::Jpeg);
    let result = engine
        .encode_to_target_size(&request, 10, QualityBounds::new(10, 95), &Deadline::unbounded())
        .unwrap();

    assert_eq!(result.converged, Some(false));
    assert_eq!(result.quality_used, 10);
    assert!(result.data.is_some());
}

#[test]
fn test_bounds_cap_quality() {
    let engine = Engine::default();
    let data = png_bytes(&textured(128, 128));
    let huge_target = single_shot_size(&engine, &data, OutputFormat::Jpeg, 100) * 10;

    let request = CompressionRequest::new(data, OutputFormat::Jpeg);
    let result = engine
        .encode_to_target_size(&request, huge_target, QualityBounds::new(10, 80), &Deadline::unbounded())
        .unwrap();

    assert!(result.quality_used <= 80);
    assert_eq!(result.converged, Some(false));
}

#[test]
fn test_configured_iteration_limit_is_used() {
    let mut config = EngineConfig::default();
    config.target_size.max_iterations = 2;
    let engine = Engine::new(config);
    let data = png_bytes(&textured(128, 128));

    let request = CompressionRequest::new(data, OutputFormat::Jpeg)
        .with_variant(CompressionVariant::Standard)
        .with_target_size(50);
    let result = engine.compress(&request, &Deadline::unbounded()).unwrap();
    assert!(result.iterations.unwrap() <= 2);
}

#[test]
fn test_target_result_written_to_output() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("sized.jpg");
    let engine = Engine::default();

    let request = CompressionRequest::new(png_bytes(&textured(96, 96)), OutputFormat::Jpeg)
        .with_target_size(3_000)
        .with_output(&dest);
    let result = engine.compress(&request, &Deadline::unbounded()).unwrap();

    assert!(result.data.is_none());
    assert_eq!(std::fs::metadata(&dest).unwrap().len(), result.final_size);
}
