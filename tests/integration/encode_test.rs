//! Single-shot encode, variants and batch behavior

use super::test_images::*;
use image::ImageFormat;
use pixelsqueeze::codec::{decode_image, CompressionVariant, OutputFormat, ResizeSpec};
use pixelsqueeze::engine::{CompressionRequest, Deadline, Engine};
use pixelsqueeze::CompressionError;
use rstest::rstest;

fn encoded_size(engine: &Engine, data: &[u8], format: OutputFormat, quality: u8, variant: CompressionVariant) -> u64 {
    let request = CompressionRequest::new(data.to_vec(), format)
        .with_quality(quality)
        .with_variant(variant);
    engine
        .encode(&request, &Deadline::unbounded())
        .expect("encode should succeed")
        .final_size
}

#[test]
fn test_solid_red_jpeg_quality_and_variant_ordering() {
    let engine = Engine::default();
    let source = encode(&solid_red(200), ImageFormat::Jpeg);

    let standard_75 = encoded_size(&engine, &source, OutputFormat::Jpeg, 75, CompressionVariant::Standard);
    let standard_100 = encoded_size(&engine, &source, OutputFormat::Jpeg, 100, CompressionVariant::Standard);
    let aggressive_75 = encoded_size(&engine, &source, OutputFormat::Jpeg, 75, CompressionVariant::Aggressive);

    assert!(standard_75 < standard_100, "{} !< {}", standard_75, standard_100);
    assert!(aggressive_75 <= standard_75, "{} !<= {}", aggressive_75, standard_75);
}

#[test]
fn test_jpeg_size_is_monotonic_in_quality() {
    let engine = Engine::default();
    let source = png_bytes(&textured(160, 120));

    let sizes: Vec<u64> = [10u8, 30, 50, 70, 90]
        .iter()
        .map(|&q| encoded_size(&engine, &source, OutputFormat::Jpeg, q, CompressionVariant::Standard))
        .collect();

    for pair in sizes.windows(2) {
        assert!(pair[0] <= pair[1], "sizes not monotonic: {:?}", sizes);
    }
}

#[rstest]
#[case(OutputFormat::Jpeg, ImageFormat::Jpeg)]
#[case(OutputFormat::Png, ImageFormat::Png)]
#[case(OutputFormat::WebP, ImageFormat::WebP)]
#[case(OutputFormat::Tiff, ImageFormat::Tiff)]
fn test_output_is_decodable(#[case] format: OutputFormat, #[case] expected: ImageFormat) {
    let engine = Engine::default();
    let request = CompressionRequest::new(png_bytes(&textured(48, 32)), format);
    let result = engine.encode(&request, &Deadline::unbounded()).unwrap();

    let data = result.data.unwrap();
    assert_eq!(image::guess_format(&data).unwrap(), expected);
    let decoded = decode_image(&data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (48, 32));
    assert_eq!(result.content_type, format.content_type());
}

#[test]
fn test_avif_output_has_ftyp_box() {
    let engine = Engine::default();
    let request = CompressionRequest::new(png_bytes(&textured(32, 32)), OutputFormat::Avif)
        .with_quality(60);
    let result = engine.encode(&request, &Deadline::unbounded()).unwrap();
    let data = result.data.unwrap();
    assert_eq!(&data[4..8], b"ftyp");
}

#[test]
fn test_alpha_survives_webp_and_is_dropped_for_jpeg() {
    let engine = Engine::default();
    let source = png_bytes(&translucent(32, 32));

    let webp = engine
        .encode(
            &CompressionRequest::new(source.clone(), OutputFormat::WebP).with_variant(CompressionVariant::Lossless),
            &Deadline::unbounded(),
        )
        .unwrap();
    let decoded = decode_image(webp.data.as_ref().unwrap()).unwrap();
    assert!(decoded.color().has_alpha());
    assert!(decoded.to_rgba8().pixels().any(|p| p.0[3] == 96));

    let jpeg = engine
        .encode(&CompressionRequest::new(source, OutputFormat::Jpeg), &Deadline::unbounded())
        .unwrap();
    let decoded = decode_image(jpeg.data.as_ref().unwrap()).unwrap();
    assert!(!decoded.color().has_alpha());
}

#[test]
fn test_lossless_png_keeps_pixels() {
    let engine = Engine::default();
    let original = textured(40, 40);
    let request = CompressionRequest::new(png_bytes(&original), OutputFormat::Png)
        .with_variant(CompressionVariant::Lossless);
    let result = engine.encode(&request, &Deadline::unbounded()).unwrap();

    let decoded = decode_image(result.data.as_ref().unwrap()).unwrap();
    let metrics = engine.assess_quality(&original, &decoded).unwrap();
    assert_eq!(metrics.psnr, 100.0);
    assert_eq!(result.quality_used, 100);
}

#[test]
fn test_resize_never_enlarges() {
    let engine = Engine::default();
    let request = CompressionRequest::new(png_bytes(&textured(30, 20)), OutputFormat::Jpeg)
        .with_resize(ResizeSpec::new(Some(300), Some(200)));
    let result = engine.encode(&request, &Deadline::unbounded()).unwrap();
    assert_eq!((result.width, result.height), (30, 20));
}

#[test]
fn test_output_path_receives_file() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("source.png");
    std::fs::write(&source_path, png_bytes(&textured(64, 64))).unwrap();
    let dest = dir.path().join("out").join("result.jpg");

    let engine = Engine::default();
    let request = CompressionRequest::new(source_path.clone(), OutputFormat::Jpeg).with_output(&dest);
    let result = engine.compress(&request, &Deadline::unbounded()).unwrap();

    assert!(result.data.is_none());
    assert_eq!(std::fs::metadata(&dest).unwrap().len(), result.final_size);
    assert_eq!(result.original_size, std::fs::metadata(&source_path).unwrap().len());
}

#[test]
fn test_scratch_dir_left_empty() {
    let scratch_root = tempfile::tempdir().unwrap();
    let config = pixelsqueeze::EngineConfig {
        scratch_dir: Some(scratch_root.path().to_path_buf()),
        ..Default::default()
    };
    let engine = Engine::new(config);

    let data = png_bytes(&textured(64, 64));
    let dest = tempfile::tempdir().unwrap();
    engine
        .compress(
            &CompressionRequest::new(data.clone(), OutputFormat::WebP).with_output(dest.path().join("a.webp")),
            &Deadline::unbounded(),
        )
        .unwrap();
    engine
        .compress(
            &CompressionRequest::new(data, OutputFormat::Jpeg).with_target_size(2_000),
            &Deadline::unbounded(),
        )
        .unwrap();

    assert_eq!(std::fs::read_dir(scratch_root.path()).unwrap().count(), 0);
}

#[test]
fn test_batch_keeps_order_and_isolates_failures() {
    let engine = Engine::default();
    let good = png_bytes(&textured(32, 32));
    let requests = vec![
        CompressionRequest::new(good.clone(), OutputFormat::Jpeg),
        CompressionRequest::new(b"broken".to_vec(), OutputFormat::Jpeg),
        CompressionRequest::new(good, OutputFormat::Png),
    ];

    let results = engine.compress_batch(&requests, &Deadline::unbounded());
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().format, OutputFormat::Jpeg);
    assert!(matches!(results[1], Err(CompressionError::UnsupportedFormat { .. })));
    assert_eq!(results[2].as_ref().unwrap().format, OutputFormat::Png);
}

#[test]
fn test_raw_output_format_is_rejected() {
    let err = "cr2".parse::<OutputFormat>().unwrap_err();
    assert!(matches!(err, CompressionError::UnsupportedFormat { .. }));
    assert!(err.to_string().contains("RAW"));
}
