//! Quality metrics on real encode output

use super::test_images::*;
use image::{DynamicImage, ImageFormat, RgbImage};
use pixelsqueeze::codec::{decode_image, OutputFormat};
use pixelsqueeze::engine::{CompressionRequest, Deadline, Engine};
use pixelsqueeze::quality::{assess_quality, assess_quality_bytes, QualityGrade};
use pixelsqueeze::CompressionError;

fn jpeg_at(engine: &Engine, data: &[u8], quality: u8) -> DynamicImage {
    let result = engine
        .encode(
            &CompressionRequest::new(data.to_vec(), OutputFormat::Jpeg).with_quality(quality),
            &Deadline::unbounded(),
        )
        .unwrap();
    decode_image(result.data.as_ref().unwrap()).unwrap()
}

#[test]
fn test_identical_images_score_perfectly() {
    let img = textured(64, 64);
    let metrics = assess_quality(&img, &img).unwrap();
    assert_eq!(metrics.psnr, 100.0);
    assert!((metrics.ssim - 1.0).abs() < 1e-9);
    assert_eq!(metrics.quality_score, 100);
    assert_eq!(metrics.quality_grade, QualityGrade::Excellent);
}

#[test]
fn test_mismatched_dimensions_fail() {
    let err = assess_quality(&textured(64, 64), &textured(32, 64)).unwrap_err();
    assert!(matches!(err, CompressionError::DimensionMismatch { .. }));
    assert!(err.to_string().contains("64x64"));
}

#[test]
fn test_higher_quality_scores_higher() {
    let engine = Engine::default();
    let original = textured(128, 96);
    let source = png_bytes(&original);

    let low = assess_quality(&original, &jpeg_at(&engine, &source, 10)).unwrap();
    let high = assess_quality(&original, &jpeg_at(&engine, &source, 95)).unwrap();

    assert!(high.psnr > low.psnr);
    assert!(high.ssim > low.ssim);
    assert!(high.quality_score >= low.quality_score);
    assert!(high.quality_grade >= low.quality_grade);
}

#[test]
fn test_metrics_are_within_range() {
    let engine = Engine::default();
    let original = textured(80, 80);
    let metrics = assess_quality(&original, &jpeg_at(&engine, &png_bytes(&original), 50)).unwrap();

    assert!(metrics.psnr > 0.0 && metrics.psnr < 100.0);
    assert!(metrics.ssim >= 0.0 && metrics.ssim <= 1.0);
    assert!(metrics.quality_score <= 100);
}

#[test]
fn test_inverted_image_is_poor() {
    let original = textured(64, 64);
    let inverted = {
        let mut rgb = original.to_rgb8();
        for px in rgb.pixels_mut() {
            px.0 = [255 - px.0[0], 255 - px.0[1], 255 - px.0[2]];
        }
        DynamicImage::ImageRgb8(rgb)
    };
    let metrics = assess_quality(&original, &inverted).unwrap();
    assert_eq!(metrics.quality_grade, QualityGrade::Poor);
}

#[test]
fn test_tiny_images_have_perfect_ssim() {
    let a = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 5, image::Rgb([0, 0, 0])));
    let b = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 5, image::Rgb([30, 30, 30])));
    let metrics = assess_quality(&a, &b).unwrap();
    assert_eq!(metrics.ssim, 1.0);
    assert!(metrics.psnr < 100.0);
}

#[test]
fn test_assess_from_encoded_bytes() {
    let original = textured(40, 40);
    let png = png_bytes(&original);
    let jpeg = encode(&original, ImageFormat::Jpeg);

    let metrics = assess_quality_bytes(&png, &jpeg).unwrap();
    assert!(metrics.psnr > 20.0);

    let engine = Engine::default();
    assert!(engine.try_assess(&png, &png_bytes(&textured(20, 20))).is_none());
}
