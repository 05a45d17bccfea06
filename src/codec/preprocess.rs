//! Pixel-stage preparation: decode, orientation, histogram and resize
//!
//! Runs before any format-specific parameterization because every step here
//! changes the pixel buffer the encoder sees.

use fast_image_resize::{Image, PixelType, Resizer};
use image::io::Reader as ImageReader;
use image::DynamicImage;
use std::io::Cursor;
use std::num::NonZeroU32;

use super::params::{ResizeQuality, ResizeSpec};
use crate::error::CompressionError;

/// Share of pixels clipped at each end of the histogram when stretching
const NORMALIZE_CLIP: f64 = 0.01;

/// Decode image data into a DynamicImage
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, CompressionError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| CompressionError::decode_failed(e.to_string()))?
        .decode()
        .map_err(|e| CompressionError::decode_failed(e.to_string()))
}

/// Read the EXIF orientation tag, 1 (normal) when absent
pub fn read_exif_orientation(data: &[u8]) -> u32 {
    let mut cursor = Cursor::new(data);
    let exif = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(_) => return 1,
    };

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply an EXIF orientation value so the pixels are upright
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Stretch luminance so the 1st..99th percentile spans the full range
///
/// Every color channel gets the same linear map, which keeps hue intact.
/// Alpha is left untouched. Flat images are returned unchanged.
pub fn normalize_histogram(img: DynamicImage) -> DynamicImage {
    let mut rgba = img.into_rgba8();

    let mut histogram = [0u64; 256];
    for px in rgba.pixels() {
        histogram[luma(px.0[0], px.0[1], px.0[2]) as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    let clip = (total as f64 * NORMALIZE_CLIP) as u64;
    let low = percentile(&histogram, clip);
    let high = percentile(&histogram, total.saturating_sub(clip + 1));

    if high <= low {
        return DynamicImage::ImageRgba8(rgba);
    }

    let scale = 255.0 / (high - low) as f64;
    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        let stretched = (value as f64 - low as f64) * scale;
        *slot = stretched.round().clamp(0.0, 255.0) as u8;
    }

    for px in rgba.pixels_mut() {
        px.0[0] = lut[px.0[0] as usize];
        px.0[1] = lut[px.0[1] as usize];
        px.0[2] = lut[px.0[2] as usize];
    }

    DynamicImage::ImageRgba8(rgba)
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64).round() as u8
}

/// Smallest bucket whose cumulative count exceeds `rank`
fn percentile(histogram: &[u64; 256], rank: u64) -> u8 {
    let mut seen = 0u64;
    for (value, count) in histogram.iter().enumerate() {
        seen += count;
        if seen > rank {
            return value as u8;
        }
    }
    u8::MAX
}

/// Resize image using fast-image-resize with the requested kernel
pub fn resize_image(
    img: &DynamicImage,
    target_w: u32,
    target_h: u32,
    quality: ResizeQuality,
) -> Result<DynamicImage, CompressionError> {
    let src_width = NonZeroU32::new(img.width())
        .ok_or_else(|| CompressionError::resize_failed("Source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| CompressionError::resize_failed("Source height is 0"))?;
    let dst_width = NonZeroU32::new(target_w)
        .ok_or_else(|| CompressionError::resize_failed("Target width is 0"))?;
    let dst_height = NonZeroU32::new(target_h)
        .ok_or_else(|| CompressionError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| CompressionError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);
    let mut resizer = Resizer::new(quality.algorithm());

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| CompressionError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    let rgba_image = image::RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| CompressionError::resize_failed("Failed to create output image buffer"))?;

    Ok(DynamicImage::ImageRgba8(rgba_image))
}

/// Pixel-stage options for one encode
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepareOptions {
    pub resize: Option<ResizeSpec>,
    pub web_optimize: bool,
}

/// Decoded, upright, resized pixels ready for an encoder
pub struct PreparedImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub original_dimensions: (u32, u32),
}

/// Decode `data` and apply orientation, resize and histogram stretch
///
/// Order: orientation first (so resize boxes refer to upright dimensions),
/// then resize, then normalization on the smaller buffer.
pub fn prepare(data: &[u8], options: &PrepareOptions) -> Result<PreparedImage, CompressionError> {
    let decoded = decode_image(data)?;
    prepare_decoded(decoded, data, options)
}

/// Same as [`prepare`] for an already decoded image; `data` feeds EXIF lookup
pub fn prepare_decoded(
    mut img: DynamicImage,
    data: &[u8],
    options: &PrepareOptions,
) -> Result<PreparedImage, CompressionError> {
    let original_dimensions = (img.width(), img.height());

    if options.web_optimize {
        img = apply_orientation(img, read_exif_orientation(data));
    }

    if let Some(resize) = options.resize {
        let (target_w, target_h) = resize.target_dimensions(img.width(), img.height());
        if (target_w, target_h) != (img.width(), img.height()) {
            img = resize_image(&img, target_w, target_h, resize.quality)?;
        }
    }

    if options.web_optimize {
        img = normalize_histogram(img);
    }

    let (width, height) = (img.width(), img.height());
    Ok(PreparedImage {
        rgba: img.into_rgba8().into_raw(),
        width,
        height,
        original_dimensions,
    })
}
