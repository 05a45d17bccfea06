//! Image encoder abstraction
//!
//! Each output format has one encoder type configured from the resolved
//! [`EncoderParams`]. Encoders take straight RGBA8 pixels; alpha is dropped
//! where the format cannot carry it.

use std::io::Cursor;

use image::ImageEncoder as _;

use super::format::OutputFormat;
use super::strategy::{AvifParams, EncoderParams, JpegBackend, JpegParams, PngParams, WebPParams};
use crate::error::CompressionError;

/// Result of encoding an image
#[derive(Debug)]
pub struct EncodedImage {
    /// The encoded image data
    pub data: Vec<u8>,
    /// The output format
    pub format: OutputFormat,
    /// Content-Type header value
    pub content_type: &'static str,
    /// Quality the encoder actually used
    pub quality: u8,
}

impl EncodedImage {
    pub fn new(data: Vec<u8>, format: OutputFormat, quality: u8) -> Self {
        Self {
            data,
            format,
            content_type: format.content_type(),
            quality,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Trait for image encoders
///
/// The trait is object-safe so the factory can hand out boxed encoders.
pub trait ImageEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> OutputFormat;

    /// Encode raw RGBA image data (4 bytes per pixel)
    fn encode(&self, data: &[u8], width: u32, height: u32)
        -> Result<EncodedImage, CompressionError>;

    /// Check if this encoder keeps the alpha channel
    fn supports_transparency(&self) -> bool {
        self.format().supports_transparency()
    }
}

fn check_buffer(format: &str, data: &[u8], width: u32, height: u32) -> Result<(), CompressionError> {
    if width == 0 || height == 0 {
        return Err(CompressionError::encode_failed(
            format,
            "width or height is zero",
        ));
    }
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(CompressionError::encode_failed(
            format,
            format!("expected {} RGBA bytes, got {}", expected, data.len()),
        ));
    }
    Ok(())
}

/// JPEG encoder with a baseline and a mozjpeg backend
pub struct JpegEncoder {
    pub params: JpegParams,
}

impl JpegEncoder {
    fn encode_baseline(&self, rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CompressionError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, self.params.quality);
        encoder
            .write_image(rgb, width, height, image::ColorType::Rgb8)
            .map_err(|e| CompressionError::encode_failed("jpeg", e.to_string()))?;

        Ok(output.into_inner())
    }

    fn encode_mozjpeg(&self, rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CompressionError> {
        use mozjpeg::{ColorSpace, Compress, ScanMode};

        let mut comp = Compress::new(ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_color_space(ColorSpace::JCS_YCbCr);
        comp.set_quality(self.params.quality as f32);
        comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));
        comp.set_optimize_coding(true);

        if self.params.progressive {
            comp.set_progressive_mode();
        }
        if self.params.optimize_scans {
            comp.set_optimize_scans(true);
            comp.set_scan_optimization_mode(ScanMode::AllComponentsTogether);
        }

        let mut output = Vec::with_capacity((width as usize * height as usize * 3 / 10).max(4096));
        {
            let mut writer = comp.start_compress(&mut output).map_err(|e| {
                CompressionError::encode_failed("jpeg", format!("mozjpeg start: {}", e))
            })?;

            let stride = width as usize * 3;
            for row in rgb.chunks(stride) {
                writer.write_scanlines(row).map_err(|e| {
                    CompressionError::encode_failed("jpeg", format!("mozjpeg scanlines: {}", e))
                })?;
            }

            writer.finish().map_err(|e| {
                CompressionError::encode_failed("jpeg", format!("mozjpeg finish: {}", e))
            })?;
        }

        Ok(output)
    }
}

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(&self, data: &[u8], width: u32, height: u32) -> Result<EncodedImage, CompressionError> {
        check_buffer("jpeg", data, width, height)?;

        // JPEG has no alpha channel
        let rgb = rgba_to_rgb(data);
        let encoded = match self.params.backend {
            JpegBackend::Baseline => self.encode_baseline(&rgb, width, height)?,
            JpegBackend::Mozjpeg => self.encode_mozjpeg(&rgb, width, height)?,
        };

        Ok(EncodedImage::new(encoded, OutputFormat::Jpeg, self.params.quality))
    }
}

/// PNG encoder: `image` writes the stream, oxipng optimizes it
pub struct PngEncoder {
    pub params: PngParams,
}

impl ImageEncoder for PngEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn encode(&self, data: &[u8], width: u32, height: u32) -> Result<EncodedImage, CompressionError> {
        use image::codecs::png::PngEncoder as ImagePngEncoder;

        check_buffer("png", data, width, height)?;

        let mut output = Cursor::new(Vec::new());
        ImagePngEncoder::new(&mut output)
            .write_image(data, width, height, image::ColorType::Rgba8)
            .map_err(|e| CompressionError::encode_failed("png", e.to_string()))?;

        let mut options = oxipng::Options::from_preset(self.params.effort);
        if self.params.strip_metadata {
            options.strip = oxipng::StripChunks::Safe;
        }

        let optimized = oxipng::optimize_from_memory(&output.into_inner(), &options)
            .map_err(|e| CompressionError::encode_failed("png", e.to_string()))?;

        Ok(EncodedImage::new(optimized, OutputFormat::Png, 100))
    }
}

/// WebP encoder backed by libwebp
pub struct WebPEncoder {
    pub params: WebPParams,
}

impl ImageEncoder for WebPEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::WebP
    }

    fn encode(&self, data: &[u8], width: u32, height: u32) -> Result<EncodedImage, CompressionError> {
        check_buffer("webp", data, width, height)?;

        // Opaque images skip the alpha plane entirely
        let rgb;
        let encoder = if is_opaque(data) {
            rgb = rgba_to_rgb(data);
            webp::Encoder::from_rgb(&rgb, width, height)
        } else {
            webp::Encoder::from_rgba(data, width, height)
        };

        let mut config = webp::WebPConfig::new()
            .map_err(|_| CompressionError::encode_failed("webp", "failed to create WebPConfig"))?;
        config.lossless = i32::from(self.params.lossless);
        config.quality = self.params.quality as f32;
        config.method = i32::from(self.params.method);
        config.near_lossless = i32::from(self.params.near_lossless);

        let memory = encoder
            .encode_advanced(&config)
            .map_err(|e| CompressionError::encode_failed("webp", format!("{:?}", e)))?;

        let quality = if self.params.lossless { 100 } else { self.params.quality };
        Ok(EncodedImage::new(memory.to_vec(), OutputFormat::WebP, quality))
    }
}

/// AVIF encoder backed by ravif (rav1e)
pub struct AvifEncoder {
    pub params: AvifParams,
}

impl ImageEncoder for AvifEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Avif
    }

    fn encode(&self, data: &[u8], width: u32, height: u32) -> Result<EncodedImage, CompressionError> {
        use rgb::FromSlice;

        check_buffer("avif", data, width, height)?;

        let quality = if self.params.lossless { 100 } else { self.params.quality };
        let pixels = imgref::Img::new(data.as_rgba(), width as usize, height as usize);

        let encoded = ravif::Encoder::new()
            .with_quality(quality as f32)
            .with_alpha_quality(quality as f32)
            .with_speed(self.params.speed)
            .encode_rgba(pixels)
            .map_err(|e| CompressionError::encode_failed("avif", e.to_string()))?;

        Ok(EncodedImage::new(encoded.avif_file, OutputFormat::Avif, quality))
    }
}

/// Uncompressed TIFF encoder
pub struct TiffEncoder;

impl ImageEncoder for TiffEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Tiff
    }

    fn encode(&self, data: &[u8], width: u32, height: u32) -> Result<EncodedImage, CompressionError> {
        use image::codecs::tiff::TiffEncoder as ImageTiffEncoder;

        check_buffer("tiff", data, width, height)?;

        let mut output = Cursor::new(Vec::new());
        ImageTiffEncoder::new(&mut output)
            .write_image(data, width, height, image::ColorType::Rgba8)
            .map_err(|e| CompressionError::encode_failed("tiff", e.to_string()))?;

        Ok(EncodedImage::new(output.into_inner(), OutputFormat::Tiff, 100))
    }
}

/// Factory for creating encoders from resolved parameters
pub struct EncoderFactory;

impl EncoderFactory {
    pub fn create(params: EncoderParams) -> Box<dyn ImageEncoder> {
        match params {
            EncoderParams::Jpeg(params) => Box::new(JpegEncoder { params }),
            EncoderParams::Png(params) => Box::new(PngEncoder { params }),
            EncoderParams::WebP(params) => Box::new(WebPEncoder { params }),
            EncoderParams::Avif(params) => Box::new(AvifEncoder { params }),
            EncoderParams::Tiff => Box::new(TiffEncoder),
        }
    }
}

/// Convert RGBA to RGB by discarding alpha channel
pub fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for chunk in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&chunk[..3]);
    }
    rgb
}

fn is_opaque(rgba: &[u8]) -> bool {
    rgba.chunks_exact(4).all(|px| px[3] == u8::MAX)
}
