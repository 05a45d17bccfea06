//! Output and source format identification
//!
//! Output formats are a closed set: anything else is rejected with
//! [`CompressionError::UnsupportedFormat`] instead of silently falling back to
//! a default encoder. Camera RAW sources are recognised by file extension
//! because most of them carry a TIFF header and would otherwise be mistaken
//! for plain TIFF.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::CompressionError;

/// Encoded output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
    Tiff,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Tiff => "tiff",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Avif => "image/avif",
            Self::Tiff => "image/tiff",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Tiff => "tiff",
        }
    }

    /// Whether the format can carry an alpha channel
    pub fn supports_transparency(&self) -> bool {
        matches!(self, Self::Png | Self::WebP | Self::Avif | Self::Tiff)
    }

    /// Whether the quality setting influences the encoded size
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Jpeg | Self::WebP | Self::Avif)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "avif" => Ok(OutputFormat::Avif),
            "tiff" | "tif" => Ok(OutputFormat::Tiff),
            other if RawFormat::from_extension(other).is_some() => Err(
                CompressionError::unsupported_format(format!("{} (RAW is input-only)", other)),
            ),
            other => Err(CompressionError::unsupported_format(other)),
        }
    }
}

/// Camera RAW container, keyed by its customary file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawFormat {
    /// Canon
    Cr2,
    Cr3,
    /// Nikon
    Nef,
    Nrw,
    /// Sony
    Arw,
    Srf,
    Sr2,
    /// Adobe digital negative
    Dng,
    /// Olympus
    Orf,
    /// Panasonic
    Rw2,
    /// Fujifilm
    Raf,
    /// Pentax
    Pef,
    /// Samsung
    Srw,
    /// Hasselblad
    ThreeFr,
    /// Epson
    Erf,
    /// Kodak
    Kdc,
    /// Minolta
    Mrw,
    /// Sigma
    X3f,
}

impl RawFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        let raw = match ext.to_lowercase().as_str() {
            "cr2" => RawFormat::Cr2,
            "cr3" => RawFormat::Cr3,
            "nef" => RawFormat::Nef,
            "nrw" => RawFormat::Nrw,
            "arw" => RawFormat::Arw,
            "srf" => RawFormat::Srf,
            "sr2" => RawFormat::Sr2,
            "dng" => RawFormat::Dng,
            "orf" => RawFormat::Orf,
            "rw2" => RawFormat::Rw2,
            "raf" => RawFormat::Raf,
            "pef" => RawFormat::Pef,
            "srw" => RawFormat::Srw,
            "3fr" => RawFormat::ThreeFr,
            "erf" => RawFormat::Erf,
            "kdc" => RawFormat::Kdc,
            "mrw" => RawFormat::Mrw,
            "x3f" => RawFormat::X3f,
            _ => return None,
        };
        Some(raw)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            RawFormat::Cr2 => "cr2",
            RawFormat::Cr3 => "cr3",
            RawFormat::Nef => "nef",
            RawFormat::Nrw => "nrw",
            RawFormat::Arw => "arw",
            RawFormat::Srf => "srf",
            RawFormat::Sr2 => "sr2",
            RawFormat::Dng => "dng",
            RawFormat::Orf => "orf",
            RawFormat::Rw2 => "rw2",
            RawFormat::Raf => "raf",
            RawFormat::Pef => "pef",
            RawFormat::Srw => "srw",
            RawFormat::ThreeFr => "3fr",
            RawFormat::Erf => "erf",
            RawFormat::Kdc => "kdc",
            RawFormat::Mrw => "mrw",
            RawFormat::X3f => "x3f",
        }
    }
}

/// Format of a compression source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Anything the native codec library decodes directly
    Raster(image::ImageFormat),
    /// Camera RAW, needs the two-stage pipeline
    Raw(RawFormat),
}

impl SourceFormat {
    /// Identify a source from its path (if any) and leading bytes
    ///
    /// The RAW extension check wins over magic-byte sniffing.
    pub fn detect(path: Option<&Path>, data: &[u8]) -> Result<Self, CompressionError> {
        if let Some(raw) = path.and_then(RawFormat::from_path) {
            return Ok(SourceFormat::Raw(raw));
        }

        match image::guess_format(data) {
            Ok(
                fmt @ (image::ImageFormat::Jpeg
                | image::ImageFormat::Png
                | image::ImageFormat::WebP
                | image::ImageFormat::Tiff),
            ) => Ok(SourceFormat::Raster(fmt)),
            Ok(other) => Err(CompressionError::unsupported_format(format!("{:?}", other))),
            Err(_) => Err(CompressionError::unsupported_format(
                path.and_then(|p| p.extension())
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown"),
            )),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, SourceFormat::Raw(_))
    }
}
