//! Compression engine error types
//!
//! Every fatal condition surfaces as a [`CompressionError`] with a message the
//! caller can act on. Convergence exhaustion is deliberately absent: it is a
//! best-effort result, not a failure.

use thiserror::Error;

/// Errors that can occur during compression or quality assessment
#[derive(Error, Debug)]
pub enum CompressionError {
    // === Format Errors ===
    /// Requested output or input format is not recognized
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: String },

    /// The RAW decoder could not produce an uncompressed baseline
    #[error(
        "RAW decoding unavailable for {path}: {reason}. \
         Please convert the file to TIFF, PNG or JPEG before compressing it"
    )]
    RawDecodeUnavailable { path: String, reason: String },

    // === Metrics Errors ===
    /// Quality metrics inputs do not share pixel dimensions
    #[error(
        "Image dimensions differ: original is {}x{}, compressed is {}x{}",
        original.0, original.1, compressed.0, compressed.1
    )]
    DimensionMismatch {
        original: (u32, u32),
        compressed: (u32, u32),
    },

    // === Processing Errors ===
    /// A single encode attempt exceeded its deadline
    #[error("Encode timed out after {timeout_ms}ms")]
    EncodeTimeout { timeout_ms: u64 },

    /// Failed to decode source image data
    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: String },

    /// Encoding to the output format failed
    #[error("Failed to encode to {format}: {message}")]
    EncodeFailed { format: String, message: String },

    /// Resampling failed
    #[error("Resize failed: {message}")]
    ResizeFailed { message: String },

    /// Invalid request parameter
    #[error("Invalid parameter '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    /// Filesystem failure while reading sources or handling scratch files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompressionError {
    /// Whether a higher layer may reasonably retry the operation.
    ///
    /// Only timeouts qualify; format and RAW failures need the caller to
    /// change the input. The engine never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CompressionError::EncodeTimeout { .. })
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        CompressionError::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn raw_decode_unavailable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        CompressionError::RawDecodeUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        CompressionError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        CompressionError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        CompressionError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        CompressionError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }
}
