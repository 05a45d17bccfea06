// Error type unit tests

use pixelsqueeze::CompressionError;

#[test]
fn test_raw_unavailable_message_suggests_conversion() {
    let err = CompressionError::raw_decode_unavailable("/photos/a.cr2", "decoder 'dcraw' is not installed");
    let message = err.to_string();
    assert!(message.contains("/photos/a.cr2"));
    assert!(message.contains("not installed"));
    assert!(message.contains("TIFF, PNG or JPEG"));
}

#[test]
fn test_dimension_mismatch_message() {
    let err = CompressionError::DimensionMismatch {
        original: (640, 480),
        compressed: (320, 240),
    };
    assert_eq!(
        err.to_string(),
        "Image dimensions differ: original is 640x480, compressed is 320x240"
    );
}

#[test]
fn test_only_timeouts_are_retryable() {
    assert!(CompressionError::EncodeTimeout { timeout_ms: 1 }.is_retryable());
    assert!(!CompressionError::unsupported_format("gif").is_retryable());
    assert!(!CompressionError::decode_failed("x").is_retryable());
    assert!(!CompressionError::invalid_param("quality", "x").is_retryable());
}

#[test]
fn test_io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: CompressionError = io.into();
    assert!(matches!(err, CompressionError::Io(_)));
    assert!(err.to_string().starts_with("I/O error"));
}

#[test]
fn test_errors_work_with_anyhow() {
    fn fails() -> anyhow::Result<()> {
        Err(CompressionError::encode_failed("avif", "out of memory"))?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert!(err.to_string().contains("avif"));
    assert!(err.downcast_ref::<CompressionError>().is_some());
}
