// Constants module - centralized default values for the compression engine
//
// Every tunable the engine exposes through configuration starts from one of
// these values. Keeping them here avoids magic numbers scattered through the
// codec, convergence and RAW modules.

// =============================================================================
// Quality defaults
// =============================================================================

/// Lowest quality any request may use
pub const MIN_QUALITY: u8 = 10;

/// Highest quality any request may use
pub const MAX_QUALITY: u8 = 100;

/// Quality used when a request does not specify one
pub const DEFAULT_QUALITY: u8 = 80;

/// Quality reduction applied to JPEG by the aggressive variant
pub const AGGRESSIVE_JPEG_QUALITY_DROP: u8 = 10;

/// Quality reduction applied to WebP and AVIF by the aggressive variant
pub const AGGRESSIVE_MODERN_QUALITY_DROP: u8 = 5;

// =============================================================================
// Target-size search defaults
// =============================================================================

/// Quality of the first target-size attempt
pub const DEFAULT_TARGET_INITIAL_QUALITY: u8 = 75;

/// Quality floor for the target-size search
pub const DEFAULT_TARGET_MIN_QUALITY: u8 = 10;

/// Quality ceiling for the target-size search
pub const DEFAULT_TARGET_MAX_QUALITY: u8 = 95;

/// Maximum number of encode attempts per target-size search
pub const DEFAULT_TARGET_MAX_ITERATIONS: u32 = 4;

/// Relative size error accepted on any attempt
pub const DEFAULT_TARGET_TOLERANCE: f64 = 0.10;

/// Relative size error accepted from the second attempt on
pub const DEFAULT_TARGET_RELAXED_TOLERANCE: f64 = 0.15;

/// Largest multiplicative quality step when the output is too large
pub const TARGET_SHRINK_FACTOR_CAP: f64 = 0.9;

/// Largest multiplicative quality step when the output is too small
pub const TARGET_GROW_FACTOR_CAP: f64 = 1.1;

// =============================================================================
// RAW defaults
// =============================================================================

/// External program that decodes camera RAW files
pub const DEFAULT_RAW_DECODER: &str = "dcraw";

/// Lowest quality used when re-encoding a RAW baseline
pub const DEFAULT_RAW_MIN_QUALITY: u8 = 75;

/// Highest quality used when re-encoding a RAW baseline
pub const DEFAULT_RAW_MAX_QUALITY: u8 = 95;

// =============================================================================
// Timeout defaults (caller policy)
// =============================================================================

/// Default deadline for a plain encode in seconds
pub const DEFAULT_ENCODE_TIMEOUT_SECS: u64 = 120;

/// Default deadline for a RAW pipeline job in seconds
pub const DEFAULT_RAW_TIMEOUT_SECS: u64 = 300;

/// Default deadline for a multi-file batch in seconds
pub const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 600;

// =============================================================================
// Quality metrics
// =============================================================================

/// PSNR reported for byte-identical images
pub const PSNR_CAP: f64 = 100.0;

/// PSNR mapped to a normalized score of 0
pub const PSNR_FLOOR_DB: f64 = 20.0;

/// PSNR mapped to a normalized score of 100
pub const PSNR_CEILING_DB: f64 = 50.0;

/// Largest SSIM window edge in pixels
pub const SSIM_MAX_WINDOW: u32 = 8;

/// Weight of normalized PSNR in the composite score
pub const SCORE_PSNR_WEIGHT: f64 = 0.6;

/// Weight of SSIM in the composite score
pub const SCORE_SSIM_WEIGHT: f64 = 0.4;

// =============================================================================
// Logging defaults
// =============================================================================

/// Log level used when RUST_LOG is not set
pub const DEFAULT_LOG_LEVEL: &str = "info";
