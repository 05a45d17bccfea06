//! Codec layer
//!
//! - [`format`] - output/source format identification, RAW extension table
//! - [`params`] - variants, resize settings and quality bounds
//! - [`strategy`] - codec strategy selector (format x variant -> encoder params)
//! - [`encoder`] - per-format encoders behind the [`ImageEncoder`] trait
//! - [`preprocess`] - decode, orientation, histogram stretch and resize

pub mod encoder;
pub mod format;
pub mod params;
pub mod preprocess;
pub mod strategy;

pub use encoder::{EncodedImage, EncoderFactory, ImageEncoder};
pub use format::{OutputFormat, RawFormat, SourceFormat};
pub use params::{clamp_quality, CompressionVariant, QualityBounds, ResizeQuality, ResizeSpec};
pub use preprocess::{decode_image, prepare, PrepareOptions, PreparedImage};
pub use strategy::{select_strategy, EncodeStrategy, EncoderParams, StrategyInput};
