// Pixelsqueeze adaptive image compression library

pub mod codec;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod logging;
pub mod quality; // PSNR / SSIM / score and grade
pub mod raw; // Two-stage RAW pipeline

pub use codec::{CompressionVariant, OutputFormat, QualityBounds, ResizeQuality, ResizeSpec};
pub use config::EngineConfig;
pub use engine::{CompressionRequest, CompressionResult, Deadline, Engine, Source};
pub use error::CompressionError;
pub use quality::{QualityGrade, QualityMetrics};
