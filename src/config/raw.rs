//! RAW pipeline configuration

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_RAW_DECODER, DEFAULT_RAW_MAX_QUALITY, DEFAULT_RAW_MIN_QUALITY};

fn default_decoder_program() -> String {
    DEFAULT_RAW_DECODER.to_string()
}

/// Write to stdout, camera white balance, 16-bit TIFF output
fn default_decoder_args() -> Vec<String> {
    vec!["-c".to_string(), "-w".to_string(), "-T".to_string()]
}

fn default_min_quality() -> u8 {
    DEFAULT_RAW_MIN_QUALITY
}

fn default_max_quality() -> u8 {
    DEFAULT_RAW_MAX_QUALITY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConfig {
    /// Decoder executable, looked up on PATH
    #[serde(default = "default_decoder_program")]
    pub decoder_program: String,
    /// Arguments placed before the source path
    #[serde(default = "default_decoder_args")]
    pub decoder_args: Vec<String>,
    /// Quality window for re-encoding the baseline
    #[serde(default = "default_min_quality")]
    pub min_quality: u8,
    #[serde(default = "default_max_quality")]
    pub max_quality: u8,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            decoder_program: default_decoder_program(),
            decoder_args: default_decoder_args(),
            min_quality: default_min_quality(),
            max_quality: default_max_quality(),
        }
    }
}

impl RawConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.decoder_program.trim().is_empty() {
            return Err("raw.decoder_program cannot be empty".to_string());
        }
        if self.min_quality > self.max_quality {
            return Err(format!(
                "raw.min_quality ({}) must not exceed max_quality ({})",
                self.min_quality, self.max_quality
            ));
        }
        if self.max_quality > 100 {
            return Err("raw.max_quality must be at most 100".to_string());
        }
        Ok(())
    }
}
