//! Target-size search configuration.
//!
//! Defaults are sourced from `crate::constants`.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_TARGET_INITIAL_QUALITY, DEFAULT_TARGET_MAX_ITERATIONS, DEFAULT_TARGET_MAX_QUALITY,
    DEFAULT_TARGET_MIN_QUALITY, DEFAULT_TARGET_RELAXED_TOLERANCE, DEFAULT_TARGET_TOLERANCE,
};

fn default_initial_quality() -> u8 {
    DEFAULT_TARGET_INITIAL_QUALITY
}

fn default_min_quality() -> u8 {
    DEFAULT_TARGET_MIN_QUALITY
}

fn default_max_quality() -> u8 {
    DEFAULT_TARGET_MAX_QUALITY
}

fn default_max_iterations() -> u32 {
    DEFAULT_TARGET_MAX_ITERATIONS
}

fn default_tolerance() -> f64 {
    DEFAULT_TARGET_TOLERANCE
}

fn default_relaxed_tolerance() -> f64 {
    DEFAULT_TARGET_RELAXED_TOLERANCE
}

/// Target-size search configuration (YAML format)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSizeConfig {
    /// Quality of the first attempt
    #[serde(default = "default_initial_quality")]
    pub initial_quality: u8,
    #[serde(default = "default_min_quality")]
    pub min_quality: u8,
    #[serde(default = "default_max_quality")]
    pub max_quality: u8,
    /// Encode attempts before giving up with a best-effort result
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Relative error accepted on any attempt
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Relative error accepted from the second attempt on
    #[serde(default = "default_relaxed_tolerance")]
    pub relaxed_tolerance: f64,
}

impl Default for TargetSizeConfig {
    fn default() -> Self {
        Self {
            initial_quality: default_initial_quality(),
            min_quality: default_min_quality(),
            max_quality: default_max_quality(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            relaxed_tolerance: default_relaxed_tolerance(),
        }
    }
}

impl TargetSizeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_quality > self.max_quality {
            return Err(format!(
                "target_size.min_quality ({}) must not exceed max_quality ({})",
                self.min_quality, self.max_quality
            ));
        }
        if self.max_quality > 100 {
            return Err("target_size.max_quality must be at most 100".to_string());
        }
        if self.max_iterations == 0 {
            return Err("target_size.max_iterations must be at least 1".to_string());
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err("target_size.tolerance must be between 0 and 1".to_string());
        }
        if self.relaxed_tolerance < self.tolerance || self.relaxed_tolerance >= 1.0 {
            return Err(
                "target_size.relaxed_tolerance must be at least tolerance and below 1".to_string(),
            );
        }
        Ok(())
    }
}
