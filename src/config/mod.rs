// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codec::QualityBounds;
use crate::constants::DEFAULT_QUALITY;

pub mod logging;
pub mod raw;
pub mod target_size;
pub mod timeouts;

pub use logging::{LogFormat, LoggingConfig};
pub use raw::RawConfig;
pub use target_size::TargetSizeConfig;
pub use timeouts::TimeoutsConfig;

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

/// Engine configuration, loaded from YAML with `${VAR}` substitution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Quality used when a request does not name one
    #[serde(default = "default_quality")]
    pub default_quality: u8,
    /// Parent directory for per-call scratch directories (system temp if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
    #[serde(default)]
    pub target_size: TargetSizeConfig,
    #[serde(default)]
    pub raw: RawConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_quality: default_quality(),
            scratch_dir: None,
            target_size: TargetSizeConfig::default(),
            raw: RawConfig::default(),
            timeouts: TimeoutsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        if substituted.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(10..=100).contains(&self.default_quality) {
            return Err(format!(
                "default_quality ({}) must be between 10 and 100",
                self.default_quality
            ));
        }

        if let Some(dir) = &self.scratch_dir {
            if dir.as_os_str().is_empty() {
                return Err("scratch_dir cannot be empty when set".to_string());
            }
        }

        self.target_size.validate()?;
        self.raw.validate()?;
        self.timeouts.validate()?;

        if self.logging.level.trim().is_empty() {
            return Err("logging.level cannot be empty".to_string());
        }

        Ok(())
    }

    /// Quality window for the target-size search
    pub fn target_bounds(&self) -> QualityBounds {
        QualityBounds::new(self.target_size.min_quality, self.target_size.max_quality)
    }

    /// Quality window for RAW baseline re-encoding
    pub fn raw_bounds(&self) -> QualityBounds {
        QualityBounds::new(self.raw.min_quality, self.raw.max_quality)
    }
}
