//! Timeout budgets applied by callers of the engine

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BATCH_TIMEOUT_SECS, DEFAULT_ENCODE_TIMEOUT_SECS, DEFAULT_RAW_TIMEOUT_SECS,
};

fn default_encode_secs() -> u64 {
    DEFAULT_ENCODE_TIMEOUT_SECS
}

fn default_raw_secs() -> u64 {
    DEFAULT_RAW_TIMEOUT_SECS
}

fn default_batch_secs() -> u64 {
    DEFAULT_BATCH_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_encode_secs")]
    pub encode_secs: u64,
    #[serde(default = "default_raw_secs")]
    pub raw_secs: u64,
    #[serde(default = "default_batch_secs")]
    pub batch_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            encode_secs: default_encode_secs(),
            raw_secs: default_raw_secs(),
            batch_secs: default_batch_secs(),
        }
    }
}

impl TimeoutsConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("encode_secs", self.encode_secs),
            ("raw_secs", self.raw_secs),
            ("batch_secs", self.batch_secs),
        ] {
            if value == 0 {
                return Err(format!("timeouts.{} must be greater than 0", name));
            }
        }
        Ok(())
    }
}
