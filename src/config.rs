use serde::{Deserialize, Serialize};

use crate::error::{FootfallError, Result};

pub const DEFAULT_BIN_DURATION_MS: u64 = 10_000;
pub const DEFAULT_AGE_BUCKET_WIDTH: f32 = 20.0;

/// Tuning for the time-binned aggregator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// A bin closes once an observation arrives more than this many
    /// milliseconds after the previous closure.
    pub bin_duration_ms: u64,
    /// Years covered by each age bucket.
    pub age_bucket_width: f32,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            bin_duration_ms: DEFAULT_BIN_DURATION_MS,
            age_bucket_width: DEFAULT_AGE_BUCKET_WIDTH,
        }
    }
}

impl AggregatorConfig {
    pub fn new(bin_duration_ms: u64, age_bucket_width: f32) -> Result<Self> {
        let config = Self {
            bin_duration_ms,
            age_bucket_width,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.age_bucket_width.is_finite() && self.age_bucket_width > 0.0) {
            return Err(FootfallError::config(format!(
                "age bucket width must be a positive number, got {}",
                self.age_bucket_width
            )));
        }
        Ok(())
    }
}
