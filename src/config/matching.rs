//! Matching retry configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Backoff settings for conflicting matching transactions
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MatchingConfig {
    /// Attempts per invocation, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for any single delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Random spread applied to each delay, as a fraction
    #[serde(default = "default_jitter_pct")]
    pub jitter_pct: f64,
}

impl MatchingConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidMaxAttempts);
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ValidationError::InvalidBackoff);
        }
        if !(0.0..=1.0).contains(&self.jitter_pct) {
            return Err(ValidationError::InvalidJitter);
        }
        Ok(())
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_pct: default_jitter_pct(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    25
}

fn default_max_delay_ms() -> u64 {
    1_000
}

fn default_jitter_pct() -> f64 {
    0.2
}
