//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool max_connections must be at least 1")]
    InvalidPoolSize,

    #[error("Pool max_connections exceeds the allowed maximum")]
    PoolSizeTooLarge,

    #[error("Matching needs at least one attempt")]
    InvalidMaxAttempts,

    #[error("Retry max_delay_ms must not be below base_delay_ms")]
    InvalidBackoff,

    #[error("Retry jitter_pct must be between 0 and 1")]
    InvalidJitter,

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
