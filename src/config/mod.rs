//! Application configuration module
//!
//! Configuration is read from environment variables with the `FIKA` prefix
//! using the `config` and `dotenvy` crates. Nested values are separated by
//! double underscores.
//!
//! # Example
//!
//! ```no_run
//! use fika::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Matching against the {} store", config.store.backend);
//! ```

mod database;
mod error;
mod matching;
mod store;
mod telemetry;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use matching::MatchingConfig;
pub use store::{StoreBackend, StoreConfig};
pub use telemetry::TelemetryConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Which store backs participants and sessions
    #[serde(default)]
    pub store: StoreConfig,

    /// PostgreSQL connection, required for the postgres backend
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Retry behaviour for conflicting transactions
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Log output
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` if present
    /// 2. Reads variables with the `FIKA` prefix
    /// 3. Splits nested keys on `__`
    ///
    /// - `FIKA__STORE__BACKEND=postgres` -> `store.backend = postgres`
    /// - `FIKA__MATCHING__MAX_ATTEMPTS=8` -> `matching.max_attempts = 8`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value cannot be parsed into its field.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("FIKA")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if a section is invalid or the postgres
    /// backend is selected without a database section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (&self.store.backend, &self.database) {
            (StoreBackend::Postgres, None) => {
                return Err(ValidationError::MissingRequired("FIKA__DATABASE__URL"))
            }
            (_, Some(database)) => database.validate()?,
            (StoreBackend::Memory, None) => {}
        }
        self.matching.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }
}
