//! `fika` - runs one matching sweep against the configured store.
//!
//! Event-driven runs can fail after exhausting their retries; a sweep picks
//! up anyone they left waiting. Exits non-zero if the sweep fails.

use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use fika::adapters::{InMemoryEventBus, InMemoryMatchStore, PostgresMatchStore};
use fika::application::{MatchingCoordinator, MatchingError, MatchingOutcome, RetryPolicy};
use fika::config::{AppConfig, ConfigError, StoreBackend, TelemetryConfig, ValidationError};
use fika::ports::{MatchStore, StoreError};

#[derive(Debug, Error)]
enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Matching(#[from] MatchingError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fika: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&config.telemetry) {
        eprintln!("fika: {}", e);
        return ExitCode::FAILURE;
    }

    match sweep(&config).await {
        Ok(outcome) => {
            info!(
                sessions = outcome.created(),
                unmatched = outcome.unmatched.len(),
                attempts = outcome.attempts,
                "Sweep finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Sweep failed");
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> Result<AppConfig, ConfigError> {
    let config = AppConfig::load()?;
    config.validate()?;
    Ok(config)
}

fn init_tracing(telemetry: &TelemetryConfig) -> Result<(), ValidationError> {
    let builder = tracing_subscriber::fmt().with_env_filter(telemetry.env_filter()?);
    if telemetry.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn connect_store(config: &AppConfig) -> Result<Arc<dyn MatchStore>, SweepError> {
    match (config.store.backend, &config.database) {
        (StoreBackend::Postgres, Some(database)) => {
            Ok(Arc::new(PostgresMatchStore::connect(database).await?))
        }
        (StoreBackend::Postgres, None) => Err(ConfigError::from(
            ValidationError::MissingRequired("FIKA__DATABASE__URL"),
        )
        .into()),
        (StoreBackend::Memory, _) => Ok(Arc::new(InMemoryMatchStore::new())),
    }
}

async fn sweep(config: &AppConfig) -> Result<MatchingOutcome, SweepError> {
    info!(backend = %config.store.backend, "Starting matching sweep");
    if !config.store.backend.is_persistent() {
        warn!(
            backend = %config.store.backend,
            "Dry run: the store starts empty, set FIKA__STORE__BACKEND=postgres to sweep real data"
        );
    }

    let store = connect_store(config).await?;
    let coordinator = MatchingCoordinator::new(
        store,
        Arc::new(InMemoryEventBus::new()),
        RetryPolicy::from(&config.matching),
    );

    Ok(coordinator.run().await?)
}
