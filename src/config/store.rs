//! Store backend selection

use serde::Deserialize;
use std::fmt;

/// Which match store implementation to use
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store, lost on exit
    #[default]
    Memory,
    /// PostgreSQL, requires the `database` section
    Postgres,
}

impl StoreBackend {
    /// False for backends that start empty on every process start, where a
    /// one-shot sweep has nothing to match.
    pub fn is_persistent(&self) -> bool {
        match self {
            StoreBackend::Memory => false,
            StoreBackend::Postgres => true,
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Postgres => write!(f, "postgres"),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
}
