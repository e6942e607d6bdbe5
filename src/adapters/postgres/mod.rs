//! PostgreSQL adapters.
//!
//! - `PostgresMatchStore` - `MatchStore` over SERIALIZABLE transactions

mod match_store;

pub use match_store::{PostgresMatchStore, PostgresTransaction};
