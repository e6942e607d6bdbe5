//! In-memory adapters for local runs and tests.

mod match_store;

pub use match_store::{InMemoryMatchStore, InMemoryTransaction};
