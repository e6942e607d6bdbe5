//! Adapters - Implementations of port interfaces.
//!
//! - `memory` - Versioned in-process match store
//! - `postgres` - PostgreSQL match store
//! - `events` - In-process event bus

pub mod events;
pub mod memory;
pub mod postgres;

pub use events::InMemoryEventBus;
pub use memory::InMemoryMatchStore;
pub use postgres::PostgresMatchStore;
