//! Event bus adapters.
//!
//! - `InMemoryEventBus` - In-process bus that dispatches participant and
//!   session changes to the lifecycle trigger and records what was published

mod in_memory;

pub use in_memory::InMemoryEventBus;
