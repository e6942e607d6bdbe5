//! Fika - pairs colleagues into one-on-one sessions.
//!
//! Available participants of the same organization who share a preferred
//! timeslot are paired greedily, never with someone they already met. Each
//! pairing becomes a session scheduled a week out, and both participants
//! leave the pool until the session is completed.
//!
//! Matching runs in response to participant and session changes. Every run
//! is a single store transaction that is retried on conflict, so concurrent
//! runs never double-book anyone.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
