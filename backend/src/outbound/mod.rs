//! Adapters behind the domain ports.
//!
//! `persistence` is the production PostgreSQL store, `memory` backs
//! development runs and tests, `provider` talks to the card processor, and
//! `metrics` exports settlement counters when the `metrics` feature is on.

pub mod memory;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod persistence;
pub mod provider;
