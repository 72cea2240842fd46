//! In-process adapters for running without PostgreSQL.
//!
//! Each store keeps its records behind one `std::sync::Mutex`, so every port
//! call is atomic in the same way the Diesel adapters' predicated writes
//! are. State is lost on restart; the server only selects these adapters
//! when no database URL is configured.

mod conflict_repository;
mod event_store;
mod payment_ledger;

pub use conflict_repository::InMemorySettlementConflictRepository;
pub use event_store::InMemoryEventStore;
pub use payment_ledger::InMemoryPaymentLedger;

use std::sync::{Mutex, MutexGuard};

/// Lock `mutex`, turning poisoning into an adapter error.
fn lock<'a, T, E>(
    mutex: &'a Mutex<T>,
    on_poison: impl FnOnce(&'static str) -> E,
) -> Result<MutexGuard<'a, T>, E> {
    mutex
        .lock()
        .map_err(|_| on_poison("in-memory store lock poisoned"))
}
