//! PostgreSQL adapters over `diesel-async` and a `bb8` pool.
//!
//! Occupancy changes and ledger transitions are single predicated
//! statements, and table constraints reject any row that would break
//! `current_participants = cardinality(participants) <= max_participants`.
//! Row structs and the Diesel schema stay private to this module.
//!
//! ```ignore
//! use gatherings::outbound::persistence::{DbPool, DieselEventStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/gatherings")).await?;
//! let events = DieselEventStore::new(pool);
//! ```

mod diesel_event_store;
mod diesel_payment_ledger;
mod diesel_settlement_conflict_repository;
mod migrations;
mod models;
mod pool;
mod schema;
mod store_failure;

pub use diesel_event_store::DieselEventStore;
pub use diesel_payment_ledger::DieselPaymentLedger;
pub use diesel_settlement_conflict_repository::DieselSettlementConflictRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
