//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`EventCapacityStore`, `EventRepository`, `PaymentLedger`,
//! `PaymentProvider`, `SettlementConflictRepository`, `SettlementMetrics`)
//! are implemented by outbound adapters. Driving ports (`*Command`,
//! `*Query`, `LoginService`) are implemented by domain services and called
//! by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod enrollment_command;
mod event_capacity_store;
mod event_command;
mod event_query;
mod event_repository;
mod login_service;
mod payment_intent_command;
mod payment_ledger;
mod payment_provider;
mod payment_query;
mod settlement_command;
mod settlement_conflict_repository;
mod settlement_metrics;

#[cfg(test)]
pub use enrollment_command::MockEnrollmentCommand;
pub use enrollment_command::EnrollmentCommand;
#[cfg(test)]
pub use event_capacity_store::MockEventCapacityStore;
pub use event_capacity_store::{EventCapacityStore, EventCapacityStoreError};
#[cfg(test)]
pub use event_command::MockEventCommand;
pub use event_command::EventCommand;
#[cfg(test)]
pub use event_query::MockEventQuery;
pub use event_query::EventQuery;
#[cfg(test)]
pub use event_repository::MockEventRepository;
pub use event_repository::{CancelOutcome, DeleteOutcome, EventRepository, EventRepositoryError};
pub use login_service::{FIXTURE_ACCOUNTS, FixtureLoginService, LoginService};
#[cfg(test)]
pub use payment_intent_command::MockPaymentIntentCommand;
pub use payment_intent_command::PaymentIntentCommand;
#[cfg(test)]
pub use payment_ledger::MockPaymentLedger;
pub use payment_ledger::{PaymentLedger, PaymentLedgerError};
#[cfg(test)]
pub use payment_provider::MockPaymentProvider;
pub use payment_provider::{
    CreateIntentRequest, IntentMetadata, PaymentProvider, PaymentProviderError, ProviderIntent,
    ProviderIntentStatus, ProviderRetryPolicy,
};
#[cfg(test)]
pub use payment_query::MockPaymentQuery;
pub use payment_query::PaymentQuery;
#[cfg(test)]
pub use settlement_command::MockSettlementCommand;
pub use settlement_command::SettlementCommand;
#[cfg(test)]
pub use settlement_conflict_repository::MockSettlementConflictRepository;
pub use settlement_conflict_repository::{
    SettlementConflictRepository, SettlementConflictRepositoryError,
};
#[cfg(test)]
pub use settlement_metrics::MockSettlementMetrics;
pub use settlement_metrics::{NoOpSettlementMetrics, SettlementMetrics, SettlementMetricsError};
