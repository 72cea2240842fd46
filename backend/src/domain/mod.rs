//! Domain primitives, aggregates, and services.
//!
//! Purpose: define the strongly typed enrollment and settlement model used by
//! the HTTP and persistence adapters, and the services that drive it through
//! the ports in [`ports`]. Invariants are documented on each type.
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - Event, PaymentObligation, SettlementConflict: the records whose
//!   occupancy and status invariants the services protect.
//! - EnrollmentService, PaymentIntentService, SettlementService,
//!   SettlementSweep, EventService, PaymentQueryService: driving-port
//!   implementations wired by the server.

pub mod auth;
pub mod capacity_guard;
pub mod enrollment_service;
pub mod error;
pub mod event;
pub mod event_service;
pub mod payment;
pub mod payment_intent_service;
pub mod payment_queries;
pub mod ports;
pub mod provider_retry;
pub mod rejection;
pub mod settlement;
pub mod trace_id;
pub mod user;

pub use self::auth::{LoginCredentials, LoginValidationError};
pub use self::capacity_guard::CapacityGuard;
pub use self::enrollment_service::EnrollmentService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::event::{
    AdmitOutcome, Capacity, Category, Event, EventDraft, EventId, EventParts, EventStatus,
    EventValidationError, MAX_CAPACITY, Price, RemoveOutcome,
};
pub use self::event_service::EventService;
pub use self::payment::{
    ConflictReason, Money, NewObligation, PaymentObligation, PaymentObligationId, PaymentStatus,
    PaymentValidationError, ProviderTransactionId, SettlementConflict, TerminalStatus,
    TransitionOutcome,
};
pub use self::payment_intent_service::{
    PaymentIntentHandle, PaymentIntentPorts, PaymentIntentService,
};
pub use self::payment_queries::{
    EventRevenue, HostRevenue, PaymentQueryPorts, PaymentQueryService,
};
pub use self::provider_retry::{
    BackoffJitter, ProviderRetry, RandomJitter, RetrySleeper, TokioSleeper,
};
pub use self::rejection::Rejection;
pub use self::settlement::{
    SIGNATURE_HEADER, SettlementPorts, SettlementReceipt, SettlementReport, SettlementService,
    SettlementSignal, SettlementSweep, SignalSource, SignatureError, SweepConfig, SweepSummary,
    WebhookEnvelope, WebhookEnvelopeError, WebhookReceipt, WebhookVerifier,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{Identity, Role, UserId, UserValidationError};

