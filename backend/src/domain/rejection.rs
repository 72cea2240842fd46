//! Business rejections for enrollment, payment, and settlement.
//!
//! Each rejection carries a stable kind (`details.code`) alongside the
//! category code on [`Error`], so clients can branch without parsing
//! messages. Port failures are mapped here too: connection loss becomes
//! `service_unavailable`, anything else `internal_error`.

use serde_json::json;

use super::ports::{
    EventCapacityStoreError, EventRepositoryError, PaymentLedgerError, PaymentProviderError,
    SettlementConflictRepositoryError,
};
use super::{Error, ErrorCode, EventId};

/// Stable, user-facing rejection kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("event {0} not found")]
    EventNotFound(EventId),
    #[error("this event requires payment")]
    NotFree,
    #[error("this event is free")]
    NotPaid,
    #[error("event is full")]
    EventFull,
    #[error("you have already joined this event")]
    AlreadyEnrolled,
    #[error("this event is not open for enrollment")]
    EventNotJoinable,
    #[error("you are not a participant of this event")]
    NotEnrolled,
    #[error("payment not found")]
    ObligationNotFound,
    #[error("webhook signature could not be verified")]
    InvalidSignature,
    #[error("webhook body is not a valid payment notification")]
    InvalidEnvelope,
    #[error("payment provider is unavailable, try again")]
    ProviderUnavailable,
    #[error("payment provider rejected the request")]
    ProviderRejected,
    #[error("cannot delete an event with participants; cancel it instead")]
    EventHasParticipants,
    #[error("event can no longer be cancelled")]
    EventNotCancellable,
    #[error("a payment for this transaction already exists")]
    DuplicatePayment,
}

impl Rejection {
    /// Stable machine-readable kind carried in `details.code`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EventNotFound(_) => "event_not_found",
            Self::NotFree => "not_free",
            Self::NotPaid => "not_paid",
            Self::EventFull => "event_full",
            Self::AlreadyEnrolled => "already_enrolled",
            Self::EventNotJoinable => "event_not_joinable",
            Self::NotEnrolled => "not_enrolled",
            Self::ObligationNotFound => "obligation_not_found",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidEnvelope => "invalid_envelope",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::ProviderRejected => "provider_rejected",
            Self::EventHasParticipants => "event_has_participants",
            Self::EventNotCancellable => "event_not_cancellable",
            Self::DuplicatePayment => "duplicate_payment",
        }
    }

    const fn error_code(&self) -> ErrorCode {
        match self {
            Self::EventNotFound(_) | Self::ObligationNotFound => ErrorCode::NotFound,
            Self::EventFull
            | Self::AlreadyEnrolled
            | Self::EventNotJoinable
            | Self::EventHasParticipants
            | Self::EventNotCancellable
            | Self::DuplicatePayment => ErrorCode::Conflict,
            Self::ProviderUnavailable => ErrorCode::ServiceUnavailable,
            Self::NotFree
            | Self::NotPaid
            | Self::NotEnrolled
            | Self::InvalidSignature
            | Self::InvalidEnvelope
            | Self::ProviderRejected => ErrorCode::InvalidRequest,
        }
    }
}

impl From<Rejection> for Error {
    fn from(value: Rejection) -> Self {
        Error::new(value.error_code(), value.to_string())
            .with_details(json!({ "code": value.kind() }))
    }
}

pub(crate) fn map_capacity_store_error(error: EventCapacityStoreError) -> Error {
    match error {
        EventCapacityStoreError::Connection { message } => {
            Error::service_unavailable(format!("event store unavailable: {message}"))
        }
        EventCapacityStoreError::Query { message } => {
            Error::internal(format!("event store error: {message}"))
        }
        EventCapacityStoreError::EventNotFound { event_id } => {
            Error::not_found(format!("event {event_id} not found"))
                .with_details(json!({ "code": "event_not_found" }))
        }
        EventCapacityStoreError::Contended { event_id } => {
            Error::service_unavailable(format!("event {event_id} is busy; retry the request"))
        }
    }
}

pub(crate) fn map_event_repository_error(error: EventRepositoryError) -> Error {
    match error {
        EventRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("event repository unavailable: {message}"))
        }
        EventRepositoryError::Query { message } | EventRepositoryError::Corrupt { message } => {
            Error::internal(format!("event repository error: {message}"))
        }
    }
}

pub(crate) fn map_ledger_error(error: PaymentLedgerError) -> Error {
    match error {
        PaymentLedgerError::Connection { message } => {
            Error::service_unavailable(format!("payment ledger unavailable: {message}"))
        }
        PaymentLedgerError::DuplicateTransaction { .. } => Rejection::DuplicatePayment.into(),
        PaymentLedgerError::NotFound { .. } => Rejection::ObligationNotFound.into(),
        PaymentLedgerError::Query { message } | PaymentLedgerError::Corrupt { message } => {
            Error::internal(format!("payment ledger error: {message}"))
        }
    }
}

pub(crate) fn map_conflict_repository_error(error: SettlementConflictRepositoryError) -> Error {
    match error {
        SettlementConflictRepositoryError::Connection { message } => Error::service_unavailable(
            format!("settlement conflict repository unavailable: {message}"),
        ),
        SettlementConflictRepositoryError::Query { message } => {
            Error::internal(format!("settlement conflict repository error: {message}"))
        }
    }
}

pub(crate) fn map_provider_error(error: &PaymentProviderError) -> Error {
    match error {
        PaymentProviderError::Transient { .. } => Rejection::ProviderUnavailable.into(),
        PaymentProviderError::Rejected { .. } => Rejection::ProviderRejected.into(),
        PaymentProviderError::Decode { message } => {
            Error::internal(format!("payment provider response invalid: {message}"))
        }
    }
}
