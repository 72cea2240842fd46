//! Payment obligations and settlement records.
//!
//! A [`PaymentObligation`] tracks one attempt to pay for one enrollment. Its
//! [`ProviderTransactionId`] is the idempotency key that collapses duplicate
//! and racing completion signals into a single effect.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EventId, UserId};

/// Validation failures for payment values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentValidationError {
    /// Provider transaction id was blank.
    #[error("provider transaction id must not be empty")]
    EmptyTransactionId,
    /// Provider transaction id exceeded the stored width.
    #[error("provider transaction id must be at most {max} characters")]
    TransactionIdTooLong { max: usize },
    /// Status string not recognised.
    #[error("unknown payment status: {0}")]
    UnknownStatus(String),
    /// Conflict reason string not recognised.
    #[error("unknown settlement conflict reason: {0}")]
    UnknownConflictReason(String),
    /// Negative amount.
    #[error("amount must not be negative")]
    NegativeAmount,
}

const TRANSACTION_ID_MAX: usize = 255;

/// Ledger identity of an obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentObligationId(Uuid);

impl PaymentObligationId {
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for PaymentObligationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Provider-issued payment handle; unique across the ledger.
///
/// # Examples
/// ```
/// use gatherings::domain::ProviderTransactionId;
///
/// let id = ProviderTransactionId::new("pi_3Nabc").unwrap();
/// assert_eq!(id.as_ref(), "pi_3Nabc");
/// assert!(ProviderTransactionId::new("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderTransactionId(String);

impl ProviderTransactionId {
    /// Validate a provider transaction id.
    pub fn new(raw: impl Into<String>) -> Result<Self, PaymentValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PaymentValidationError::EmptyTransactionId);
        }
        if trimmed.chars().count() > TRANSACTION_ID_MAX {
            return Err(PaymentValidationError::TransactionIdTooLong {
                max: TRANSACTION_ID_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ProviderTransactionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderTransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProviderTransactionId {
    type Error = PaymentValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProviderTransactionId> for String {
    fn from(value: ProviderTransactionId) -> Self {
        value.0
    }
}

/// Ledger status. `completed` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Terminal records are never re-transitioned.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl FromStr for PaymentStatus {
    type Err = PaymentValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(PaymentValidationError::UnknownStatus(other.to_owned())),
        }
    }
}

/// Terminal status a settlement may drive an obligation to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Completed,
    Failed,
}

impl From<TerminalStatus> for PaymentStatus {
    fn from(value: TerminalStatus) -> Self {
        match value {
            TerminalStatus::Completed => Self::Completed,
            TerminalStatus::Failed => Self::Failed,
        }
    }
}

/// Amount and currency of one obligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Money {
    minor_units: i64,
    currency: String,
}

impl Money {
    /// Validate a non-negative amount; currency codes are lower-cased.
    pub fn new(minor_units: i64, currency: &str) -> Result<Self, PaymentValidationError> {
        if minor_units < 0 {
            return Err(PaymentValidationError::NegativeAmount);
        }
        Ok(Self {
            minor_units,
            currency: currency.trim().to_ascii_lowercase(),
        })
    }

    #[must_use]
    pub const fn minor_units(&self) -> i64 {
        self.minor_units
    }

    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }
}

/// Request to open a pending obligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObligation {
    pub provider_transaction_id: ProviderTransactionId,
    pub payer_id: UserId,
    pub event_id: EventId,
    pub amount: Money,
}

/// One payment attempt for one enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentObligation {
    pub id: PaymentObligationId,
    pub provider_transaction_id: ProviderTransactionId,
    pub payer_id: UserId,
    pub event_id: EventId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentObligation {
    /// Open a pending obligation at `now`.
    #[must_use]
    pub fn open(request: NewObligation, now: DateTime<Utc>) -> Self {
        Self {
            id: PaymentObligationId::random(),
            provider_transaction_id: request.provider_transaction_id,
            payer_id: request.payer_id,
            event_id: request.event_id,
            amount: request.amount,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a terminal transition if the record is still pending.
    ///
    /// Returns `true` when this call performed the transition.
    pub fn transition_once(&mut self, target: TerminalStatus, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = target.into();
        self.updated_at = now;
        true
    }
}

/// Outcome of [`crate::domain::ports::PaymentLedger::transition_once`].
///
/// Both variants carry the obligation as stored after the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// This call moved the record out of `pending`.
    Applied(PaymentObligation),
    /// The record was already terminal; nothing changed.
    AlreadyTerminal(PaymentObligation),
}

impl TransitionOutcome {
    /// The obligation as stored after the call.
    #[must_use]
    pub fn obligation(&self) -> &PaymentObligation {
        match self {
            Self::Applied(obligation) | Self::AlreadyTerminal(obligation) => obligation,
        }
    }
}

/// Why a completed payment could not be converted into a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Capacity was exhausted before settlement.
    EventFull,
    /// Event was no longer upcoming or approved.
    EventNotJoinable,
    /// Event no longer exists.
    EventMissing,
    /// Payer already held a seat through another obligation.
    AlreadyEnrolled,
    /// The capacity store failed after the payment completed.
    AdmissionFailed,
    /// The provider captured the payment after the obligation was already
    /// marked failed, e.g. a retried card on a declined intent.
    SucceededAfterFailure,
}

impl ConflictReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EventFull => "event_full",
            Self::EventNotJoinable => "event_not_joinable",
            Self::EventMissing => "event_missing",
            Self::AlreadyEnrolled => "already_enrolled",
            Self::AdmissionFailed => "admission_failed",
            Self::SucceededAfterFailure => "succeeded_after_failure",
        }
    }
}

impl FromStr for ConflictReason {
    type Err = PaymentValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event_full" => Ok(Self::EventFull),
            "event_not_joinable" => Ok(Self::EventNotJoinable),
            "event_missing" => Ok(Self::EventMissing),
            "already_enrolled" => Ok(Self::AlreadyEnrolled),
            "admission_failed" => Ok(Self::AdmissionFailed),
            "succeeded_after_failure" => Ok(Self::SucceededAfterFailure),
            other => Err(PaymentValidationError::UnknownConflictReason(
                other.to_owned(),
            )),
        }
    }
}

/// Money captured without a seat, awaiting operator reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementConflict {
    pub id: Uuid,
    pub obligation_id: PaymentObligationId,
    pub provider_transaction_id: ProviderTransactionId,
    pub event_id: EventId,
    pub payer_id: UserId,
    pub reason: ConflictReason,
    pub recorded_at: DateTime<Utc>,
}

impl SettlementConflict {
    /// Record a conflict for `obligation`.
    #[must_use]
    pub fn for_obligation(
        obligation: &PaymentObligation,
        reason: ConflictReason,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            obligation_id: obligation.id,
            provider_transaction_id: obligation.provider_transaction_id.clone(),
            event_id: obligation.event_id,
            payer_id: obligation.payer_id,
            reason,
            recorded_at: now,
        }
    }
}
