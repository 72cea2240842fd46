//! Driven port for the external payment provider.
//!
//! The provider owns intent state; this crate only creates intents and reads
//! their reported status. Errors are split by retry safety so callers can
//! retry [`PaymentProviderError::Transient`] without risking a second ledger
//! entry.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{EventId, Money, ProviderTransactionId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by payment provider adapters.
    pub enum PaymentProviderError {
        /// Network failure, timeout, rate limit, or provider-side 5xx.
        Transient { message: String } => "payment provider temporarily unavailable: {message}",
        /// The provider refused the request.
        Rejected { message: String } => "payment provider rejected the request: {message}",
        /// The provider response could not be decoded.
        Decode { message: String } => "payment provider response could not be decoded: {message}",
    }
}

impl PaymentProviderError {
    /// Whether repeating the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Metadata attached to an intent so webhooks can be traced back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentMetadata {
    pub event_id: EventId,
    pub payer_id: UserId,
    pub event_title: String,
}

/// Request to create a provider-side payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIntentRequest {
    pub amount: Money,
    pub metadata: IntentMetadata,
    /// Reused verbatim across retries so the provider returns one intent.
    pub idempotency_key: String,
}

/// Provider-reported payment state, collapsed to what settlement needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderIntentStatus {
    /// Funds captured.
    Succeeded,
    /// Payment definitively failed or was cancelled.
    Failed,
    /// Still awaiting the payer or the provider.
    Pending,
}

/// Provider-side payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIntent {
    pub id: ProviderTransactionId,
    pub client_secret: Option<String>,
    pub status: ProviderIntentStatus,
    pub amount_minor_units: i64,
}

/// External payment provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payment intent for `request.amount`.
    async fn create_intent(
        &self,
        request: &CreateIntentRequest,
    ) -> Result<ProviderIntent, PaymentProviderError>;

    /// Read the provider's current view of an intent.
    async fn retrieve_intent(
        &self,
        id: &ProviderTransactionId,
    ) -> Result<ProviderIntent, PaymentProviderError>;
}

/// Retry policy for transient provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderRetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each attempt.
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl Default for ProviderRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}
