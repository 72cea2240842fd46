//! Driven port owning payment obligations.
//!
//! `transition_once` is the idempotency primitive of settlement: a single
//! predicated write ("set status only while pending") that reports whether
//! *this* call performed the transition. Callers branch on the returned
//! [`TransitionOutcome`], never on mere success.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    EventId, PaymentObligation, ProviderTransactionId, TerminalStatus, TransitionOutcome, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by payment ledger adapters.
    pub enum PaymentLedgerError {
        /// Ledger connection could not be established.
        Connection { message: String } => "payment ledger connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "payment ledger query failed: {message}",
        /// An obligation already exists for the provider transaction id.
        DuplicateTransaction { provider_transaction_id: String } =>
            "obligation already exists for {provider_transaction_id}",
        /// No obligation exists for the provider transaction id.
        NotFound { provider_transaction_id: String } =>
            "no obligation for {provider_transaction_id}",
        /// A stored row could not be converted into a domain obligation.
        Corrupt { message: String } => "payment ledger returned an invalid row: {message}",
    }
}

/// Payment obligation storage with single-winner status transitions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Persist a new pending obligation.
    ///
    /// Fails with [`PaymentLedgerError::DuplicateTransaction`] when the
    /// provider transaction id is already recorded.
    async fn open(&self, obligation: &PaymentObligation) -> Result<(), PaymentLedgerError>;

    /// Move the obligation from `pending` to `target`, at most once.
    async fn transition_once(
        &self,
        provider_transaction_id: &ProviderTransactionId,
        target: TerminalStatus,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, PaymentLedgerError>;

    /// Fetch one obligation by its idempotency key.
    async fn find_by_transaction(
        &self,
        provider_transaction_id: &ProviderTransactionId,
    ) -> Result<Option<PaymentObligation>, PaymentLedgerError>;

    /// Claim up to `limit` pending obligations created before
    /// `created_before` for one sweep pass.
    ///
    /// Rows never examined come first, then the least recently examined.
    /// Each returned row is stamped as examined at `now`, so obligations
    /// the provider keeps pending rotate to the back and the next pass
    /// reaches the rows behind them. The batch is returned oldest first.
    async fn claim_stale_pending(
        &self,
        created_before: DateTime<Utc>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<PaymentObligation>, PaymentLedgerError>;

    /// Claim up to `limit` completed obligations whose seat was never
    /// resolved and that completed before `completed_before`, in the same
    /// rotation order as [`Self::claim_stale_pending`].
    async fn claim_unseated_completions(
        &self,
        completed_before: DateTime<Utc>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<PaymentObligation>, PaymentLedgerError>;

    /// Record that a completed obligation's payer was seated or that its
    /// conflict was recorded. Repeating the call is harmless.
    async fn mark_seat_resolved(
        &self,
        provider_transaction_id: &ProviderTransactionId,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentLedgerError>;

    /// Every obligation opened by `payer_id`, newest first.
    async fn list_for_payer(
        &self,
        payer_id: &UserId,
    ) -> Result<Vec<PaymentObligation>, PaymentLedgerError>;

    /// Completed obligations for any of `event_ids`.
    async fn completed_for_events(
        &self,
        event_ids: &[EventId],
    ) -> Result<Vec<PaymentObligation>, PaymentLedgerError>;
}
