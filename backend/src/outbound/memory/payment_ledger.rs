//! In-memory `PaymentLedger`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{PaymentLedger, PaymentLedgerError};
use crate::domain::{
    EventId, PaymentObligation, PaymentStatus, ProviderTransactionId, TerminalStatus,
    TransitionOutcome, UserId,
};

use super::lock;

/// An obligation plus the sweep bookkeeping stored beside it.
#[derive(Debug, Clone)]
struct Entry {
    obligation: PaymentObligation,
    last_examined_at: Option<DateTime<Utc>>,
    seat_resolved: bool,
}

impl Entry {
    fn rotation_key(&self) -> (Option<DateTime<Utc>>, DateTime<Utc>, &ProviderTransactionId) {
        (
            self.last_examined_at,
            self.obligation.created_at,
            &self.obligation.provider_transaction_id,
        )
    }
}

/// Obligations keyed by provider transaction id.
#[derive(Debug, Default)]
pub struct InMemoryPaymentLedger {
    obligations: Mutex<HashMap<ProviderTransactionId, Entry>>,
}

impl InMemoryPaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentLedger for InMemoryPaymentLedger {
    async fn open(&self, obligation: &PaymentObligation) -> Result<(), PaymentLedgerError> {
        let mut obligations = lock(&self.obligations, PaymentLedgerError::query)?;
        if obligations.contains_key(&obligation.provider_transaction_id) {
            return Err(PaymentLedgerError::duplicate_transaction(
                obligation.provider_transaction_id.as_str(),
            ));
        }
        obligations.insert(
            obligation.provider_transaction_id.clone(),
            Entry {
                obligation: obligation.clone(),
                last_examined_at: None,
                seat_resolved: false,
            },
        );
        Ok(())
    }

    async fn transition_once(
        &self,
        provider_transaction_id: &ProviderTransactionId,
        target: TerminalStatus,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, PaymentLedgerError> {
        let mut obligations = lock(&self.obligations, PaymentLedgerError::query)?;
        let obligation = &mut obligations
            .get_mut(provider_transaction_id)
            .ok_or_else(|| PaymentLedgerError::not_found(provider_transaction_id.as_str()))?
            .obligation;
        if obligation.transition_once(target, now) {
            Ok(TransitionOutcome::Applied(obligation.clone()))
        } else {
            Ok(TransitionOutcome::AlreadyTerminal(obligation.clone()))
        }
    }

    async fn find_by_transaction(
        &self,
        provider_transaction_id: &ProviderTransactionId,
    ) -> Result<Option<PaymentObligation>, PaymentLedgerError> {
        let obligations = lock(&self.obligations, PaymentLedgerError::query)?;
        Ok(obligations
            .get(provider_transaction_id)
            .map(|entry| entry.obligation.clone()))
    }

    async fn claim_stale_pending(
        &self,
        created_before: DateTime<Utc>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<PaymentObligation>, PaymentLedgerError> {
        let mut obligations = lock(&self.obligations, PaymentLedgerError::query)?;
        Ok(claim(&mut obligations, now, limit, |entry| {
            entry.obligation.status == PaymentStatus::Pending
                && entry.obligation.created_at < created_before
        }))
    }

    async fn claim_unseated_completions(
        &self,
        completed_before: DateTime<Utc>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<PaymentObligation>, PaymentLedgerError> {
        let mut obligations = lock(&self.obligations, PaymentLedgerError::query)?;
        Ok(claim(&mut obligations, now, limit, |entry| {
            entry.obligation.status == PaymentStatus::Completed
                && !entry.seat_resolved
                && entry.obligation.updated_at < completed_before
        }))
    }

    async fn mark_seat_resolved(
        &self,
        provider_transaction_id: &ProviderTransactionId,
        _now: DateTime<Utc>,
    ) -> Result<(), PaymentLedgerError> {
        let mut obligations = lock(&self.obligations, PaymentLedgerError::query)?;
        let entry = obligations
            .get_mut(provider_transaction_id)
            .ok_or_else(|| PaymentLedgerError::not_found(provider_transaction_id.as_str()))?;
        if entry.obligation.status == PaymentStatus::Completed {
            entry.seat_resolved = true;
        }
        Ok(())
    }

    async fn list_for_payer(
        &self,
        payer_id: &UserId,
    ) -> Result<Vec<PaymentObligation>, PaymentLedgerError> {
        let obligations = lock(&self.obligations, PaymentLedgerError::query)?;
        let mut owned: Vec<PaymentObligation> = obligations
            .values()
            .map(|entry| &entry.obligation)
            .filter(|obligation| obligation.payer_id == *payer_id)
            .cloned()
            .collect();
        owned.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(owned)
    }

    async fn completed_for_events(
        &self,
        event_ids: &[EventId],
    ) -> Result<Vec<PaymentObligation>, PaymentLedgerError> {
        let obligations = lock(&self.obligations, PaymentLedgerError::query)?;
        let mut completed: Vec<PaymentObligation> = obligations
            .values()
            .map(|entry| &entry.obligation)
            .filter(|obligation| {
                obligation.status == PaymentStatus::Completed
                    && event_ids.contains(&obligation.event_id)
            })
            .cloned()
            .collect();
        completed.sort_by_key(|obligation| obligation.created_at);
        Ok(completed)
    }
}

/// Stamp and return the `limit` matching entries that are next in rotation.
fn claim(
    obligations: &mut HashMap<ProviderTransactionId, Entry>,
    now: DateTime<Utc>,
    limit: usize,
    matches: impl Fn(&Entry) -> bool,
) -> Vec<PaymentObligation> {
    let mut due: Vec<&mut Entry> = obligations.values_mut().filter(|entry| matches(entry)).collect();
    // `None` sorts before `Some`, so rows never examined lead.
    due.sort_by(|left, right| left.rotation_key().cmp(&right.rotation_key()));
    let mut claimed: Vec<PaymentObligation> = due
        .into_iter()
        .take(limit)
        .map(|entry| {
            entry.last_examined_at = Some(now);
            entry.obligation.clone()
        })
        .collect();
    claimed.sort_by(|left, right| {
        left.created_at
            .cmp(&right.created_at)
            .then_with(|| left.id.as_uuid().cmp(right.id.as_uuid()))
    });
    claimed
}
