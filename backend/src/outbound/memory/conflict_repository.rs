//! In-memory `SettlementConflictRepository`.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::SettlementConflict;
use crate::domain::ports::{SettlementConflictRepository, SettlementConflictRepositoryError};

use super::lock;

/// Conflicts in recording order; one per provider transaction id.
#[derive(Debug, Default)]
pub struct InMemorySettlementConflictRepository {
    conflicts: Mutex<Vec<SettlementConflict>>,
}

impl InMemorySettlementConflictRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettlementConflictRepository for InMemorySettlementConflictRepository {
    async fn record(
        &self,
        conflict: &SettlementConflict,
    ) -> Result<bool, SettlementConflictRepositoryError> {
        let mut conflicts = lock(&self.conflicts, SettlementConflictRepositoryError::query)?;
        if conflicts
            .iter()
            .any(|existing| existing.provider_transaction_id == conflict.provider_transaction_id)
        {
            return Ok(false);
        }
        conflicts.push(conflict.clone());
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<SettlementConflict>, SettlementConflictRepositoryError> {
        let conflicts = lock(&self.conflicts, SettlementConflictRepositoryError::query)?;
        Ok(conflicts.iter().rev().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ConflictReason, EventId, Money, NewObligation, PaymentObligation, ProviderTransactionId,
        UserId,
    };
    use chrono::Utc;

    #[tokio::test]
    async fn records_one_conflict_per_transaction() {
        let obligation = PaymentObligation::open(
            NewObligation {
                provider_transaction_id: ProviderTransactionId::new("pi_full").expect("valid id"),
                payer_id: UserId::random(),
                event_id: EventId::random(),
                amount: Money::new(900, "usd").expect("valid amount"),
            },
            Utc::now(),
        );
        let repo = InMemorySettlementConflictRepository::new();

        let first =
            SettlementConflict::for_obligation(&obligation, ConflictReason::EventFull, Utc::now());
        let again =
            SettlementConflict::for_obligation(&obligation, ConflictReason::EventFull, Utc::now());
        assert!(repo.record(&first).await.expect("record"));
        assert!(!repo.record(&again).await.expect("record"));
        assert_eq!(repo.list().await.expect("list"), vec![first]);
    }
}
