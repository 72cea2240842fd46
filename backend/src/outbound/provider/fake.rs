//! Deterministic in-process payment provider.
//!
//! Intent ids derive from the idempotency key, so a retried create returns
//! the same intent the way the real provider does. Intents stay pending
//! until [`FakePaymentProvider::set_status`] moves them.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::ProviderTransactionId;
use crate::domain::ports::{
    CreateIntentRequest, PaymentProvider, PaymentProviderError, ProviderIntent,
    ProviderIntentStatus,
};

/// In-memory provider keyed by intent id.
#[derive(Debug, Default)]
pub struct FakePaymentProvider {
    intents: Mutex<HashMap<ProviderTransactionId, ProviderIntent>>,
}

impl FakePaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intent id the fake assigns to `idempotency_key`.
    pub fn intent_id_for(idempotency_key: &str) -> String {
        let digest = Sha256::digest(idempotency_key.as_bytes());
        let hex = hex::encode(digest);
        format!("pi_fake_{}", hex.get(..24).unwrap_or(&hex))
    }

    /// Move an intent to `status`, as the payer or provider would.
    ///
    /// Returns `false` when the intent does not exist.
    pub fn set_status(&self, id: &ProviderTransactionId, status: ProviderIntentStatus) -> bool {
        let Ok(mut intents) = self.intents.lock() else {
            return false;
        };
        match intents.get_mut(id) {
            Some(intent) => {
                intent.status = status;
                true
            }
            None => false,
        }
    }

    /// Number of distinct intents created so far.
    pub fn intent_count(&self) -> usize {
        self.intents.lock().map(|intents| intents.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PaymentProvider for FakePaymentProvider {
    async fn create_intent(
        &self,
        request: &CreateIntentRequest,
    ) -> Result<ProviderIntent, PaymentProviderError> {
        if request.amount.minor_units() <= 0 {
            return Err(PaymentProviderError::rejected(
                "amount must be a positive integer",
            ));
        }
        let id = ProviderTransactionId::new(Self::intent_id_for(&request.idempotency_key))
            .map_err(|err| PaymentProviderError::decode(err.to_string()))?;
        let mut intents = self
            .intents
            .lock()
            .map_err(|_| PaymentProviderError::transient("fake provider lock poisoned"))?;
        let intent = intents.entry(id.clone()).or_insert_with(|| ProviderIntent {
            client_secret: Some(format!("{id}_secret_fake")),
            id,
            status: ProviderIntentStatus::Pending,
            amount_minor_units: request.amount.minor_units(),
        });
        Ok(intent.clone())
    }

    async fn retrieve_intent(
        &self,
        id: &ProviderTransactionId,
    ) -> Result<ProviderIntent, PaymentProviderError> {
        let intents = self
            .intents
            .lock()
            .map_err(|_| PaymentProviderError::transient("fake provider lock poisoned"))?;
        intents
            .get(id)
            .cloned()
            .ok_or_else(|| PaymentProviderError::rejected(format!("no such payment intent: {id}")))
    }
}
