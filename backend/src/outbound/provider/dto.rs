//! DTOs for decoding payment intent responses.

use serde::Deserialize;

use crate::domain::ProviderTransactionId;
use crate::domain::ports::{ProviderIntent, ProviderIntentStatus};

#[derive(Debug, Deserialize)]
pub(super) struct PaymentIntentDto {
    pub(super) id: String,
    #[serde(default)]
    pub(super) client_secret: Option<String>,
    pub(super) status: String,
    #[serde(default)]
    pub(super) amount: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelopeDto {
    pub(super) error: ErrorDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorDto {
    #[serde(default)]
    pub(super) message: Option<String>,
    #[serde(default, rename = "type")]
    pub(super) error_type: Option<String>,
}

/// Collapse the provider's intent lifecycle onto what settlement needs.
///
/// Only `succeeded` captures funds and only `canceled` is final without
/// capture; every other state may still move, so it stays pending.
pub(super) fn map_intent_status(raw: &str) -> ProviderIntentStatus {
    match raw {
        "succeeded" => ProviderIntentStatus::Succeeded,
        "canceled" => ProviderIntentStatus::Failed,
        _ => ProviderIntentStatus::Pending,
    }
}

impl PaymentIntentDto {
    pub(super) fn into_domain(self) -> Result<ProviderIntent, String> {
        let id = ProviderTransactionId::new(self.id)
            .map_err(|err| format!("invalid intent id: {err}"))?;
        Ok(ProviderIntent {
            id,
            client_secret: self.client_secret,
            status: map_intent_status(&self.status),
            amount_minor_units: self.amount,
        })
    }
}
