//! Driving port for the two settlement triggers.
//!
//! Both the provider webhook and the client confirmation enter the same
//! idempotent settlement path; this port only differs in how each trigger is
//! authenticated.

use async_trait::async_trait;

use crate::domain::{Error, Identity, ProviderTransactionId, SettlementReceipt, WebhookReceipt};

/// Settlement entry points.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettlementCommand: Send + Sync {
    /// Verify and apply a signed provider notification.
    async fn handle_webhook<'a>(
        &self,
        payload: &[u8],
        signature_header: Option<&'a str>,
    ) -> Result<WebhookReceipt, Error>;

    /// Settle from the provider's current view after a client confirmation.
    async fn confirm(
        &self,
        caller: &Identity,
        provider_transaction_id: &ProviderTransactionId,
    ) -> Result<SettlementReceipt, Error>;
}
