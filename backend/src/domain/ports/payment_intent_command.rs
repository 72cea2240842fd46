//! Driving port for opening paid enrollments.

use async_trait::async_trait;

use crate::domain::{Error, EventId, Identity, PaymentIntentHandle};

/// Start a paid enrollment.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentIntentCommand: Send + Sync {
    /// Create a provider intent and its pending obligation for `caller`.
    async fn create_intent(
        &self,
        caller: &Identity,
        event_id: &EventId,
    ) -> Result<PaymentIntentHandle, Error>;
}
