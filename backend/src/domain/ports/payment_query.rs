//! Driving port for payment history and revenue reads.

use async_trait::async_trait;

use crate::domain::{
    Error, HostRevenue, Identity, PaymentObligation, SettlementConflict, UserId,
};

/// Payment read models.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentQuery: Send + Sync {
    /// Obligations opened by `user_id`; self or admin only.
    async fn payments_for_user(
        &self,
        caller: &Identity,
        user_id: &UserId,
    ) -> Result<Vec<PaymentObligation>, Error>;

    /// Completed revenue across the host's events; self or admin only.
    async fn host_revenue(&self, caller: &Identity, host_id: &UserId) -> Result<HostRevenue, Error>;

    /// Recorded settlement conflicts; admin only.
    async fn settlement_conflicts(
        &self,
        caller: &Identity,
    ) -> Result<Vec<SettlementConflict>, Error>;
}
