//! Payment read models: payer history, host revenue, and the operator view
//! of settlement conflicts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{
    EventRepository, PaymentLedger, PaymentQuery, SettlementConflictRepository,
};
use crate::domain::rejection::{
    map_conflict_repository_error, map_event_repository_error, map_ledger_error,
};
use crate::domain::{
    Error, EventId, Identity, PaymentObligation, SettlementConflict, UserId,
};

/// Completed revenue for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRevenue {
    pub event_id: EventId,
    pub title: String,
    pub revenue: i64,
    pub payments: u64,
}

/// Completed revenue across a host's events, in minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRevenue {
    pub host_id: UserId,
    pub total_revenue: i64,
    pub total_payments: u64,
    pub by_event: Vec<EventRevenue>,
}

/// Port bundle for payment reads.
#[derive(Clone)]
pub struct PaymentQueryPorts {
    pub events: Arc<dyn EventRepository>,
    pub ledger: Arc<dyn PaymentLedger>,
    pub conflicts: Arc<dyn SettlementConflictRepository>,
}

/// Payment query service implementing [`PaymentQuery`].
#[derive(Clone)]
pub struct PaymentQueryService {
    ports: PaymentQueryPorts,
}

impl PaymentQueryService {
    pub fn new(ports: PaymentQueryPorts) -> Self {
        Self { ports }
    }
}

fn require_self_or_admin(caller: &Identity, user_id: &UserId) -> Result<(), Error> {
    if caller.acts_for(user_id) {
        Ok(())
    } else {
        Err(Error::forbidden("you may only view your own payments"))
    }
}

#[async_trait]
impl PaymentQuery for PaymentQueryService {
    async fn payments_for_user(
        &self,
        caller: &Identity,
        user_id: &UserId,
    ) -> Result<Vec<PaymentObligation>, Error> {
        require_self_or_admin(caller, user_id)?;
        self.ports
            .ledger
            .list_for_payer(user_id)
            .await
            .map_err(map_ledger_error)
    }

    async fn host_revenue(
        &self,
        caller: &Identity,
        host_id: &UserId,
    ) -> Result<HostRevenue, Error> {
        require_self_or_admin(caller, host_id)?;
        let events = self
            .ports
            .events
            .list_by_host(host_id)
            .await
            .map_err(map_event_repository_error)?;
        let event_ids: Vec<EventId> = events.iter().map(|event| event.id()).collect();
        let completed = if event_ids.is_empty() {
            Vec::new()
        } else {
            self.ports
                .ledger
                .completed_for_events(&event_ids)
                .await
                .map_err(map_ledger_error)?
        };

        let mut per_event: HashMap<EventId, (i64, u64)> = HashMap::new();
        for obligation in &completed {
            let entry = per_event.entry(obligation.event_id).or_default();
            entry.0 = entry.0.saturating_add(obligation.amount.minor_units());
            entry.1 += 1;
        }
        let by_event: Vec<EventRevenue> = events
            .iter()
            .filter_map(|event| {
                per_event
                    .get(&event.id())
                    .map(|(revenue, payments)| EventRevenue {
                        event_id: event.id(),
                        title: event.title().to_owned(),
                        revenue: *revenue,
                        payments: *payments,
                    })
            })
            .collect();

        Ok(HostRevenue {
            host_id: *host_id,
            total_revenue: by_event
                .iter()
                .fold(0_i64, |total, entry| total.saturating_add(entry.revenue)),
            total_payments: by_event.iter().map(|entry| entry.payments).sum(),
            by_event,
        })
    }

    async fn settlement_conflicts(
        &self,
        caller: &Identity,
    ) -> Result<Vec<SettlementConflict>, Error> {
        if !caller.is_admin() {
            return Err(Error::forbidden("settlement conflicts are visible to admins only"));
        }
        self.ports
            .conflicts
            .list()
            .await
            .map_err(map_conflict_repository_error)
    }
}
