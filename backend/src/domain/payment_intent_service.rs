//! Paid enrollment: provider intent first, pending obligation second.
//!
//! Seat availability is only checked advisorily here; the binding admission
//! happens at settlement. The ledger is opened exactly once per attempt,
//! after the provider call succeeds, so retried provider calls never create
//! a second obligation.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::info;
use uuid::Uuid;

use super::capacity_guard::CapacityGuard;
use super::ports::{
    CreateIntentRequest, EventCapacityStore, EventRepository, IntentMetadata, PaymentIntentCommand,
    PaymentLedger, PaymentProvider,
};
use super::provider_retry::ProviderRetry;
use super::rejection::{
    map_capacity_store_error, map_event_repository_error, map_ledger_error, map_provider_error,
};
use super::{
    Error, EventId, Identity, Money, NewObligation, PaymentObligation, ProviderTransactionId,
    Rejection,
};

/// What the client needs to complete a payment with the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentHandle {
    pub provider_transaction_id: ProviderTransactionId,
    pub client_secret: String,
    pub amount: Money,
}

/// Port bundle required to open paid enrollments.
#[derive(Clone)]
pub struct PaymentIntentPorts {
    pub events: Arc<dyn EventRepository>,
    pub capacity: Arc<dyn EventCapacityStore>,
    pub ledger: Arc<dyn PaymentLedger>,
    pub provider: Arc<dyn PaymentProvider>,
}

/// Payment intent service implementing [`PaymentIntentCommand`].
pub struct PaymentIntentService {
    events: Arc<dyn EventRepository>,
    guard: CapacityGuard<dyn EventCapacityStore>,
    ledger: Arc<dyn PaymentLedger>,
    provider: Arc<dyn PaymentProvider>,
    retry: ProviderRetry,
    currency: String,
    clock: Arc<dyn Clock>,
}

impl PaymentIntentService {
    pub fn new(
        ports: PaymentIntentPorts,
        retry: ProviderRetry,
        currency: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events: ports.events,
            guard: CapacityGuard::new(ports.capacity),
            ledger: ports.ledger,
            provider: ports.provider,
            retry,
            currency: currency.into(),
            clock,
        }
    }
}

#[async_trait]
impl PaymentIntentCommand for PaymentIntentService {
    async fn create_intent(
        &self,
        caller: &Identity,
        event_id: &EventId,
    ) -> Result<PaymentIntentHandle, Error> {
        let payer = caller.user_id();
        let event = self
            .events
            .find(event_id)
            .await
            .map_err(map_event_repository_error)?
            .ok_or(Rejection::EventNotFound(*event_id))?;
        if !event.requires_payment() {
            return Err(Rejection::NotPaid.into());
        }
        if !event.is_joinable() {
            return Err(Rejection::EventNotJoinable.into());
        }
        if event.is_participant(&payer) {
            return Err(Rejection::AlreadyEnrolled.into());
        }
        let has_seat = self
            .guard
            .has_seat(event_id)
            .await
            .map_err(map_capacity_store_error)?;
        if !has_seat {
            return Err(Rejection::EventFull.into());
        }

        let amount = Money::new(event.price().minor_units(), &self.currency)
            .map_err(|err| Error::internal(format!("invalid event price: {err}")))?;
        let request = CreateIntentRequest {
            amount: amount.clone(),
            metadata: IntentMetadata {
                event_id: *event_id,
                payer_id: payer,
                event_title: event.title().to_owned(),
            },
            idempotency_key: format!("enroll-{event_id}-{payer}-{}", Uuid::new_v4()),
        };
        let intent = self
            .retry
            .run("create_intent", || self.provider.create_intent(&request))
            .await
            .map_err(|err| map_provider_error(&err))?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| Error::internal("payment provider returned no client secret"))?;

        let obligation = PaymentObligation::open(
            NewObligation {
                provider_transaction_id: intent.id.clone(),
                payer_id: payer,
                event_id: *event_id,
                amount: amount.clone(),
            },
            self.clock.utc(),
        );
        self.ledger
            .open(&obligation)
            .await
            .map_err(map_ledger_error)?;
        info!(
            provider_transaction_id = %intent.id,
            event_id = %event_id,
            payer_id = %payer,
            amount = amount.minor_units(),
            "payment obligation opened"
        );

        Ok(PaymentIntentHandle {
            provider_transaction_id: intent.id,
            client_secret,
            amount,
        })
    }
}

#[cfg(test)]
#[path = "payment_intent_service_tests.rs"]
mod tests;
