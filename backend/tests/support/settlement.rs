//! In-memory enrollment and settlement wiring for behaviour suites.

use std::sync::Arc;
use std::time::Duration;

use gatherings::domain::ports::{
    EventRepository, NoOpSettlementMetrics, ProviderRetryPolicy, SettlementConflictRepository,
};
use gatherings::domain::{
    EnrollmentService, Event, EventId, PaymentIntentPorts, PaymentIntentService, ProviderRetry,
    SettlementConflict, SettlementPorts, SettlementService, SettlementSweep, SweepConfig,
    WebhookVerifier,
};
use gatherings::outbound::memory::{
    InMemoryEventStore, InMemoryPaymentLedger, InMemorySettlementConflictRepository,
};
use gatherings::outbound::provider::FakePaymentProvider;
use gatherings::test_support::base_time;
use gatherings::test_support::clock::MutableClock;
use gatherings::test_support::webhooks::{payment_intent_payload, signature_header};
use mockable::Clock;

pub const WEBHOOK_SECRET: &str = "whsec_behaviour";

/// Every service over shared in-memory adapters and a controllable clock
/// starting at [`base_time`].
pub struct SettlementHarness {
    pub clock: Arc<MutableClock>,
    pub store: Arc<InMemoryEventStore>,
    pub ledger: Arc<InMemoryPaymentLedger>,
    pub conflicts: Arc<InMemorySettlementConflictRepository>,
    pub provider: Arc<FakePaymentProvider>,
    pub enrollment: Arc<EnrollmentService<InMemoryEventStore, InMemoryEventStore>>,
    pub intents: Arc<PaymentIntentService>,
    pub settlement: Arc<SettlementService>,
    pub sweep: SettlementSweep,
}

impl SettlementHarness {
    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        let clock = Arc::new(MutableClock::new(base_time()));
        let store = Arc::new(InMemoryEventStore::with_events(events));
        let ledger = Arc::new(InMemoryPaymentLedger::new());
        let conflicts = Arc::new(InMemorySettlementConflictRepository::new());
        let provider = Arc::new(FakePaymentProvider::new());
        let retry = ProviderRetry::with_policy(ProviderRetryPolicy::default());

        let intents = Arc::new(PaymentIntentService::new(
            PaymentIntentPorts {
                events: store.clone(),
                capacity: store.clone(),
                ledger: ledger.clone(),
                provider: provider.clone(),
            },
            retry.clone(),
            "usd",
            clock.clone(),
        ));
        let settlement = Arc::new(SettlementService::new(
            SettlementPorts {
                ledger: ledger.clone(),
                capacity: store.clone(),
                conflicts: conflicts.clone(),
                provider: provider.clone(),
                metrics: Arc::new(NoOpSettlementMetrics),
            },
            WebhookVerifier::new(Some(WEBHOOK_SECRET), Duration::from_secs(300), clock.clone()),
            retry,
            clock.clone(),
        ));
        let sweep =
            SettlementSweep::new(ledger.clone(), settlement.clone(), SweepConfig::default());

        Self {
            enrollment: Arc::new(EnrollmentService::new(store.clone(), store.clone())),
            clock,
            store,
            ledger,
            conflicts,
            provider,
            intents,
            settlement,
            sweep,
        }
    }

    /// A provider notification signed at the harness clock's current time.
    pub fn signed_notification(&self, event_type: &str, intent_id: &str) -> (Vec<u8>, String) {
        let payload = payment_intent_payload(event_type, intent_id);
        let header = signature_header(WEBHOOK_SECRET, self.now_timestamp(), &payload);
        (payload, header)
    }

    pub fn now_timestamp(&self) -> i64 {
        self.clock.utc().timestamp()
    }

    pub async fn event(&self, event_id: &EventId) -> Event {
        self.store
            .find(event_id)
            .await
            .expect("event store read")
            .expect("event present")
    }

    pub async fn conflicts(&self) -> Vec<SettlementConflict> {
        self.conflicts.list().await.expect("conflict listing")
    }
}
