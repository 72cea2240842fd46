//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    EnrollmentCommand, EventCommand, EventQuery, LoginService, PaymentIntentCommand,
    PaymentQuery, SettlementCommand,
};

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub login: Arc<dyn LoginService>,
    pub events: Arc<dyn EventCommand>,
    pub events_query: Arc<dyn EventQuery>,
    pub enrollment: Arc<dyn EnrollmentCommand>,
    pub payment_intents: Arc<dyn PaymentIntentCommand>,
    pub settlement: Arc<dyn SettlementCommand>,
    pub payments_query: Arc<dyn PaymentQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub login: Arc<dyn LoginService>,
    pub events: Arc<dyn EventCommand>,
    pub events_query: Arc<dyn EventQuery>,
    pub enrollment: Arc<dyn EnrollmentCommand>,
    pub payment_intents: Arc<dyn PaymentIntentCommand>,
    pub settlement: Arc<dyn SettlementCommand>,
    pub payments_query: Arc<dyn PaymentQuery>,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}

impl HttpState {
    /// Construct state from a ports bundle.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// use gatherings::domain::ports::{
    ///     FixtureLoginService, NoOpSettlementMetrics, ProviderRetryPolicy,
    /// };
    /// use gatherings::domain::{
    ///     EnrollmentService, EventService, PaymentIntentPorts, PaymentIntentService,
    ///     PaymentQueryPorts, PaymentQueryService, ProviderRetry, SettlementPorts,
    ///     SettlementService, WebhookVerifier,
    /// };
    /// use gatherings::inbound::http::state::{HttpState, HttpStatePorts};
    /// use gatherings::outbound::memory::{
    ///     InMemoryEventStore, InMemoryPaymentLedger, InMemorySettlementConflictRepository,
    /// };
    /// use gatherings::outbound::provider::FakePaymentProvider;
    /// use mockable::DefaultClock;
    ///
    /// let clock = Arc::new(DefaultClock);
    /// let store = Arc::new(InMemoryEventStore::new());
    /// let ledger = Arc::new(InMemoryPaymentLedger::new());
    /// let conflicts = Arc::new(InMemorySettlementConflictRepository::new());
    /// let provider = Arc::new(FakePaymentProvider::new());
    /// let retry = ProviderRetry::with_policy(ProviderRetryPolicy::default());
    /// let events = Arc::new(EventService::new(store.clone(), clock.clone()));
    /// let tolerance = Duration::from_secs(300);
    /// let verifier = WebhookVerifier::new(Some("whsec_test"), tolerance, clock.clone());
    ///
    /// let state = HttpState::new(HttpStatePorts {
    ///     login: Arc::new(FixtureLoginService),
    ///     events: events.clone(),
    ///     events_query: events,
    ///     enrollment: Arc::new(EnrollmentService::new(store.clone(), store.clone())),
    ///     payment_intents: Arc::new(PaymentIntentService::new(
    ///         PaymentIntentPorts {
    ///             events: store.clone(),
    ///             capacity: store.clone(),
    ///             ledger: ledger.clone(),
    ///             provider: provider.clone(),
    ///         },
    ///         retry.clone(),
    ///         "usd",
    ///         clock.clone(),
    ///     )),
    ///     settlement: Arc::new(SettlementService::new(
    ///         SettlementPorts {
    ///             ledger: ledger.clone(),
    ///             capacity: store.clone(),
    ///             conflicts: conflicts.clone(),
    ///             provider,
    ///             metrics: Arc::new(NoOpSettlementMetrics),
    ///         },
    ///         verifier,
    ///         retry,
    ///         clock,
    ///     )),
    ///     payments_query: Arc::new(PaymentQueryService::new(PaymentQueryPorts {
    ///         events: store,
    ///         ledger,
    ///         conflicts,
    ///     })),
    /// });
    /// let _login = state.login.clone();
    /// ```
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            login,
            events,
            events_query,
            enrollment,
            payment_intents,
            settlement,
            payments_query,
        } = ports;
        Self {
            login,
            events,
            events_query,
            enrollment,
            payment_intents,
            settlement,
            payments_query,
        }
    }
}
