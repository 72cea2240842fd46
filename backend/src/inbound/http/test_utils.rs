//! Test helpers for inbound HTTP components.

use std::sync::Arc;
use std::time::Duration;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{App, test as actix_test, web};

use crate::domain::ports::{FixtureLoginService, NoOpSettlementMetrics, ProviderRetryPolicy};
use crate::domain::{
    EnrollmentService, Event, EventService, PaymentIntentPorts, PaymentIntentService,
    PaymentQueryPorts, PaymentQueryService, ProviderRetry, SettlementPorts, SettlementService,
    WebhookVerifier,
};
use crate::inbound::http::auth::LoginRequest;
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::outbound::memory::{
    InMemoryEventStore, InMemoryPaymentLedger, InMemorySettlementConflictRepository,
};
use crate::outbound::provider::FakePaymentProvider;
use crate::test_support::base_time;
use crate::test_support::clock::MutableClock;
use crate::test_support::retry::{ImmediateSleeper, NoJitter};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Real services over the in-memory adapters and the fake provider.
///
/// The clock starts at [`base_time`], so events from
/// [`crate::test_support::EventBuilder`] are a week in the future.
pub struct MemoryHarness {
    pub store: Arc<InMemoryEventStore>,
    pub ledger: Arc<InMemoryPaymentLedger>,
    pub conflicts: Arc<InMemorySettlementConflictRepository>,
    pub provider: Arc<FakePaymentProvider>,
    pub clock: Arc<MutableClock>,
}

impl MemoryHarness {
    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            store: Arc::new(InMemoryEventStore::with_events(events)),
            ledger: Arc::new(InMemoryPaymentLedger::new()),
            conflicts: Arc::new(InMemorySettlementConflictRepository::new()),
            provider: Arc::new(FakePaymentProvider::new()),
            clock: Arc::new(MutableClock::new(base_time())),
        }
    }

    pub fn state(&self) -> HttpState {
        let retry = ProviderRetry::new(
            ProviderRetryPolicy::default(),
            Arc::new(ImmediateSleeper),
            Arc::new(NoJitter),
        );
        let events = Arc::new(EventService::new(self.store.clone(), self.clock.clone()));
        let verifier = WebhookVerifier::new(
            Some(TEST_WEBHOOK_SECRET),
            Duration::from_secs(300),
            self.clock.clone(),
        );
        HttpState::new(HttpStatePorts {
            login: Arc::new(FixtureLoginService),
            events: events.clone(),
            events_query: events,
            enrollment: Arc::new(EnrollmentService::new(self.store.clone(), self.store.clone())),
            payment_intents: Arc::new(PaymentIntentService::new(
                PaymentIntentPorts {
                    events: self.store.clone(),
                    capacity: self.store.clone(),
                    ledger: self.ledger.clone(),
                    provider: self.provider.clone(),
                },
                retry.clone(),
                "usd",
                self.clock.clone(),
            )),
            settlement: Arc::new(SettlementService::new(
                SettlementPorts {
                    ledger: self.ledger.clone(),
                    capacity: self.store.clone(),
                    conflicts: self.conflicts.clone(),
                    provider: self.provider.clone(),
                    metrics: Arc::new(NoOpSettlementMetrics),
                },
                verifier,
                retry,
                self.clock.clone(),
            )),
            payments_query: Arc::new(PaymentQueryService::new(PaymentQueryPorts {
                events: self.store.clone(),
                ledger: self.ledger.clone(),
                conflicts: self.conflicts.clone(),
            })),
        })
    }
}

/// App with every `/api/v1` handler mounted over `state`.
pub fn api_app(
    state: HttpState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(test_session_middleware())
        .service(
            web::scope("/api/v1")
                .service(crate::inbound::http::auth::login)
                .service(crate::inbound::http::events::create_event)
                .service(crate::inbound::http::events::get_event)
                .service(crate::inbound::http::events::join_event)
                .service(crate::inbound::http::events::leave_event)
                .service(crate::inbound::http::events::cancel_event)
                .service(crate::inbound::http::events::delete_event)
                .service(crate::inbound::http::payments::create_payment_intent)
                .service(crate::inbound::http::payments::payment_webhook)
                .service(crate::inbound::http::payments::confirm_payment)
                .service(crate::inbound::http::payments::user_payments)
                .service(crate::inbound::http::payments::host_revenue)
                .service(crate::inbound::http::admin::settlement_conflicts),
        )
}

/// Log in as one of the fixture accounts and return the session cookie.
pub async fn login_cookie(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    username: &str,
) -> Cookie<'static> {
    let request = actix_test::TestRequest::post()
        .uri("/api/v1/login")
        .set_json(&LoginRequest {
            username: username.into(),
            password: "password".into(),
        })
        .to_request();
    let response = actix_test::call_service(app, request).await;
    assert!(response.status().is_success(), "login as {username} failed");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}
