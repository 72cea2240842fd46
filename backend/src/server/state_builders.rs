//! Builders wiring adapters and services into the HTTP state.
//!
//! A database URL selects the Diesel adapters; without one every store is
//! in-memory. A provider secret key selects the HTTP provider; without one
//! the deterministic fake is used.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};
use reqwest::Url;
use tracing::warn;

use gatherings::domain::ports::{
    EventCapacityStore, EventRepository, FixtureLoginService, NoOpSettlementMetrics, PaymentLedger,
    PaymentProvider, SettlementConflictRepository, SettlementMetrics,
};
use gatherings::domain::{
    EnrollmentService, EventService, PaymentIntentPorts, PaymentIntentService, PaymentQueryPorts,
    PaymentQueryService, ProviderRetry, SettlementPorts, SettlementService, SettlementSweep,
    WebhookVerifier,
};
use gatherings::inbound::http::state::{HttpState, HttpStatePorts};
use gatherings::outbound::memory::{
    InMemoryEventStore, InMemoryPaymentLedger, InMemorySettlementConflictRepository,
};
use gatherings::outbound::persistence::{
    DbPool, DieselEventStore, DieselPaymentLedger, DieselSettlementConflictRepository,
};
use gatherings::outbound::provider::{FakePaymentProvider, StripeHttpProvider};

use super::GatheringsSettings;

/// Driven adapters shared by every service.
#[derive(Clone)]
pub(crate) struct Stores {
    pub(crate) events: Arc<dyn EventRepository>,
    pub(crate) capacity: Arc<dyn EventCapacityStore>,
    pub(crate) ledger: Arc<dyn PaymentLedger>,
    pub(crate) conflicts: Arc<dyn SettlementConflictRepository>,
}

impl Stores {
    pub(crate) fn from_pool(pool: Option<&DbPool>) -> Self {
        match pool {
            Some(pool) => {
                let events = Arc::new(DieselEventStore::new(pool.clone()));
                Self {
                    events: events.clone(),
                    capacity: events,
                    ledger: Arc::new(DieselPaymentLedger::new(pool.clone())),
                    conflicts: Arc::new(DieselSettlementConflictRepository::new(pool.clone())),
                }
            }
            None => {
                warn!("no database configured; state is kept in memory and lost on restart");
                let events = Arc::new(InMemoryEventStore::new());
                Self {
                    events: events.clone(),
                    capacity: events,
                    ledger: Arc::new(InMemoryPaymentLedger::new()),
                    conflicts: Arc::new(InMemorySettlementConflictRepository::new()),
                }
            }
        }
    }
}

/// Select the payment provider adapter.
///
/// # Errors
///
/// Returns [`std::io::Error`] when the base URL is invalid or the HTTP
/// client cannot be built.
pub(crate) fn build_provider(
    settings: &GatheringsSettings,
) -> std::io::Result<Arc<dyn PaymentProvider>> {
    match settings.provider_secret_key.as_deref() {
        Some(secret_key) => {
            let base_url = Url::parse(settings.provider_base_url()).map_err(|err| {
                std::io::Error::other(format!("invalid provider_base_url: {err}"))
            })?;
            let provider =
                StripeHttpProvider::new(base_url, secret_key, settings.provider_timeout())
                    .map_err(|err| {
                        std::io::Error::other(format!("provider client build failed: {err}"))
                    })?;
            Ok(Arc::new(provider))
        }
        None => {
            warn!("provider_secret_key not set; using the fake payment provider");
            Ok(Arc::new(FakePaymentProvider::new()))
        }
    }
}

/// Services built once at startup.
pub(crate) struct AppServices {
    pub(crate) http_state: web::Data<HttpState>,
    pub(crate) events: Arc<EventService<dyn EventRepository>>,
    pub(crate) sweep: Arc<SettlementSweep>,
    pub(crate) clock: Arc<dyn Clock>,
}

/// Build every service over `stores`, `provider` and `metrics`.
pub(crate) fn build_services(
    settings: &GatheringsSettings,
    stores: Stores,
    provider: Arc<dyn PaymentProvider>,
    metrics: Arc<dyn SettlementMetrics>,
) -> AppServices {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let retry = ProviderRetry::with_policy(settings.provider_retry_policy());
    if settings.webhook_secret.is_none() {
        warn!("webhook_secret not set; every provider webhook will be rejected");
    }
    let verifier = WebhookVerifier::new(
        settings.webhook_secret.as_deref(),
        settings.webhook_tolerance(),
        clock.clone(),
    );

    let events = Arc::new(EventService::new(stores.events.clone(), clock.clone()));
    let settlement = Arc::new(SettlementService::new(
        SettlementPorts {
            ledger: stores.ledger.clone(),
            capacity: stores.capacity.clone(),
            conflicts: stores.conflicts.clone(),
            provider: provider.clone(),
            metrics,
        },
        verifier,
        retry.clone(),
        clock.clone(),
    ));
    let sweep = Arc::new(SettlementSweep::new(
        stores.ledger.clone(),
        settlement.clone(),
        settings.sweep_config(),
    ));

    let http_state = HttpState::new(HttpStatePorts {
        login: Arc::new(FixtureLoginService),
        events: events.clone(),
        events_query: events.clone(),
        enrollment: Arc::new(EnrollmentService::new(
            stores.capacity.clone(),
            stores.events.clone(),
        )),
        payment_intents: Arc::new(PaymentIntentService::new(
            PaymentIntentPorts {
                events: stores.events.clone(),
                capacity: stores.capacity.clone(),
                ledger: stores.ledger.clone(),
                provider,
            },
            retry,
            settings.currency(),
            clock.clone(),
        )),
        settlement,
        payments_query: Arc::new(PaymentQueryService::new(PaymentQueryPorts {
            events: stores.events,
            ledger: stores.ledger,
            conflicts: stores.conflicts,
        })),
    });

    AppServices {
        http_state: web::Data::new(http_state),
        events,
        sweep,
        clock,
    }
}

/// Settlement metrics backed by the Prometheus registry when available.
///
/// # Errors
///
/// Returns [`std::io::Error`] if metric registration fails.
#[cfg(feature = "metrics")]
pub(crate) fn build_settlement_metrics(
    prometheus: Option<&actix_web_prom::PrometheusMetrics>,
) -> std::io::Result<Arc<dyn SettlementMetrics>> {
    use gatherings::outbound::metrics::PrometheusSettlementMetrics;

    match prometheus {
        Some(prom) => {
            let metrics = PrometheusSettlementMetrics::new(&prom.registry).map_err(|err| {
                std::io::Error::other(format!("settlement metrics registration failed: {err}"))
            })?;
            Ok(Arc::new(metrics))
        }
        None => Ok(Arc::new(NoOpSettlementMetrics)),
    }
}

/// Settlement metrics are a no-op without the `metrics` feature.
#[cfg(not(feature = "metrics"))]
pub(crate) fn build_settlement_metrics() -> Arc<dyn SettlementMetrics> {
    Arc::new(NoOpSettlementMetrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use gatherings::domain::ports::{EventCommand, EventQuery};
    use gatherings::domain::{EventDraft, Identity, Role, UserId};
    use ortho_config::OrthoConfig;
    use rstest::rstest;

    fn memory_settings() -> GatheringsSettings {
        let _guard = lock_env([
            ("GATHERINGS_DATABASE_URL", None::<String>),
            ("GATHERINGS_PROVIDER_SECRET_KEY", None::<String>),
            ("GATHERINGS_WEBHOOK_SECRET", None::<String>),
        ]);
        GatheringsSettings::load_from_iter([OsString::from("gatherings")])
            .expect("config should load")
    }

    #[rstest]
    fn missing_secret_key_selects_fake_provider() {
        assert!(build_provider(&memory_settings()).is_ok());
    }

    #[rstest]
    fn invalid_provider_url_is_an_error() {
        let mut settings = memory_settings();
        settings.provider_secret_key = Some("sk_test".to_owned());
        settings.provider_base_url = Some("not a url".to_owned());
        assert!(build_provider(&settings).is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn memory_services_share_one_store() {
        let settings = memory_settings();
        let provider = build_provider(&settings).expect("fake provider");
        let services = build_services(
            &settings,
            Stores::from_pool(None),
            provider,
            Arc::new(NoOpSettlementMetrics),
        );
        let host = Identity::new(UserId::random(), Role::Host);
        let draft = EventDraft {
            title: "Pottery evening".to_owned(),
            description: "Wheel throwing for beginners.".to_owned(),
            category: "Workshops".to_owned(),
            location: "Studio 4".to_owned(),
            starts_at: services.clock.utc() + chrono::Duration::days(3),
            max_participants: 8,
            price: 0,
        };

        let created = services.events.create(&host, draft).await.expect("created");
        let fetched = services.http_state.events_query.get(&created.id()).await;
        assert_eq!(fetched.expect("visible through http state").id(), created.id());
    }
}
