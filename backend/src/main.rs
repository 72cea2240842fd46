//! Gatherings server entry point.
//!
//! Loads settings, prepares the session key and adapters, applies database
//! migrations when PostgreSQL is configured, then runs the HTTP server next
//! to the background settlement sweep.

mod server;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use gatherings::inbound::http::health::HealthState;
use gatherings::inbound::http::session_config::{BuildMode, session_settings};
use gatherings::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use server::{
    GatheringsSettings, Maintenance, ServerConfig, Stores, build_provider, build_services,
    build_settlement_metrics, create_server,
};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = fmt().with_env_filter(filter).json().try_init() {
        warn!(error = %e, "tracing init failed");
    }

    let settings = GatheringsSettings::load_from_iter(std::env::args_os())
        .map_err(|e| std::io::Error::other(format!("failed to load settings: {e}")))?;
    let session = session_settings(
        settings.session_key_file.as_deref(),
        settings.cookie_secure,
        BuildMode::from_debug_assertions(),
    )
    .map_err(std::io::Error::other)?;

    let pool = match settings.database_url.as_deref() {
        Some(url) => Some(connect_database(url).await?),
        None => None,
    };

    let config = ServerConfig::new(
        session.key,
        session.cookie_secure,
        session.same_site,
        settings.bind_addr(),
    );
    #[cfg(feature = "metrics")]
    let config = config.with_metrics(Some(server::request_metrics()?));
    #[cfg(feature = "metrics")]
    let metrics = build_settlement_metrics(config.metrics())?;
    #[cfg(not(feature = "metrics"))]
    let metrics = build_settlement_metrics();

    let services = build_services(
        &settings,
        Stores::from_pool(pool.as_ref()),
        build_provider(&settings)?,
        metrics,
    );
    let maintenance = Maintenance {
        sweep: services.sweep,
        events: services.events,
        clock: services.clock,
    }
    .spawn(settings.sweep_interval());

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), services.http_state, config)?;
    info!(bind_addr = %settings.bind_addr(), "server listening");
    let result = server.await;
    health_state.mark_unhealthy();
    maintenance.abort();
    result
}

async fn connect_database(url: &str) -> std::io::Result<DbPool> {
    let migration_url = url.to_owned();
    let applied = tokio::task::spawn_blocking(move || run_pending_migrations(&migration_url))
        .await
        .map_err(|e| std::io::Error::other(format!("migration task failed: {e}")))?
        .map_err(|e| std::io::Error::other(format!("migrations failed: {e}")))?;
    info!(applied, "database migrations applied");
    DbPool::new(PoolConfig::new(url))
        .await
        .map_err(|e| std::io::Error::other(format!("database pool failed: {e}")))
}

