//! Server settings loaded via OrthoConfig, and the runtime server config.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use actix_web::cookie::{Key, SameSite};
use ortho_config::OrthoConfig;
use serde::Deserialize;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

use gatherings::domain::SweepConfig;
use gatherings::domain::ports::ProviderRetryPolicy;

const DEFAULT_BIND_PORT: u16 = 8080;
const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.stripe.com";
const DEFAULT_CURRENCY: &str = "usd";
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PROVIDER_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_SWEEP_PENDING_AFTER_SECS: u64 = 900;
const DEFAULT_SWEEP_BATCH_SIZE: usize = 50;

/// Settings for the gatherings server.
///
/// Loaded from CLI flags, `GATHERINGS_*` environment variables, and an
/// optional configuration file. Absent values fall back to the defaults
/// returned by the accessor methods.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GATHERINGS")]
pub struct GatheringsSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<SocketAddr>,
    /// PostgreSQL URL; in-memory adapters are used when absent.
    pub database_url: Option<String>,
    /// Session signing key file.
    pub session_key_file: Option<PathBuf>,
    /// Mark session cookies `Secure`.
    #[ortho_config(default = true)]
    pub cookie_secure: bool,
    /// Payment provider API root.
    pub provider_base_url: Option<String>,
    /// Provider secret key; the fake provider is used when absent.
    pub provider_secret_key: Option<String>,
    /// Webhook signing secret; every webhook is rejected when absent.
    pub webhook_secret: Option<String>,
    pub webhook_tolerance_secs: Option<u64>,
    /// ISO currency for paid events.
    pub currency: Option<String>,
    pub provider_timeout_secs: Option<u64>,
    pub provider_max_attempts: Option<u32>,
    pub sweep_interval_secs: Option<u64>,
    pub sweep_pending_after_secs: Option<u64>,
    pub sweep_batch_size: Option<usize>,
}

impl GatheringsSettings {
    /// Address to bind, falling back to all interfaces on port 8080.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
            .unwrap_or(SocketAddr::from(([0, 0, 0, 0], DEFAULT_BIND_PORT)))
    }

    pub fn provider_base_url(&self) -> &str {
        self.provider_base_url
            .as_deref()
            .unwrap_or(DEFAULT_PROVIDER_BASE_URL)
    }

    pub fn currency(&self) -> &str {
        self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    pub fn webhook_tolerance(&self) -> Duration {
        Duration::from_secs(
            self.webhook_tolerance_secs
                .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE_SECS),
        )
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(
            self.provider_timeout_secs
                .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
        )
    }

    /// Retry policy for provider calls; at least one attempt is always made.
    pub fn provider_retry_policy(&self) -> ProviderRetryPolicy {
        ProviderRetryPolicy {
            max_attempts: self
                .provider_max_attempts
                .unwrap_or(DEFAULT_PROVIDER_MAX_ATTEMPTS)
                .max(1),
            ..ProviderRetryPolicy::default()
        }
    }

    /// Period of the background sweep and event completion tick.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(
            self.sweep_interval_secs
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS)
                .max(1),
        )
    }

    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            pending_after: Duration::from_secs(
                self.sweep_pending_after_secs
                    .unwrap_or(DEFAULT_SWEEP_PENDING_AFTER_SECS),
            ),
            batch_size: self.sweep_batch_size.unwrap_or(DEFAULT_SWEEP_BATCH_SIZE),
        }
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware to the configuration.
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }

    #[cfg(feature = "metrics")]
    /// Return the configured Prometheus middleware, if any.
    #[must_use]
    pub fn metrics(&self) -> Option<&PrometheusMetrics> {
        self.prometheus.as_ref()
    }
}
