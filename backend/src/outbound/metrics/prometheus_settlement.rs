//! Prometheus adapter for settlement outcome metrics.
//!
//! Metrics are registered with the registry that backs the `/metrics`
//! endpoint, so duplicate deliveries and capacity conflicts are visible
//! next to the HTTP request metrics.

use async_trait::async_trait;
use prometheus::{CounterVec, Opts, Registry};

use crate::domain::ports::{SettlementMetrics, SettlementMetricsError};
use crate::domain::{SettlementReport, SignalSource};

/// Prometheus-backed settlement metrics recorder.
///
/// # Metrics
///
/// - **Name**: `gatherings_settlements_total`
/// - **Type**: Counter
/// - **Labels**:
///   - `source`: `webhook`, `confirmation`, or `sweep`
///   - `outcome`: `enrolled`, `already_settled`, `failed`, `processing`, or
///     `conflict`
pub struct PrometheusSettlementMetrics {
    settlements_total: CounterVec,
}

impl PrometheusSettlementMetrics {
    /// Create and register metrics with the given registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric with the same name is already registered.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let settlements_total = CounterVec::new(
            Opts::new(
                "gatherings_settlements_total",
                "Settlement decisions by signal source and outcome",
            ),
            &["source", "outcome"],
        )?;
        registry.register(Box::new(settlements_total.clone()))?;
        Ok(Self { settlements_total })
    }
}

#[async_trait]
impl SettlementMetrics for PrometheusSettlementMetrics {
    async fn record(
        &self,
        source: SignalSource,
        report: SettlementReport,
    ) -> Result<(), SettlementMetricsError> {
        self.settlements_total
            .with_label_values(&[source.as_str(), report.as_str()])
            .inc();
        Ok(())
    }
}
