//! Domain port surface for recording settlement outcomes.
//!
//! Lets operators watch duplicate deliveries, failures, and conflicts without
//! coupling the reconciler to a metrics backend.

use async_trait::async_trait;

use crate::domain::{SettlementReport, SignalSource};

use super::define_port_error;

define_port_error! {
    /// Errors exposed when recording settlement metrics.
    pub enum SettlementMetricsError {
        /// Metric exporter rejected the write.
        Export { message: String } => "settlement metrics exporter failed: {message}",
    }
}

/// Metrics recording port for settlement decisions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettlementMetrics: Send + Sync {
    /// Record one settlement decision from `source`.
    async fn record(
        &self,
        source: SignalSource,
        report: SettlementReport,
    ) -> Result<(), SettlementMetricsError>;
}

/// No-op implementation for when metrics are disabled or in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSettlementMetrics;

#[async_trait]
impl SettlementMetrics for NoOpSettlementMetrics {
    async fn record(
        &self,
        _source: SignalSource,
        _report: SettlementReport,
    ) -> Result<(), SettlementMetricsError> {
        Ok(())
    }
}
