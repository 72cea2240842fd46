//! Prometheus HTTP metrics.
//!
//! The registry built here is shared with the settlement counters, and
//! `/metrics` is served by the middleware itself. Health probes are excluded
//! so orchestrator polling does not drown the request histograms.

use actix_service::{
    Service, ServiceExt as _, Transform,
    boxed::{self, BoxService},
};
use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Compat;
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use futures_util::future::LocalBoxFuture;

const NAMESPACE: &str = "gatherings";
const ENDPOINT: &str = "/metrics";
const UNMEASURED_PATHS: [&str; 2] = ["/health/ready", "/health/live"];

/// Build the request metrics middleware and its registry.
pub(crate) fn request_metrics() -> std::io::Result<PrometheusMetrics> {
    UNMEASURED_PATHS
        .iter()
        .fold(
            PrometheusMetricsBuilder::new(NAMESPACE).endpoint(ENDPOINT),
            |builder, path| builder.exclude(*path),
        )
        .build()
        .map_err(|err| std::io::Error::other(format!("configure Prometheus metrics: {err}")))
}

/// Wraps the app in [`PrometheusMetrics`] when configured.
///
/// Both arms box the inner service so the app type does not depend on
/// whether metrics are on.
#[derive(Clone)]
pub(crate) struct MetricsLayer(Option<PrometheusMetrics>);

impl MetricsLayer {
    pub(crate) fn new(metrics: Option<PrometheusMetrics>) -> Self {
        Self(metrics)
    }
}

type BoxedApp = BoxService<ServiceRequest, ServiceResponse<BoxBody>, actix_web::Error>;

impl<S, B> Transform<S, ServiceRequest> for MetricsLayer
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = BoxedApp;
    type Future = LocalBoxFuture<'static, Result<BoxedApp, ()>>;

    fn new_transform(&self, service: S) -> Self::Future {
        let Some(metrics) = self.0.clone() else {
            let passthrough = service.map(ServiceResponse::map_into_boxed_body);
            return Box::pin(async move { Ok(boxed::service(passthrough)) });
        };
        let measured = Compat::new(metrics).new_transform(service);
        Box::pin(async move { Ok(boxed::service(measured.await?)) })
    }
}
