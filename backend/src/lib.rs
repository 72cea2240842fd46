//! Event enrollment and payment settlement service.
//!
//! Hexagonal layout: [`domain`] owns the occupancy and settlement rules and
//! the ports they run against, [`inbound`] adapts HTTP onto the driving
//! ports, and [`outbound`] implements the driven ports over PostgreSQL, the
//! payment provider, and Prometheus.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
