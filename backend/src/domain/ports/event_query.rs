//! Driving port for event reads.

use async_trait::async_trait;

use crate::domain::{Error, Event, EventId};

/// Read one event.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventQuery: Send + Sync {
    /// Fetch an event or fail with `not_found`.
    async fn get(&self, event_id: &EventId) -> Result<Event, Error>;
}
