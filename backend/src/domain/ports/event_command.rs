//! Driving port for organiser-side event mutations.

use async_trait::async_trait;

use crate::domain::{Error, Event, EventDraft, EventId, Identity};

/// Create, cancel, and delete events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventCommand: Send + Sync {
    /// Publish a new event hosted by `caller`.
    async fn create(&self, caller: &Identity, draft: EventDraft) -> Result<Event, Error>;

    /// Cancel an upcoming or ongoing event.
    async fn cancel(&self, caller: &Identity, event_id: &EventId) -> Result<Event, Error>;

    /// Delete an event that has no participants.
    async fn delete(&self, caller: &Identity, event_id: &EventId) -> Result<(), Error>;
}
