//! Event lifecycle services.
//!
//! Organisers create, cancel, and delete events; a background task marks
//! elapsed events completed. Occupancy is never written here.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{
    CancelOutcome, DeleteOutcome, EventCommand, EventQuery, EventRepository,
};
use crate::domain::rejection::map_event_repository_error;
use crate::domain::{Error, Event, EventDraft, EventId, Identity, Rejection, Role};

/// Event service implementing [`EventCommand`] and [`EventQuery`].
pub struct EventService<R: ?Sized> {
    events: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R: ?Sized> Clone for EventService<R> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R> EventService<R>
where
    R: EventRepository + ?Sized,
{
    /// Create a service over the event repository.
    pub fn new(events: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { events, clock }
    }

    /// Mark events whose start day has passed as completed.
    pub async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let completed = self
            .events
            .complete_elapsed(now)
            .await
            .map_err(map_event_repository_error)?;
        if completed > 0 {
            info!(completed, "elapsed events completed");
        }
        Ok(completed)
    }

    async fn load(&self, event_id: &EventId) -> Result<Event, Error> {
        self.events
            .find(event_id)
            .await
            .map_err(map_event_repository_error)?
            .ok_or_else(|| Rejection::EventNotFound(*event_id).into())
    }

    async fn load_managed(&self, caller: &Identity, event_id: &EventId) -> Result<Event, Error> {
        let event = self.load(event_id).await?;
        if !caller.acts_for(&event.host_id()) {
            return Err(Error::forbidden("only the host may manage this event"));
        }
        Ok(event)
    }
}

#[async_trait]
impl<R> EventCommand for EventService<R>
where
    R: EventRepository + ?Sized,
{
    async fn create(&self, caller: &Identity, draft: EventDraft) -> Result<Event, Error> {
        if !matches!(caller.role(), Role::Host | Role::Admin) {
            return Err(Error::forbidden("only hosts may create events"));
        }
        let event = Event::create(draft, caller.user_id(), self.clock.utc()).map_err(|err| {
            Error::invalid_request(err.to_string()).with_details(json!({ "code": "invalid_event" }))
        })?;
        self.events
            .insert(&event)
            .await
            .map_err(map_event_repository_error)?;
        info!(event_id = %event.id(), host_id = %event.host_id(), "event created");
        Ok(event)
    }

    async fn cancel(&self, caller: &Identity, event_id: &EventId) -> Result<Event, Error> {
        self.load_managed(caller, event_id).await?;
        match self
            .events
            .cancel(event_id)
            .await
            .map_err(map_event_repository_error)?
        {
            CancelOutcome::Cancelled(event) => {
                info!(%event_id, "event cancelled");
                Ok(event)
            }
            CancelOutcome::NotCancellable(_) => Err(Rejection::EventNotCancellable.into()),
            CancelOutcome::NotFound => Err(Rejection::EventNotFound(*event_id).into()),
        }
    }

    async fn delete(&self, caller: &Identity, event_id: &EventId) -> Result<(), Error> {
        self.load_managed(caller, event_id).await?;
        match self
            .events
            .delete_if_empty(event_id)
            .await
            .map_err(map_event_repository_error)?
        {
            DeleteOutcome::Deleted => {
                info!(%event_id, "event deleted");
                Ok(())
            }
            DeleteOutcome::HasParticipants => Err(Rejection::EventHasParticipants.into()),
            DeleteOutcome::NotFound => Err(Rejection::EventNotFound(*event_id).into()),
        }
    }
}

#[async_trait]
impl<R> EventQuery for EventService<R>
where
    R: EventRepository + ?Sized,
{
    async fn get(&self, event_id: &EventId) -> Result<Event, Error> {
        self.load(event_id).await
    }
}
