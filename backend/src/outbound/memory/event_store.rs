//! In-memory event store implementing `EventRepository` and
//! `EventCapacityStore`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    CancelOutcome, DeleteOutcome, EventCapacityStore, EventCapacityStoreError, EventRepository,
    EventRepositoryError,
};
use crate::domain::{AdmitOutcome, Event, EventId, RemoveOutcome, UserId};

use super::lock;

/// Events keyed by id; admission decisions run under the store lock.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: Mutex<HashMap<EventId, Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing events.
    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            events: Mutex::new(events.into_iter().map(|event| (event.id(), event)).collect()),
        }
    }
}

#[async_trait]
impl EventRepository for InMemoryEventStore {
    async fn insert(&self, event: &Event) -> Result<(), EventRepositoryError> {
        let mut events = lock(&self.events, EventRepositoryError::query)?;
        if events.contains_key(&event.id()) {
            return Err(EventRepositoryError::query(format!(
                "event {} already exists",
                event.id()
            )));
        }
        events.insert(event.id(), event.clone());
        Ok(())
    }

    async fn find(&self, event_id: &EventId) -> Result<Option<Event>, EventRepositoryError> {
        let events = lock(&self.events, EventRepositoryError::query)?;
        Ok(events.get(event_id).cloned())
    }

    async fn list_by_host(&self, host_id: &UserId) -> Result<Vec<Event>, EventRepositoryError> {
        let events = lock(&self.events, EventRepositoryError::query)?;
        let mut hosted: Vec<Event> = events
            .values()
            .filter(|event| event.host_id() == *host_id)
            .cloned()
            .collect();
        hosted.sort_by_key(|event| (event.created_at(), event.id()));
        Ok(hosted)
    }

    async fn cancel(&self, event_id: &EventId) -> Result<CancelOutcome, EventRepositoryError> {
        let mut events = lock(&self.events, EventRepositoryError::query)?;
        let Some(event) = events.get_mut(event_id) else {
            return Ok(CancelOutcome::NotFound);
        };
        if event.cancel() {
            Ok(CancelOutcome::Cancelled(event.clone()))
        } else {
            Ok(CancelOutcome::NotCancellable(event.clone()))
        }
    }

    async fn delete_if_empty(
        &self,
        event_id: &EventId,
    ) -> Result<DeleteOutcome, EventRepositoryError> {
        let mut events = lock(&self.events, EventRepositoryError::query)?;
        match events.get(event_id) {
            None => Ok(DeleteOutcome::NotFound),
            Some(event) if event.current_participants() > 0 => Ok(DeleteOutcome::HasParticipants),
            Some(_) => {
                events.remove(event_id);
                Ok(DeleteOutcome::Deleted)
            }
        }
    }

    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<u64, EventRepositoryError> {
        let mut events = lock(&self.events, EventRepositoryError::query)?;
        let completed = events
            .values_mut()
            .map(|event| event.complete_if_elapsed(now))
            .filter(|changed| *changed)
            .count();
        u64::try_from(completed)
            .map_err(|err| EventRepositoryError::query(format!("row count out of range: {err}")))
    }
}

#[async_trait]
impl EventCapacityStore for InMemoryEventStore {
    async fn try_admit(
        &self,
        event_id: &EventId,
        attendee: &UserId,
    ) -> Result<AdmitOutcome, EventCapacityStoreError> {
        let mut events = lock(&self.events, EventCapacityStoreError::query)?;
        let event = events
            .get_mut(event_id)
            .ok_or_else(|| EventCapacityStoreError::event_not_found(event_id.to_string()))?;
        Ok(event.try_admit(*attendee))
    }

    async fn try_remove(
        &self,
        event_id: &EventId,
        attendee: &UserId,
    ) -> Result<RemoveOutcome, EventCapacityStoreError> {
        let mut events = lock(&self.events, EventCapacityStoreError::query)?;
        let event = events
            .get_mut(event_id)
            .ok_or_else(|| EventCapacityStoreError::event_not_found(event_id.to_string()))?;
        Ok(event.try_remove(attendee))
    }

    async fn holds_seat(
        &self,
        event_id: &EventId,
        attendee: &UserId,
    ) -> Result<bool, EventCapacityStoreError> {
        let events = lock(&self.events, EventCapacityStoreError::query)?;
        events
            .get(event_id)
            .map(|event| event.is_participant(attendee))
            .ok_or_else(|| EventCapacityStoreError::event_not_found(event_id.to_string()))
    }

    async fn has_seat(&self, event_id: &EventId) -> Result<bool, EventCapacityStoreError> {
        let events = lock(&self.events, EventCapacityStoreError::query)?;
        events
            .get(event_id)
            .map(Event::has_free_seat)
            .ok_or_else(|| EventCapacityStoreError::event_not_found(event_id.to_string()))
    }
}
