//! Free-path enrollment.
//!
//! Joining reads the event only to reject missing and paid events; the seat
//! itself is taken by one conditional write through the [`CapacityGuard`],
//! so concurrent joins resolve in a single step with no retries.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::capacity_guard::CapacityGuard;
use super::ports::{EnrollmentCommand, EventCapacityStore, EventRepository};
use super::rejection::{map_capacity_store_error, map_event_repository_error};
use super::{AdmitOutcome, Error, Event, EventId, Rejection, RemoveOutcome, UserId};

/// Enrollment service implementing [`EnrollmentCommand`].
pub struct EnrollmentService<S: ?Sized, R: ?Sized> {
    guard: CapacityGuard<S>,
    events: Arc<R>,
}

impl<S: ?Sized, R: ?Sized> Clone for EnrollmentService<S, R> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            events: Arc::clone(&self.events),
        }
    }
}

impl<S, R> EnrollmentService<S, R>
where
    S: EventCapacityStore + ?Sized,
    R: EventRepository + ?Sized,
{
    /// Create a service over the capacity store and event repository.
    pub fn new(store: Arc<S>, events: Arc<R>) -> Self {
        Self {
            guard: CapacityGuard::new(store),
            events,
        }
    }

    async fn load(&self, event_id: &EventId) -> Result<Event, Error> {
        self.events
            .find(event_id)
            .await
            .map_err(map_event_repository_error)?
            .ok_or_else(|| Rejection::EventNotFound(*event_id).into())
    }
}

#[async_trait]
impl<S, R> EnrollmentCommand for EnrollmentService<S, R>
where
    S: EventCapacityStore + ?Sized,
    R: EventRepository + ?Sized,
{
    async fn join_free(&self, event_id: &EventId, attendee: &UserId) -> Result<Event, Error> {
        let event = self.load(event_id).await?;
        if event.requires_payment() {
            return Err(Rejection::NotFree.into());
        }

        let outcome = self
            .guard
            .admit(event_id, attendee)
            .await
            .map_err(map_capacity_store_error)?;
        match outcome {
            AdmitOutcome::Admitted => {
                info!(%event_id, %attendee, "attendee joined free event");
                self.load(event_id).await
            }
            AdmitOutcome::AlreadyMember => Err(Rejection::AlreadyEnrolled.into()),
            AdmitOutcome::Full => Err(Rejection::EventFull.into()),
            AdmitOutcome::NotJoinable => Err(Rejection::EventNotJoinable.into()),
        }
    }

    async fn leave(&self, event_id: &EventId, attendee: &UserId) -> Result<(), Error> {
        let outcome = self
            .guard
            .release(event_id, attendee)
            .await
            .map_err(map_capacity_store_error)?;
        match outcome {
            RemoveOutcome::Removed => {
                info!(%event_id, %attendee, "attendee left event");
                Ok(())
            }
            RemoveOutcome::NotMember => Err(Rejection::NotEnrolled.into()),
        }
    }
}

#[cfg(test)]
#[path = "enrollment_service_tests.rs"]
mod tests;
