//! Driving port for free-path enrollment.

use async_trait::async_trait;

use crate::domain::{Error, Event, EventId, UserId};

/// Join and leave free events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentCommand: Send + Sync {
    /// Admit `attendee` to a free event and return the updated event.
    async fn join_free(&self, event_id: &EventId, attendee: &UserId) -> Result<Event, Error>;

    /// Release the seat held by `attendee`.
    async fn leave(&self, event_id: &EventId, attendee: &UserId) -> Result<(), Error>;
}
