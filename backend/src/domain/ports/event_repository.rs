//! Driven port for event records outside the occupancy fields.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Event, EventId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by event repository adapters.
    pub enum EventRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "event repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "event repository query failed: {message}",
        /// A stored row could not be converted into a domain event.
        Corrupt { message: String } => "event repository returned an invalid row: {message}",
    }
}

/// Outcome of a conditional delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Row removed.
    Deleted,
    /// Participants remain; nothing removed.
    HasParticipants,
    /// No such event.
    NotFound,
}

/// Outcome of a conditional cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Status moved to `cancelled`.
    Cancelled(Event),
    /// Status was already `completed` or `cancelled`.
    NotCancellable(Event),
    /// No such event.
    NotFound,
}

/// Event persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert a newly created event.
    async fn insert(&self, event: &Event) -> Result<(), EventRepositoryError>;

    /// Fetch one event.
    async fn find(&self, event_id: &EventId) -> Result<Option<Event>, EventRepositoryError>;

    /// All events hosted by `host_id`, oldest first.
    async fn list_by_host(&self, host_id: &UserId) -> Result<Vec<Event>, EventRepositoryError>;

    /// Move an upcoming or ongoing event to `cancelled` in one predicated write.
    async fn cancel(&self, event_id: &EventId) -> Result<CancelOutcome, EventRepositoryError>;

    /// Delete the event only while it has no participants.
    async fn delete_if_empty(&self, event_id: &EventId)
    -> Result<DeleteOutcome, EventRepositoryError>;

    /// Mark upcoming/ongoing events whose start day precedes `now`'s day as
    /// completed. Returns the number of rows changed.
    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<u64, EventRepositoryError>;
}
