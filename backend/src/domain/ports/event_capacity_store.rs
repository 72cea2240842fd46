//! Driven port owning event occupancy.
//!
//! The store is the only writer of an event's participant set and counter.
//! Both mutations are single conditional writes: the admission check and the
//! append happen in one atomic step against the backing store, never as a
//! caller-side read followed by a write.

use async_trait::async_trait;

use crate::domain::{AdmitOutcome, EventId, RemoveOutcome, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by event capacity store adapters.
    pub enum EventCapacityStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "event store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "event store query failed: {message}",
        /// No event exists with the given id.
        EventNotFound { event_id: String } => "event {event_id} not found",
        /// The conditional write missed, yet a seat was free when re-read;
        /// a concurrent leave raced the admission. Safe to retry.
        Contended { event_id: String } => "admission to event {event_id} raced a concurrent change",
    }
}

/// Atomic, conditional occupancy mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventCapacityStore: Send + Sync {
    /// Append `attendee` and increment the counter only when the event is
    /// upcoming, approved, below capacity, and the attendee is not present.
    async fn try_admit(
        &self,
        event_id: &EventId,
        attendee: &UserId,
    ) -> Result<AdmitOutcome, EventCapacityStoreError>;

    /// Remove `attendee` and decrement the counter in the same write.
    async fn try_remove(
        &self,
        event_id: &EventId,
        attendee: &UserId,
    ) -> Result<RemoveOutcome, EventCapacityStoreError>;

    /// Read-only: whether `attendee` currently holds a seat.
    async fn holds_seat(
        &self,
        event_id: &EventId,
        attendee: &UserId,
    ) -> Result<bool, EventCapacityStoreError>;

    /// Advisory read: whether a seat is free right now.
    ///
    /// The answer may be stale by the time the caller acts on it.
    async fn has_seat(&self, event_id: &EventId) -> Result<bool, EventCapacityStoreError>;
}
