//! Shared occupancy gate used by enrollment and settlement.
//!
//! `has_seat` is an advisory read for pre-checks; `admit` and `release`
//! delegate to the store's single conditional writes, which are the only
//! operations that may change occupancy.

use std::sync::Arc;

use tracing::debug;

use super::ports::{EventCapacityStore, EventCapacityStoreError};
use super::{AdmitOutcome, EventId, RemoveOutcome, UserId};

/// Capacity gate over an [`EventCapacityStore`].
pub struct CapacityGuard<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for CapacityGuard<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> CapacityGuard<S>
where
    S: EventCapacityStore + ?Sized,
{
    /// Wrap a capacity store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Whether a seat is plausibly free. Never a reservation.
    pub async fn has_seat(&self, event_id: &EventId) -> Result<bool, EventCapacityStoreError> {
        self.store.has_seat(event_id).await
    }

    /// Whether `attendee` already holds a seat. Never admits.
    pub async fn holds_seat(
        &self,
        event_id: &EventId,
        attendee: &UserId,
    ) -> Result<bool, EventCapacityStoreError> {
        self.store.holds_seat(event_id, attendee).await
    }

    /// Binding admission.
    pub async fn admit(
        &self,
        event_id: &EventId,
        attendee: &UserId,
    ) -> Result<AdmitOutcome, EventCapacityStoreError> {
        let outcome = self.store.try_admit(event_id, attendee).await?;
        debug!(%event_id, %attendee, ?outcome, "admission evaluated");
        Ok(outcome)
    }

    /// Binding removal.
    pub async fn release(
        &self,
        event_id: &EventId,
        attendee: &UserId,
    ) -> Result<RemoveOutcome, EventCapacityStoreError> {
        let outcome = self.store.try_remove(event_id, attendee).await?;
        debug!(%event_id, %attendee, ?outcome, "removal evaluated");
        Ok(outcome)
    }
}
