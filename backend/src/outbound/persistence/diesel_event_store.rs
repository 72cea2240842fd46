//! PostgreSQL-backed event store implementing `EventRepository` and
//! `EventCapacityStore`.
//!
//! Occupancy changes are single predicated `UPDATE` statements: the seat
//! check, the duplicate check, and the append all happen inside one row
//! write, so concurrent admissions serialise on the row lock and the loser
//! sees zero affected rows. The row is re-read only to classify why nothing
//! changed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Uuid as SqlUuid;
use diesel_async::RunQueryDsl;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{
    CancelOutcome, DeleteOutcome, EventCapacityStore, EventCapacityStoreError, EventRepository,
    EventRepositoryError,
};
use crate::domain::{
    AdmitOutcome, Capacity, Event, EventId, EventParts, EventStatus, Price, RemoveOutcome, UserId,
};

use super::store_failure::{StoreFailure, classify, pool_failure_message};
use super::models::{EventRow, NewEventRow};
use super::pool::{DbPool, PoolError};
use super::schema::events;

const OPEN_STATUSES: [&str; 2] = ["upcoming", "ongoing"];

const ADMIT_SQL: &str = r#"
UPDATE events
SET participants = array_append(participants, $2),
    current_participants = current_participants + 1,
    updated_at = NOW()
WHERE id = $1
  AND status = 'upcoming'
  AND is_approved
  AND current_participants < max_participants
  AND NOT ($2 = ANY(participants))
"#;

const REMOVE_SQL: &str = r#"
UPDATE events
SET participants = array_remove(participants, $2),
    current_participants = current_participants - 1,
    updated_at = NOW()
WHERE id = $1
  AND $2 = ANY(participants)
"#;

/// Diesel-backed event persistence and occupancy store.
#[derive(Clone)]
pub struct DieselEventStore {
    pool: DbPool,
}

impl DieselEventStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> EventRepositoryError {
    EventRepositoryError::connection(pool_failure_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> EventRepositoryError {
    match classify(&error) {
        StoreFailure::Connection(message) => EventRepositoryError::connection(message),
        StoreFailure::UniqueViolation => EventRepositoryError::query("event id already exists"),
        StoreFailure::CheckViolation => EventRepositoryError::query("event row violates occupancy"),
        StoreFailure::Query(message) => EventRepositoryError::query(message),
    }
}

fn map_capacity_pool_error(error: PoolError) -> EventCapacityStoreError {
    EventCapacityStoreError::connection(pool_failure_message(error))
}

fn map_capacity_diesel_error(error: diesel::result::Error) -> EventCapacityStoreError {
    match classify(&error) {
        StoreFailure::Connection(message) => EventCapacityStoreError::connection(message),
        StoreFailure::CheckViolation => {
            EventCapacityStoreError::query("admission would violate occupancy")
        }
        StoreFailure::UniqueViolation | StoreFailure::Query(_) => {
            EventCapacityStoreError::query("database error")
        }
    }
}

fn row_to_event(row: EventRow) -> Result<Event, EventRepositoryError> {
    let id = row.id;
    let corrupt = |field: &str, err: &dyn std::fmt::Display| {
        EventRepositoryError::corrupt(format!("event {id}: invalid {field}: {err}"))
    };
    let max_participants = u32::try_from(row.max_participants)
        .map_err(|err| corrupt("max_participants", &err))?;
    let capacity = Capacity::new(max_participants).map_err(|err| corrupt("capacity", &err))?;
    let current_participants = u32::try_from(row.current_participants)
        .map_err(|err| corrupt("current_participants", &err))?;
    let category = row
        .category
        .parse()
        .map_err(|err| corrupt("category", &err))?;
    let status: EventStatus = row.status.parse().map_err(|err| corrupt("status", &err))?;
    let price = Price::new(row.price).map_err(|err| corrupt("price", &err))?;

    Event::from_parts(EventParts {
        id: EventId::from_uuid(id),
        host_id: UserId::from_uuid(row.host_id),
        title: row.title,
        description: row.description,
        category,
        location: row.location,
        starts_at: row.starts_at,
        capacity,
        current_participants,
        participants: row.participants.into_iter().map(UserId::from_uuid).collect(),
        status,
        is_approved: row.is_approved,
        price,
        is_paid: row.is_paid,
        created_at: row.created_at,
    })
    .map_err(|err| corrupt("occupancy", &err))
}

fn row_to_capacity_event(row: EventRow) -> Result<Event, EventCapacityStoreError> {
    row_to_event(row).map_err(|err| EventCapacityStoreError::query(err.to_string()))
}

/// Explain a missed admission from the row as re-read afterwards.
///
/// A free seat in the re-read means a concurrent leave landed between the
/// write and the read. That is contention, never a full event.
fn classify_missed_admission(
    event: &Event,
    attendee: &UserId,
) -> Result<AdmitOutcome, EventCapacityStoreError> {
    match event.admission(attendee) {
        AdmitOutcome::Admitted => {
            debug!(event_id = %event.id(), "admission raced a concurrent change");
            Err(EventCapacityStoreError::contended(event.id().to_string()))
        }
        refused => Ok(refused),
    }
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc()
}

#[async_trait]
impl EventRepository for DieselEventStore {
    async fn insert(&self, event: &Event) -> Result<(), EventRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let max_participants = i32::try_from(event.capacity().get())
            .map_err(|err| EventRepositoryError::query(format!("capacity out of range: {err}")))?;
        let category = event.category().label();

        let row = NewEventRow {
            id: *event.id().as_uuid(),
            host_id: *event.host_id().as_uuid(),
            title: event.title(),
            description: event.description(),
            category,
            location: event.location(),
            starts_at: event.starts_at(),
            max_participants,
            status: event.status().as_str(),
            is_approved: event.is_approved(),
            price: event.price().minor_units(),
            is_paid: event.is_paid(),
            created_at: event.created_at(),
            updated_at: event.created_at(),
        };

        diesel::insert_into(events::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find(&self, event_id: &EventId) -> Result<Option<Event>, EventRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        events::table
            .filter(events::id.eq(event_id.as_uuid()))
            .select(EventRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(row_to_event)
            .transpose()
    }

    async fn list_by_host(&self, host_id: &UserId) -> Result<Vec<Event>, EventRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        events::table
            .filter(events::host_id.eq(host_id.as_uuid()))
            .order((events::created_at.asc(), events::id.asc()))
            .select(EventRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?
            .into_iter()
            .map(row_to_event)
            .collect()
    }

    async fn cancel(&self, event_id: &EventId) -> Result<CancelOutcome, EventRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let cancelled = diesel::update(
            events::table
                .filter(events::id.eq(event_id.as_uuid()))
                .filter(events::status.eq_any(OPEN_STATUSES)),
        )
        .set((
            events::status.eq(EventStatus::Cancelled.as_str()),
            events::updated_at.eq(diesel::dsl::now),
        ))
        .returning(EventRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;

        if let Some(row) = cancelled {
            return row_to_event(row).map(CancelOutcome::Cancelled);
        }
        let current = events::table
            .filter(events::id.eq(event_id.as_uuid()))
            .select(EventRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        match current {
            Some(row) => row_to_event(row).map(CancelOutcome::NotCancellable),
            None => Ok(CancelOutcome::NotFound),
        }
    }

    async fn delete_if_empty(
        &self,
        event_id: &EventId,
    ) -> Result<DeleteOutcome, EventRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(
            events::table
                .filter(events::id.eq(event_id.as_uuid()))
                .filter(events::current_participants.eq(0)),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        if deleted > 0 {
            return Ok(DeleteOutcome::Deleted);
        }
        let exists = diesel::select(diesel::dsl::exists(
            events::table.filter(events::id.eq(event_id.as_uuid())),
        ))
        .get_result::<bool>(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(if exists {
            DeleteOutcome::HasParticipants
        } else {
            DeleteOutcome::NotFound
        })
    }

    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<u64, EventRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let cutoff = start_of_day(now);
        let completed = diesel::update(
            events::table
                .filter(events::status.eq_any(OPEN_STATUSES))
                .filter(events::starts_at.lt(cutoff)),
        )
        .set((
            events::status.eq(EventStatus::Completed.as_str()),
            events::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        debug!(completed, %cutoff, "completed elapsed events");
        u64::try_from(completed)
            .map_err(|err| EventRepositoryError::query(format!("row count out of range: {err}")))
    }
}

#[async_trait]
impl EventCapacityStore for DieselEventStore {
    async fn try_admit(
        &self,
        event_id: &EventId,
        attendee: &UserId,
    ) -> Result<AdmitOutcome, EventCapacityStoreError> {
        let mut conn = self.pool.get().await.map_err(map_capacity_pool_error)?;
        let updated = sql_query(ADMIT_SQL)
            .bind::<SqlUuid, _>(event_id.as_uuid())
            .bind::<SqlUuid, _>(attendee.as_uuid())
            .execute(&mut conn)
            .await
            .map_err(map_capacity_diesel_error)?;
        if updated == 1 {
            return Ok(AdmitOutcome::Admitted);
        }

        let row = events::table
            .filter(events::id.eq(event_id.as_uuid()))
            .select(EventRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_capacity_diesel_error)?
            .ok_or_else(|| EventCapacityStoreError::event_not_found(event_id.to_string()))?;
        classify_missed_admission(&row_to_capacity_event(row)?, attendee)
    }

    async fn try_remove(
        &self,
        event_id: &EventId,
        attendee: &UserId,
    ) -> Result<RemoveOutcome, EventCapacityStoreError> {
        let mut conn = self.pool.get().await.map_err(map_capacity_pool_error)?;
        let updated = sql_query(REMOVE_SQL)
            .bind::<SqlUuid, _>(event_id.as_uuid())
            .bind::<SqlUuid, _>(attendee.as_uuid())
            .execute(&mut conn)
            .await
            .map_err(map_capacity_diesel_error)?;
        if updated == 1 {
            return Ok(RemoveOutcome::Removed);
        }

        let exists = diesel::select(diesel::dsl::exists(
            events::table.filter(events::id.eq(event_id.as_uuid())),
        ))
        .get_result::<bool>(&mut conn)
        .await
        .map_err(map_capacity_diesel_error)?;
        if exists {
            Ok(RemoveOutcome::NotMember)
        } else {
            Err(EventCapacityStoreError::event_not_found(event_id.to_string()))
        }
    }

    async fn holds_seat(
        &self,
        event_id: &EventId,
        attendee: &UserId,
    ) -> Result<bool, EventCapacityStoreError> {
        let mut conn = self.pool.get().await.map_err(map_capacity_pool_error)?;
        let participants: Option<Vec<Uuid>> = events::table
            .filter(events::id.eq(event_id.as_uuid()))
            .select(events::participants)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_capacity_diesel_error)?;
        participants
            .map(|seated| seated.contains(attendee.as_uuid()))
            .ok_or_else(|| EventCapacityStoreError::event_not_found(event_id.to_string()))
    }

    async fn has_seat(&self, event_id: &EventId) -> Result<bool, EventCapacityStoreError> {
        let mut conn = self.pool.get().await.map_err(map_capacity_pool_error)?;
        let occupancy: Option<(i32, i32)> = events::table
            .filter(events::id.eq(event_id.as_uuid()))
            .select((events::current_participants, events::max_participants))
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_capacity_diesel_error)?;
        let (current, max) = occupancy
            .ok_or_else(|| EventCapacityStoreError::event_not_found(event_id.to_string()))?;
        Ok(current < max)
    }
}
