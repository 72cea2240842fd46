//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{events, payment_obligations, settlement_conflicts};

/// Row struct for reading from the events table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EventRow {
    pub id: Uuid,
    pub host_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub max_participants: i32,
    pub current_participants: i32,
    pub participants: Vec<Uuid>,
    pub status: String,
    pub is_approved: bool,
    pub price: i64,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for creating new event records.
///
/// Occupancy columns are left to their defaults: a new event is empty.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = events)]
pub(crate) struct NewEventRow<'a> {
    pub id: Uuid,
    pub host_id: Uuid,
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub location: &'a str,
    pub starts_at: DateTime<Utc>,
    pub max_participants: i32,
    pub status: &'a str,
    pub is_approved: bool,
    pub price: i64,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Payment ledger models
// ---------------------------------------------------------------------------

/// Row struct for reading from the payment_obligations table.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = payment_obligations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PaymentObligationRow {
    pub id: Uuid,
    pub provider_transaction_id: String,
    pub payer_id: Uuid,
    pub event_id: Uuid,
    pub amount_minor_units: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for opening obligations.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_obligations)]
pub(crate) struct NewPaymentObligationRow<'a> {
    pub id: Uuid,
    pub provider_transaction_id: &'a str,
    pub payer_id: Uuid,
    pub event_id: Uuid,
    pub amount_minor_units: i64,
    pub currency: &'a str,
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Settlement conflict models
// ---------------------------------------------------------------------------

/// Row struct for reading from the settlement_conflicts table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = settlement_conflicts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SettlementConflictRow {
    pub id: Uuid,
    pub obligation_id: Uuid,
    pub provider_transaction_id: String,
    pub event_id: Uuid,
    pub payer_id: Uuid,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

/// Insertable struct for recording conflicts.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = settlement_conflicts)]
pub(crate) struct NewSettlementConflictRow<'a> {
    pub id: Uuid,
    pub obligation_id: Uuid,
    pub provider_transaction_id: &'a str,
    pub event_id: Uuid,
    pub payer_id: Uuid,
    pub reason: &'a str,
    pub recorded_at: DateTime<Utc>,
}
