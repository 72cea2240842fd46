//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are used
//! by Diesel for compile-time query validation and type-safe SQL generation.

diesel::table! {
    /// Scheduled gatherings and their occupancy.
    ///
    /// `participants` and `current_participants` only change together, in
    /// one predicated `UPDATE`; check constraints reject any row where they
    /// disagree or exceed `max_participants`.
    events (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Organiser who owns the event.
        host_id -> Uuid,
        title -> Varchar,
        description -> Text,
        /// Category label, e.g. `Tech Meetups`.
        category -> Varchar,
        location -> Varchar,
        starts_at -> Timestamptz,
        /// Capacity, between 1 and 1000.
        max_participants -> Int4,
        /// Occupied seats; equals `cardinality(participants)`.
        current_participants -> Int4,
        /// Enrolled attendee ids, without duplicates.
        participants -> Array<Uuid>,
        /// One of `upcoming`, `ongoing`, `completed`, `cancelled`.
        status -> Varchar,
        is_approved -> Bool,
        /// Price in minor currency units.
        price -> Int8,
        is_paid -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// One payment attempt per row, keyed by the provider transaction id.
    payment_obligations (id) {
        id -> Uuid,
        /// Provider intent id; unique, the settlement idempotency key.
        provider_transaction_id -> Varchar,
        payer_id -> Uuid,
        event_id -> Uuid,
        amount_minor_units -> Int8,
        currency -> Varchar,
        /// One of `pending`, `completed`, `failed`; terminal values never
        /// change again.
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        /// Last sweep pass that claimed the row; `NULL` sorts first.
        last_examined_at -> Nullable<Timestamptz>,
        /// Set once a completed obligation's payer is seated or its
        /// conflict is recorded.
        seat_resolved_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Payments captured without a seat, for operator reconciliation.
    settlement_conflicts (id) {
        id -> Uuid,
        obligation_id -> Uuid,
        /// Unique: at most one conflict per provider transaction.
        provider_transaction_id -> Varchar,
        event_id -> Uuid,
        payer_id -> Uuid,
        reason -> Varchar,
        recorded_at -> Timestamptz,
    }
}

diesel::joinable!(settlement_conflicts -> payment_obligations (obligation_id));
diesel::allow_tables_to_appear_in_same_query!(events, payment_obligations, settlement_conflicts);
