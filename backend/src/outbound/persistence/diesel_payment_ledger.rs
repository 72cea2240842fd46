//! PostgreSQL-backed `PaymentLedger` implementation using Diesel ORM.
//!
//! `transition_once` is one `UPDATE ... WHERE status = 'pending' RETURNING`
//! statement. Exactly one concurrent caller gets the row back; every other
//! caller reads the already-terminal row and reports `AlreadyTerminal`.
//!
//! Sweep claims lock their batch with `FOR UPDATE SKIP LOCKED` and stamp
//! `last_examined_at` in the same statement, so overlapping sweeps take
//! disjoint rows and rows that stay pending rotate behind the rest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Timestamptz};
use diesel_async::RunQueryDsl;

use tracing::debug;

use crate::domain::ports::{PaymentLedger, PaymentLedgerError};
use crate::domain::{
    EventId, Money, PaymentObligation, PaymentObligationId, PaymentStatus, ProviderTransactionId,
    TerminalStatus, TransitionOutcome, UserId,
};

use super::store_failure::{StoreFailure, classify, pool_failure_message};
use super::models::{NewPaymentObligationRow, PaymentObligationRow};
use super::pool::{DbPool, PoolError};
use super::schema::payment_obligations;

const CLAIM_STALE_PENDING_SQL: &str = r#"
UPDATE payment_obligations
SET last_examined_at = $2
WHERE id IN (
    SELECT id FROM payment_obligations
    WHERE status = 'pending' AND created_at < $1
    ORDER BY last_examined_at ASC NULLS FIRST, created_at ASC, id ASC
    LIMIT $3
    FOR UPDATE SKIP LOCKED
)
RETURNING id, provider_transaction_id, payer_id, event_id, amount_minor_units,
          currency, status, created_at, updated_at
"#;

const CLAIM_UNSEATED_SQL: &str = r#"
UPDATE payment_obligations
SET last_examined_at = $2
WHERE id IN (
    SELECT id FROM payment_obligations
    WHERE status = 'completed' AND seat_resolved_at IS NULL AND updated_at < $1
    ORDER BY last_examined_at ASC NULLS FIRST, created_at ASC, id ASC
    LIMIT $3
    FOR UPDATE SKIP LOCKED
)
RETURNING id, provider_transaction_id, payer_id, event_id, amount_minor_units,
          currency, status, created_at, updated_at
"#;

/// Diesel-backed implementation of the `PaymentLedger` port.
#[derive(Clone)]
pub struct DieselPaymentLedger {
    pool: DbPool,
}

impl DieselPaymentLedger {
    /// Create a new ledger with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> PaymentLedgerError {
    PaymentLedgerError::connection(pool_failure_message(error))
}

/// Unique violations can only come from the provider transaction id, so the
/// caller supplies it for the duplicate variant.
fn map_diesel_error(
    error: diesel::result::Error,
    provider_transaction_id: &ProviderTransactionId,
) -> PaymentLedgerError {
    match classify(&error) {
        StoreFailure::Connection(message) => PaymentLedgerError::connection(message),
        StoreFailure::UniqueViolation => {
            PaymentLedgerError::duplicate_transaction(provider_transaction_id.as_str())
        }
        StoreFailure::CheckViolation => PaymentLedgerError::query("obligation row rejected"),
        StoreFailure::Query(message) => PaymentLedgerError::query(message),
    }
}

fn map_read_error(error: diesel::result::Error) -> PaymentLedgerError {
    match classify(&error) {
        StoreFailure::Connection(message) => PaymentLedgerError::connection(message),
        StoreFailure::Query(message) => PaymentLedgerError::query(message),
        StoreFailure::UniqueViolation | StoreFailure::CheckViolation => {
            PaymentLedgerError::query("obligation row rejected")
        }
    }
}

/// Convert a database row to a domain obligation.
fn row_to_obligation(row: PaymentObligationRow) -> Result<PaymentObligation, PaymentLedgerError> {
    let id = row.id;
    let corrupt = |field: &str, err: &dyn std::fmt::Display| {
        PaymentLedgerError::corrupt(format!("obligation {id}: invalid {field}: {err}"))
    };
    let provider_transaction_id = ProviderTransactionId::new(row.provider_transaction_id)
        .map_err(|err| corrupt("provider_transaction_id", &err))?;
    let amount = Money::new(row.amount_minor_units, &row.currency)
        .map_err(|err| corrupt("amount", &err))?;
    let status: PaymentStatus = row.status.parse().map_err(|err| corrupt("status", &err))?;

    Ok(PaymentObligation {
        id: PaymentObligationId::from_uuid(id),
        provider_transaction_id,
        payer_id: UserId::from_uuid(row.payer_id),
        event_id: EventId::from_uuid(row.event_id),
        amount,
        status,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn claim_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn rows_to_obligations(
    rows: Vec<PaymentObligationRow>,
) -> Result<Vec<PaymentObligation>, PaymentLedgerError> {
    rows.into_iter().map(row_to_obligation).collect()
}

impl DieselPaymentLedger {
    /// Run one claim statement and return its rows in rotation order.
    async fn claim(
        &self,
        statement: &str,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<PaymentObligation>, PaymentLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut rows: Vec<PaymentObligationRow> = sql_query(statement)
            .bind::<Timestamptz, _>(cutoff)
            .bind::<Timestamptz, _>(now)
            .bind::<BigInt, _>(claim_limit(limit))
            .load(&mut conn)
            .await
            .map_err(map_read_error)?;
        // RETURNING carries no order; every claimed row shares `now`.
        rows.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        rows_to_obligations(rows)
    }
}

#[async_trait]
impl PaymentLedger for DieselPaymentLedger {
    async fn open(&self, obligation: &PaymentObligation) -> Result<(), PaymentLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewPaymentObligationRow {
            id: *obligation.id.as_uuid(),
            provider_transaction_id: obligation.provider_transaction_id.as_str(),
            payer_id: *obligation.payer_id.as_uuid(),
            event_id: *obligation.event_id.as_uuid(),
            amount_minor_units: obligation.amount.minor_units(),
            currency: obligation.amount.currency(),
            status: obligation.status.as_str(),
            created_at: obligation.created_at,
            updated_at: obligation.updated_at,
        };

        diesel::insert_into(payment_obligations::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_diesel_error(err, &obligation.provider_transaction_id))
    }

    async fn transition_once(
        &self,
        provider_transaction_id: &ProviderTransactionId,
        target: TerminalStatus,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, PaymentLedgerError> {
        let key = provider_transaction_id.as_str();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let target_status = PaymentStatus::from(target);
        let applied = diesel::update(
            payment_obligations::table
                .filter(payment_obligations::provider_transaction_id.eq(key))
                .filter(payment_obligations::status.eq(PaymentStatus::Pending.as_str())),
        )
        .set((
            payment_obligations::status.eq(target_status.as_str()),
            payment_obligations::updated_at.eq(now),
        ))
        .returning(PaymentObligationRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_read_error)?;

        if let Some(row) = applied {
            return row_to_obligation(row).map(TransitionOutcome::Applied);
        }

        let stored = payment_obligations::table
            .filter(payment_obligations::provider_transaction_id.eq(key))
            .select(PaymentObligationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_read_error)?
            .ok_or_else(|| PaymentLedgerError::not_found(key))?;
        row_to_obligation(stored).map(TransitionOutcome::AlreadyTerminal)
    }

    async fn find_by_transaction(
        &self,
        provider_transaction_id: &ProviderTransactionId,
    ) -> Result<Option<PaymentObligation>, PaymentLedgerError> {
        let key = provider_transaction_id.as_str();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        payment_obligations::table
            .filter(payment_obligations::provider_transaction_id.eq(key))
            .select(PaymentObligationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_read_error)?
            .map(row_to_obligation)
            .transpose()
    }

    async fn claim_stale_pending(
        &self,
        created_before: DateTime<Utc>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<PaymentObligation>, PaymentLedgerError> {
        self.claim(CLAIM_STALE_PENDING_SQL, created_before, now, limit)
            .await
    }

    async fn claim_unseated_completions(
        &self,
        completed_before: DateTime<Utc>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<PaymentObligation>, PaymentLedgerError> {
        self.claim(CLAIM_UNSEATED_SQL, completed_before, now, limit)
            .await
    }

    async fn mark_seat_resolved(
        &self,
        provider_transaction_id: &ProviderTransactionId,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentLedgerError> {
        let key = provider_transaction_id.as_str();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            payment_obligations::table
                .filter(payment_obligations::provider_transaction_id.eq(key))
                .filter(payment_obligations::status.eq(PaymentStatus::Completed.as_str()))
                .filter(payment_obligations::seat_resolved_at.is_null()),
        )
        .set(payment_obligations::seat_resolved_at.eq(Some(now)))
        .execute(&mut conn)
        .await
        .map_err(map_read_error)?;
        debug!(provider_transaction_id = %key, updated, "seat resolution recorded");
        Ok(())
    }

    async fn list_for_payer(
        &self,
        payer_id: &UserId,
    ) -> Result<Vec<PaymentObligation>, PaymentLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = payment_obligations::table
            .filter(payment_obligations::payer_id.eq(payer_id.as_uuid()))
            .order((
                payment_obligations::created_at.desc(),
                payment_obligations::id.asc(),
            ))
            .select(PaymentObligationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_read_error)?;
        rows_to_obligations(rows)
    }

    async fn completed_for_events(
        &self,
        event_ids: &[EventId],
    ) -> Result<Vec<PaymentObligation>, PaymentLedgerError> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<uuid::Uuid> = event_ids.iter().map(|id| *id.as_uuid()).collect();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = payment_obligations::table
            .filter(payment_obligations::event_id.eq_any(ids))
            .filter(payment_obligations::status.eq(PaymentStatus::Completed.as_str()))
            .order(payment_obligations::created_at.asc())
            .select(PaymentObligationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_read_error)?;
        rows_to_obligations(rows)
    }
}
