//! PostgreSQL-backed `SettlementConflictRepository` implementation.
//!
//! Inserts use `ON CONFLICT DO NOTHING` on the provider transaction id, so a
//! redelivered signal that races the first conflict write leaves one row.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{SettlementConflictRepository, SettlementConflictRepositoryError};
use crate::domain::{
    ConflictReason, EventId, PaymentObligationId, ProviderTransactionId, SettlementConflict, UserId,
};

use super::store_failure::{StoreFailure, classify, pool_failure_message};
use super::models::{NewSettlementConflictRow, SettlementConflictRow};
use super::pool::{DbPool, PoolError};
use super::schema::settlement_conflicts;

/// Diesel-backed implementation of the settlement conflict port.
#[derive(Clone)]
pub struct DieselSettlementConflictRepository {
    pool: DbPool,
}

impl DieselSettlementConflictRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> SettlementConflictRepositoryError {
    SettlementConflictRepositoryError::connection(pool_failure_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> SettlementConflictRepositoryError {
    match classify(&error) {
        StoreFailure::Connection(message) => {
            SettlementConflictRepositoryError::connection(message)
        }
        StoreFailure::UniqueViolation | StoreFailure::CheckViolation => {
            SettlementConflictRepositoryError::query("conflict row rejected")
        }
        StoreFailure::Query(message) => SettlementConflictRepositoryError::query(message),
    }
}

fn row_to_conflict(
    row: SettlementConflictRow,
) -> Result<SettlementConflict, SettlementConflictRepositoryError> {
    let provider_transaction_id = ProviderTransactionId::new(row.provider_transaction_id)
        .map_err(|err| {
            SettlementConflictRepositoryError::query(format!(
                "invalid provider transaction id in database: {err}"
            ))
        })?;
    let reason: ConflictReason = row.reason.parse().map_err(|err| {
        SettlementConflictRepositoryError::query(format!("invalid conflict reason: {err}"))
    })?;

    Ok(SettlementConflict {
        id: row.id,
        obligation_id: PaymentObligationId::from_uuid(row.obligation_id),
        provider_transaction_id,
        event_id: EventId::from_uuid(row.event_id),
        payer_id: UserId::from_uuid(row.payer_id),
        reason,
        recorded_at: row.recorded_at,
    })
}

#[async_trait]
impl SettlementConflictRepository for DieselSettlementConflictRepository {
    async fn record(
        &self,
        conflict: &SettlementConflict,
    ) -> Result<bool, SettlementConflictRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewSettlementConflictRow {
            id: conflict.id,
            obligation_id: *conflict.obligation_id.as_uuid(),
            provider_transaction_id: conflict.provider_transaction_id.as_str(),
            event_id: *conflict.event_id.as_uuid(),
            payer_id: *conflict.payer_id.as_uuid(),
            reason: conflict.reason.as_str(),
            recorded_at: conflict.recorded_at,
        };

        let inserted = diesel::insert_into(settlement_conflicts::table)
            .values(&row)
            .on_conflict(settlement_conflicts::provider_transaction_id)
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(inserted == 1)
    }

    async fn list(&self) -> Result<Vec<SettlementConflict>, SettlementConflictRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        settlement_conflicts::table
            .order((
                settlement_conflicts::recorded_at.desc(),
                settlement_conflicts::id.asc(),
            ))
            .select(SettlementConflictRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?
            .into_iter()
            .map(row_to_conflict)
            .collect()
    }
}
