//! Driven port recording payments captured without a seat.

use async_trait::async_trait;

use crate::domain::SettlementConflict;

use super::define_port_error;

define_port_error! {
    /// Errors raised by settlement conflict repository adapters.
    pub enum SettlementConflictRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "settlement conflict repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "settlement conflict repository query failed: {message}",
    }
}

/// Operator-facing record of settlement conflicts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettlementConflictRepository: Send + Sync {
    /// Record a conflict; at most one row per provider transaction id.
    ///
    /// Returns `false` when a conflict for the same transaction already
    /// exists.
    async fn record(
        &self,
        conflict: &SettlementConflict,
    ) -> Result<bool, SettlementConflictRepositoryError>;

    /// All recorded conflicts, newest first.
    async fn list(&self) -> Result<Vec<SettlementConflict>, SettlementConflictRepositoryError>;
}
