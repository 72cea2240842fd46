//! Classification of pool and Diesel failures shared by the adapters.
//!
//! Each adapter folds [`StoreFailure`] into its own port error. Driver
//! messages are logged at debug level and never copied into the port error,
//! so table and constraint names do not reach the domain.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Coarse outcome of a failed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum StoreFailure {
    /// The connection dropped or could not be checked out.
    Connection(&'static str),
    /// A unique index rejected the row.
    UniqueViolation,
    /// A check constraint rejected the row (occupancy or cardinality drift).
    CheckViolation,
    /// Anything else: bad SQL, missing rows, serialization failures.
    Query(&'static str),
}

pub(super) fn classify(error: &DieselError) -> StoreFailure {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = ?info.constraint_name(),
                "statement failed"
            );
            match kind {
                DatabaseErrorKind::UniqueViolation => StoreFailure::UniqueViolation,
                DatabaseErrorKind::CheckViolation => StoreFailure::CheckViolation,
                DatabaseErrorKind::ClosedConnection => {
                    StoreFailure::Connection("database connection error")
                }
                _ => StoreFailure::Query("database error"),
            }
        }
        DieselError::NotFound => StoreFailure::Query("record not found"),
        DieselError::QueryBuilderError(_) => StoreFailure::Query("database query error"),
        other => {
            debug!(error = %other, "statement failed");
            StoreFailure::Query("database error")
        }
    }
}

/// Message for a pool failure; every pool failure is a connection failure.
pub(super) fn pool_failure_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn missing_rows_are_query_failures() {
        assert_eq!(
            classify(&DieselError::NotFound),
            StoreFailure::Query("record not found")
        );
    }

    #[rstest]
    fn pool_failures_keep_their_message() {
        let message = pool_failure_message(PoolError::checkout("timed out"));
        assert_eq!(message, "timed out");
    }
}
