//! Finance error types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use mizan_shared::AppError;
use mizan_shared::types::TransactionId;

use super::store::StoreError;
use super::types::TransactionKind;

/// Errors that can occur during ledger and balance operations.
///
/// Drift between the stored and recomputed balance is not an error; it is
/// reported through `ConsistencyReport`.
#[derive(Debug, Error)]
pub enum FinanceError {
    /// Transaction id does not resolve in the ledger.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Ledger the lookup ran against.
        kind: TransactionKind,
        /// The missing id.
        id: TransactionId,
    },

    /// Ledger amounts must be strictly positive.
    #[error("Amount must be greater than zero, got {0}")]
    InvalidAmount(Decimal),

    /// Period start is after its end.
    #[error("Invalid period: start {start} is after end {end}")]
    InvalidPeriod {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },

    /// Period key fields do not fit its period type.
    #[error("Invalid period key: {0}")]
    InvalidPeriodKey(String),

    /// Backing store failure, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FinanceError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "TRANSACTION_NOT_FOUND",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidPeriod { .. } => "INVALID_PERIOD",
            Self::InvalidPeriodKey(_) => "INVALID_PERIOD_KEY",
            Self::Store(_) => "STORE_FAILURE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount(_) | Self::InvalidPeriod { .. } | Self::InvalidPeriodKey(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Store(_) => 500,
        }
    }
}

impl From<FinanceError> for AppError {
    fn from(err: FinanceError) -> Self {
        match err {
            FinanceError::NotFound { .. } => Self::NotFound(err.to_string()),
            FinanceError::InvalidAmount(_)
            | FinanceError::InvalidPeriod { .. }
            | FinanceError::InvalidPeriodKey(_) => Self::Validation(err.to_string()),
            FinanceError::Store(store) => Self::Database(store.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn not_found() -> FinanceError {
        FinanceError::NotFound {
            kind: TransactionKind::Expense,
            id: TransactionId::from_uuid(uuid::Uuid::nil()),
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(not_found().error_code(), "TRANSACTION_NOT_FOUND");
        assert_eq!(
            FinanceError::InvalidAmount(dec!(0)).error_code(),
            "INVALID_AMOUNT"
        );
        assert_eq!(
            FinanceError::Store(StoreError::new("down")).error_code(),
            "STORE_FAILURE"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(not_found().http_status_code(), 404);
        assert_eq!(FinanceError::InvalidAmount(dec!(-5)).http_status_code(), 400);
        assert_eq!(
            FinanceError::InvalidPeriodKey("week 9".into()).http_status_code(),
            400
        );
        assert_eq!(
            FinanceError::Store(StoreError::new("timeout")).http_status_code(),
            500
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            not_found().to_string(),
            "expense not found: 00000000-0000-0000-0000-000000000000"
        );
        let err = FinanceError::InvalidPeriod {
            start: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid period: start 2024-02-01 is after end 2024-01-01"
        );
        assert_eq!(
            FinanceError::Store(StoreError::new("connection reset")).to_string(),
            "Store failure: connection reset"
        );
    }

    #[test]
    fn test_into_app_error() {
        assert_eq!(AppError::from(not_found()).status_code(), 404);
        assert_eq!(
            AppError::from(FinanceError::InvalidAmount(dec!(0))).status_code(),
            400
        );
        assert_eq!(
            AppError::from(FinanceError::Store(StoreError::new("x"))).status_code(),
            500
        );
    }
}
