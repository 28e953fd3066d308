//! Income and expense mutations with automatic balance resync.
//!
//! Each mutation writes the ledger first, then invalidates the affected
//! period rows, then recomputes the balance. A failure after the write
//! surfaces as an error; the ledger remains correct and a repair heals the
//! caches.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use mizan_shared::types::TransactionId;

use super::engine::BalanceEngine;
use super::error::FinanceError;
use super::types::{
    ensure_positive, LedgerTransaction, NewTransaction, SyncOperation, SyncResult,
    TransactionChanges, TransactionKind,
};

/// Result of recording a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
    /// The stored record.
    pub record: LedgerTransaction,
    /// Balance after the sync.
    pub sync: SyncResult,
}

/// Result of changing a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// The record as it was before the change.
    pub previous: LedgerTransaction,
    /// The record after the change.
    pub record: LedgerTransaction,
    /// Balance after the sync.
    pub sync: SyncResult,
    /// Distinct dates invalidated: the old date, plus the new one if moved.
    pub affected_dates: Vec<NaiveDate>,
}

/// Result of removing a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// The removed record.
    pub deleted_record: LedgerTransaction,
    /// Balance after the sync.
    pub sync: SyncResult,
}

/// Mutation entry point for the ledger.
#[derive(Debug, Clone)]
pub struct TransactionService {
    engine: Arc<BalanceEngine>,
}

impl TransactionService {
    /// Creates a service over `engine`.
    #[must_use]
    pub const fn new(engine: Arc<BalanceEngine>) -> Self {
        Self { engine }
    }

    /// Records a transaction and resyncs the balance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for a non-positive amount; store failures
    /// propagate.
    pub async fn create(&self, input: NewTransaction) -> Result<MutationOutcome, FinanceError> {
        ensure_positive(input.amount)?;

        let now = self.engine.clock().now();
        let record = self.engine.ledger().insert(&input, now).await?;
        info!(
            kind = %record.kind,
            id = %record.id,
            date = %record.date,
            amount = %record.amount,
            "Transaction recorded"
        );

        let sync = self
            .engine
            .sync_balance_after_transaction(record.date, SyncOperation::Create)
            .await?;
        Ok(MutationOutcome { record, sync })
    }

    /// Applies `changes` to an existing transaction and resyncs.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id and `InvalidAmount` for a
    /// non-positive amount; store failures propagate.
    pub async fn update(
        &self,
        kind: TransactionKind,
        id: TransactionId,
        changes: TransactionChanges,
    ) -> Result<UpdateOutcome, FinanceError> {
        let ledger = self.engine.ledger();
        let previous = ledger
            .find(kind, id)
            .await?
            .ok_or(FinanceError::NotFound { kind, id })?;

        if let Some(amount) = changes.amount {
            ensure_positive(amount)?;
        }

        let now = self.engine.clock().now();
        let record = ledger
            .update(kind, id, &changes, now)
            .await?
            .ok_or(FinanceError::NotFound { kind, id })?;
        info!(
            %kind,
            %id,
            old_date = %previous.date,
            new_date = %record.date,
            "Transaction updated"
        );

        let affected_dates = self
            .engine
            .smart_invalidate_cache(&previous, Some(&record))
            .await?;
        let sync = self.engine.recompute_for(SyncOperation::Update).await?;

        Ok(UpdateOutcome {
            previous,
            record,
            sync,
            affected_dates,
        })
    }

    /// Removes a transaction and resyncs.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id; store failures propagate.
    pub async fn delete(
        &self,
        kind: TransactionKind,
        id: TransactionId,
    ) -> Result<DeleteOutcome, FinanceError> {
        let ledger = self.engine.ledger();
        let deleted_record = ledger
            .find(kind, id)
            .await?
            .ok_or(FinanceError::NotFound { kind, id })?;

        if !ledger.delete(kind, id).await? {
            return Err(FinanceError::NotFound { kind, id });
        }
        info!(%kind, %id, date = %deleted_record.date, "Transaction deleted");

        let sync = self
            .engine
            .sync_balance_after_transaction(deleted_record.date, SyncOperation::Delete)
            .await?;
        Ok(DeleteOutcome {
            deleted_record,
            sync,
        })
    }

    /// Looks up a transaction.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id; store failures propagate.
    pub async fn get(
        &self,
        kind: TransactionKind,
        id: TransactionId,
    ) -> Result<LedgerTransaction, FinanceError> {
        self.engine
            .ledger()
            .find(kind, id)
            .await?
            .ok_or(FinanceError::NotFound { kind, id })
    }
}
