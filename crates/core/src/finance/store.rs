//! Storage seams for the ledger, the balance singleton, and the period cache.
//!
//! The engine only talks to these traits. `mizan-db` implements them on
//! PostgreSQL; [`super::memory::InMemoryFinanceStore`] implements them for
//! tests and local tooling.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use mizan_shared::types::TransactionId;

use super::types::{
    BalanceRecord, LedgerTransaction, NewTransaction, PeriodBalance, PeriodKey,
    TransactionChanges, TransactionKind,
};

/// Failure reported by a backing store (connection loss, timeout, query error).
#[derive(Debug, Clone, Error)]
#[error("Store failure: {message}")]
pub struct StoreError {
    message: String,
}

impl StoreError {
    /// Creates a store error with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Date restriction for ledger sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    /// Every record.
    All,
    /// Records dated strictly before the given day.
    Before(NaiveDate),
    /// Records dated within the inclusive range.
    Between {
        /// First day (inclusive).
        start: NaiveDate,
        /// Last day (inclusive).
        end: NaiveDate,
    },
}

impl DateFilter {
    /// Returns true if a record dated `date` passes the filter.
    #[must_use]
    pub fn matches(self, date: NaiveDate) -> bool {
        match self {
            Self::All => true,
            Self::Before(limit) => date < limit,
            Self::Between { start, end } => start <= date && date <= end,
        }
    }
}

/// Durable income and expense records.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Writes a new record; the store assigns its id.
    async fn insert(
        &self,
        input: &NewTransaction,
        at: DateTime<Utc>,
    ) -> Result<LedgerTransaction, StoreError>;

    /// Looks up a record by id.
    async fn find(
        &self,
        kind: TransactionKind,
        id: TransactionId,
    ) -> Result<Option<LedgerTransaction>, StoreError>;

    /// Applies changes; returns `None` if the id does not exist.
    async fn update(
        &self,
        kind: TransactionKind,
        id: TransactionId,
        changes: &TransactionChanges,
        at: DateTime<Utc>,
    ) -> Result<Option<LedgerTransaction>, StoreError>;

    /// Removes a record; returns whether it existed.
    async fn delete(&self, kind: TransactionKind, id: TransactionId) -> Result<bool, StoreError>;

    /// Sums amounts of one kind, zero when nothing matches.
    async fn sum(&self, kind: TransactionKind, filter: DateFilter) -> Result<Decimal, StoreError>;

    /// Counts records of one kind.
    async fn count(&self, kind: TransactionKind) -> Result<u64, StoreError>;
}

/// The singleton current-balance record.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Reads the record, if it was ever written.
    async fn load(&self) -> Result<Option<BalanceRecord>, StoreError>;

    /// Creates or overwrites the record.
    async fn save(&self, amount: Decimal, at: DateTime<Utc>) -> Result<BalanceRecord, StoreError>;
}

/// Cached period balances keyed by [`PeriodKey`].
#[async_trait]
pub trait PeriodCacheStore: Send + Sync {
    /// Looks up the row for `key`.
    async fn find(&self, key: &PeriodKey) -> Result<Option<PeriodBalance>, StoreError>;

    /// Inserts the row, or replaces every field of the row with the same key.
    /// An existing row keeps its id.
    async fn upsert(&self, row: PeriodBalance) -> Result<PeriodBalance, StoreError>;

    /// Deletes every row a change on `change_date` could affect
    /// (see [`super::invalidation::is_affected`]); returns the count.
    async fn delete_affected(&self, change_date: NaiveDate) -> Result<u64, StoreError>;

    /// Deletes every row; returns the count.
    async fn delete_all(&self) -> Result<u64, StoreError>;

    /// Counts cached rows.
    async fn count(&self) -> Result<u64, StoreError>;

    /// Returns every cached row.
    async fn list(&self) -> Result<Vec<PeriodBalance>, StoreError>;
}

/// The three stores the engine works against.
#[derive(Clone)]
pub struct FinanceStores {
    /// Income and expense records.
    pub ledger: Arc<dyn LedgerStore>,
    /// Current-balance singleton.
    pub balance: Arc<dyn BalanceStore>,
    /// Period cache rows.
    pub periods: Arc<dyn PeriodCacheStore>,
}

impl FinanceStores {
    /// Uses one backend for all three stores.
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: LedgerStore + BalanceStore + PeriodCacheStore + 'static,
    {
        Self {
            ledger: backend.clone(),
            balance: backend.clone(),
            periods: backend,
        }
    }
}

impl std::fmt::Debug for FinanceStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinanceStores").finish_non_exhaustive()
    }
}
