//! In-process implementation of the store traits.
//!
//! Backs the engine in tests and local tooling. [`InMemoryFinanceStore::set_failing`]
//! makes every call fail with a [`StoreError`], for exercising error paths.
//! [`InMemoryFinanceStore::set_periods_failing`] fails only the period cache,
//! so a mutation can land in the ledger and then fail part way through.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;

use mizan_shared::types::TransactionId;

use super::invalidation::is_affected;
use super::store::{BalanceStore, DateFilter, LedgerStore, PeriodCacheStore, StoreError};
use super::types::{
    BalanceRecord, LedgerTransaction, NewTransaction, PeriodBalance, PeriodKey,
    TransactionChanges, TransactionKind,
};

/// Ledger, balance, and period cache held in memory.
#[derive(Debug, Default)]
pub struct InMemoryFinanceStore {
    transactions: DashMap<(TransactionKind, TransactionId), LedgerTransaction>,
    balance: RwLock<Option<BalanceRecord>>,
    periods: DashMap<PeriodKey, PeriodBalance>,
    failing: AtomicBool,
    periods_failing: AtomicBool,
}

impl InMemoryFinanceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// When `failing` is set, every subsequent call returns a store error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// When set, period cache calls fail while the ledger and balance keep
    /// working.
    pub fn set_periods_failing(&self, failing: bool) {
        self.periods_failing.store(failing, Ordering::SeqCst);
    }

    /// Overwrites the stored balance without touching the ledger.
    pub fn corrupt_balance(&self, amount: Decimal, at: DateTime<Utc>) {
        *self.balance.write().unwrap_or_else(PoisonError::into_inner) =
            Some(BalanceRecord { amount, updated_at: at });
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::new("in-memory store is set to fail"))
        } else {
            Ok(())
        }
    }

    fn check_periods(&self) -> Result<(), StoreError> {
        self.check()?;
        if self.periods_failing.load(Ordering::SeqCst) {
            Err(StoreError::new("in-memory period cache is set to fail"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryFinanceStore {
    async fn insert(
        &self,
        input: &NewTransaction,
        at: DateTime<Utc>,
    ) -> Result<LedgerTransaction, StoreError> {
        self.check()?;
        let record = LedgerTransaction {
            id: TransactionId::new(),
            kind: input.kind,
            date: input.date,
            amount: input.amount,
            description: input.description.clone(),
            created_at: at,
            updated_at: at,
        };
        self.transactions
            .insert((record.kind, record.id), record.clone());
        Ok(record)
    }

    async fn find(
        &self,
        kind: TransactionKind,
        id: TransactionId,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        self.check()?;
        Ok(self.transactions.get(&(kind, id)).map(|r| r.value().clone()))
    }

    async fn update(
        &self,
        kind: TransactionKind,
        id: TransactionId,
        changes: &TransactionChanges,
        at: DateTime<Utc>,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        self.check()?;
        Ok(self.transactions.get_mut(&(kind, id)).map(|mut entry| {
            let updated = changes.apply_to(entry.value(), at);
            *entry.value_mut() = updated.clone();
            updated
        }))
    }

    async fn delete(&self, kind: TransactionKind, id: TransactionId) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.transactions.remove(&(kind, id)).is_some())
    }

    async fn sum(&self, kind: TransactionKind, filter: DateFilter) -> Result<Decimal, StoreError> {
        self.check()?;
        Ok(self
            .transactions
            .iter()
            .filter(|entry| entry.kind == kind && filter.matches(entry.date))
            .map(|entry| entry.amount)
            .sum())
    }

    async fn count(&self, kind: TransactionKind) -> Result<u64, StoreError> {
        self.check()?;
        let count = self.transactions.iter().filter(|e| e.kind == kind).count();
        Ok(count as u64)
    }
}

#[async_trait]
impl BalanceStore for InMemoryFinanceStore {
    async fn load(&self) -> Result<Option<BalanceRecord>, StoreError> {
        self.check()?;
        Ok(self
            .balance
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn save(&self, amount: Decimal, at: DateTime<Utc>) -> Result<BalanceRecord, StoreError> {
        self.check()?;
        let record = BalanceRecord {
            amount,
            updated_at: at,
        };
        *self.balance.write().unwrap_or_else(PoisonError::into_inner) = Some(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl PeriodCacheStore for InMemoryFinanceStore {
    async fn find(&self, key: &PeriodKey) -> Result<Option<PeriodBalance>, StoreError> {
        self.check_periods()?;
        Ok(self.periods.get(key).map(|r| r.value().clone()))
    }

    async fn upsert(&self, mut row: PeriodBalance) -> Result<PeriodBalance, StoreError> {
        self.check_periods()?;
        let mut entry = self.periods.entry(row.key).or_insert_with(|| row.clone());
        row.id = entry.id;
        *entry = row.clone();
        Ok(row)
    }

    async fn delete_affected(&self, change_date: NaiveDate) -> Result<u64, StoreError> {
        self.check_periods()?;
        let affected: Vec<PeriodKey> = self
            .periods
            .iter()
            .filter(|e| is_affected(e.start_date, e.end_date, change_date))
            .map(|e| *e.key())
            .collect();

        let removed = affected
            .iter()
            .filter(|key| self.periods.remove(key).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        self.check_periods()?;
        let removed = self.periods.len();
        self.periods.clear();
        Ok(removed as u64)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.check_periods()?;
        Ok(self.periods.len() as u64)
    }

    async fn list(&self) -> Result<Vec<PeriodBalance>, StoreError> {
        self.check_periods()?;
        let mut rows: Vec<PeriodBalance> = self.periods.iter().map(|e| e.value().clone()).collect();
        rows.sort_by_key(|row| (row.start_date, row.end_date));
        Ok(rows)
    }
}
