//! Balance engine: authoritative balance, the stored balance singleton, and
//! period-cache invalidation.
//!
//! The current balance is always recomputed from the full ledger. This is
//! O(ledger) per call and cannot drift through missed or doubled deltas.
//! The point-in-time cache only serves period reports; it never backs the
//! current balance.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use mizan_shared::FinanceConfig;

use super::cache::BalanceCache;
use super::clock::{Clock, SystemClock};
use super::error::FinanceError;
use super::invalidation::{affected_dates, unique_days};
use super::store::{BalanceStore, DateFilter, FinanceStores, LedgerStore, PeriodCacheStore};
use super::types::{
    ConsistencyReport, HealthReport, HealthStatus, InvalidationResult, LedgerTransaction,
    SyncOperation, SyncResult, TransactionKind,
};

/// Tunables for the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Lifetime of a point-in-time cache entry.
    pub balance_cache_ttl: Duration,
    /// Maximum number of cached days.
    pub balance_cache_capacity: u64,
    /// Default maximum age of a cached period row.
    pub period_max_age: Duration,
    /// Exclusive bound on `|stored - recomputed|` for a consistent balance.
    pub consistency_tolerance: Decimal,
    /// Widest yearly report accepted, in calendar years.
    pub max_report_years: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&FinanceConfig::default())
    }
}

impl From<&FinanceConfig> for EngineSettings {
    fn from(config: &FinanceConfig) -> Self {
        Self {
            balance_cache_ttl: seconds(config.balance_cache_ttl_secs),
            balance_cache_capacity: config.balance_cache_capacity,
            period_max_age: seconds(config.period_max_age_secs),
            consistency_tolerance: config.consistency_tolerance,
            max_report_years: config.max_report_years,
        }
    }
}

fn seconds(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// Computes and reconciles the ledger balance.
pub struct BalanceEngine {
    ledger: Arc<dyn LedgerStore>,
    balance: Arc<dyn BalanceStore>,
    periods: Arc<dyn PeriodCacheStore>,
    cache: BalanceCache,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl BalanceEngine {
    /// Creates an engine over `stores` using the system clock.
    #[must_use]
    pub fn new(stores: FinanceStores, settings: EngineSettings) -> Self {
        Self::with_clock(stores, settings, Arc::new(SystemClock))
    }

    /// Creates an engine with an explicit clock.
    #[must_use]
    pub fn with_clock(
        stores: FinanceStores,
        settings: EngineSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache =
            BalanceCache::with_config(settings.balance_cache_capacity, settings.balance_cache_ttl);
        Self {
            ledger: stores.ledger,
            balance: stores.balance,
            periods: stores.periods,
            cache,
            clock,
            settings,
        }
    }

    pub(crate) fn ledger(&self) -> &dyn LedgerStore {
        self.ledger.as_ref()
    }

    pub(crate) fn periods(&self) -> &dyn PeriodCacheStore {
        self.periods.as_ref()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Engine tunables.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Sums income minus expense over every ledger record and writes the
    /// result to the balance singleton.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub async fn compute_actual_balance(&self) -> Result<Decimal, FinanceError> {
        let (total_income, total_expense) = tokio::try_join!(
            self.ledger.sum(TransactionKind::Income, DateFilter::All),
            self.ledger.sum(TransactionKind::Expense, DateFilter::All),
        )?;
        let actual = total_income - total_expense;

        self.balance.save(actual, self.clock.now()).await?;

        debug!(
            balance = %actual,
            total_income = %total_income,
            total_expense = %total_expense,
            "Calculated actual balance"
        );
        Ok(actual)
    }

    /// Current balance; always a full recomputation.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub async fn get_current_balance(&self) -> Result<Decimal, FinanceError> {
        self.compute_actual_balance().await
    }

    /// Ledger balance from records dated strictly before `date`.
    ///
    /// With `use_cache`, a fresh cached value for the day is returned as is,
    /// and a computed value is cached.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub async fn get_balance_before_date(
        &self,
        date: NaiveDate,
        use_cache: bool,
    ) -> Result<Decimal, FinanceError> {
        if use_cache {
            if let Some(cached) = self.cache.get(date, self.clock.now()) {
                debug!(%date, balance = %cached, "Using cached balance before date");
                return Ok(cached);
            }
        }

        let filter = DateFilter::Before(date);
        let (income_before, expense_before) = tokio::try_join!(
            self.ledger.sum(TransactionKind::Income, filter),
            self.ledger.sum(TransactionKind::Expense, filter),
        )?;
        let balance = income_before - expense_before;

        if use_cache {
            self.cache.set(date, balance, self.clock.now());
        }
        Ok(balance)
    }

    /// Deletes every cached period a change on `date` could affect, drops the
    /// point-in-time entries whose prefix includes `date`, then recomputes the
    /// current balance.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub async fn invalidate_cache(
        &self,
        date: NaiveDate,
    ) -> Result<InvalidationResult, FinanceError> {
        let evicted = self.cache.evict_after(date);
        let invalidated_count = self.periods.delete_affected(date).await?;
        info!(%date, invalidated_count, evicted, "Invalidated cached periods");

        let balance = self.compute_actual_balance().await?;
        Ok(InvalidationResult {
            date,
            invalidated_count,
            balance,
        })
    }

    /// Invalidates for the old record's date and, when an update moved it,
    /// for the new date as well. Returns the dates invalidated.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub async fn smart_invalidate_cache(
        &self,
        old: &LedgerTransaction,
        new: Option<&LedgerTransaction>,
    ) -> Result<Vec<NaiveDate>, FinanceError> {
        let dates = affected_dates(old, new);
        for date in &dates {
            self.invalidate_cache(*date).await?;
        }
        Ok(dates)
    }

    /// Invalidates once per distinct day in `dates`. Returns the total
    /// number of period rows deleted.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub async fn bulk_invalidate_cache(&self, dates: &[NaiveDate]) -> Result<u64, FinanceError> {
        let days = unique_days(dates);
        let mut total = 0;
        for day in &days {
            total += self.invalidate_cache(*day).await?.invalidated_count;
        }
        info!(
            requested = dates.len(),
            unique = days.len(),
            invalidated = total,
            "Bulk invalidation completed"
        );
        Ok(total)
    }

    /// Invalidates for `date`, recomputes, and reports the new balance
    /// tagged with `operation`.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged; the mutation must then not be
    /// reported as synced.
    pub async fn sync_balance_after_transaction(
        &self,
        date: NaiveDate,
        operation: SyncOperation,
    ) -> Result<SyncResult, FinanceError> {
        self.invalidate_cache(date).await?;
        self.recompute_for(operation).await
    }

    /// Recomputes and wraps the result for `operation`. Callers must have
    /// invalidated the affected periods already.
    pub(crate) async fn recompute_for(
        &self,
        operation: SyncOperation,
    ) -> Result<SyncResult, FinanceError> {
        let balance = self.compute_actual_balance().await?;
        info!(%operation, balance = %balance, "Balance synced after transaction");

        Ok(SyncResult {
            success: true,
            balance,
            operation,
            message: format!("Balance updated after {operation}"),
            timestamp: self.clock.now(),
        })
    }

    /// Manual resync. Clears the point-in-time cache when asked (never the
    /// period rows) and recomputes.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub async fn sync_balance(&self, clear_cache: bool) -> Result<Decimal, FinanceError> {
        if clear_cache {
            self.cache.clear();
            debug!("Cleared point-in-time balance cache");
        }
        let balance = self.compute_actual_balance().await?;
        info!(balance = %balance, clear_cache, "Balance synced");
        Ok(balance)
    }

    /// Wipes every cache, including all period rows, and recomputes from
    /// scratch. Safe to call at any time.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub async fn repair_balance(&self) -> Result<Decimal, FinanceError> {
        self.cache.clear();
        let removed = self.periods.delete_all().await?;

        let balance = self.compute_actual_balance().await?;
        info!(balance = %balance, removed_periods = removed, "Balance repaired");
        Ok(balance)
    }

    /// Compares the stored balance with a full recomputation.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub async fn validate_balance_consistency(&self) -> Result<ConsistencyReport, FinanceError> {
        let stored = self.balance.load().await?;
        let actual_balance = self.compute_actual_balance().await?;

        let balance_in_db = stored.as_ref().map_or(Decimal::ZERO, |record| record.amount);
        let difference = balance_in_db - actual_balance;
        let is_consistent = difference.abs() < self.settings.consistency_tolerance;

        if !is_consistent {
            warn!(
                balance_in_db = %balance_in_db,
                actual_balance = %actual_balance,
                difference = %difference,
                "Stored balance diverged from ledger"
            );
        }

        Ok(ConsistencyReport {
            is_consistent,
            balance_in_db,
            actual_balance,
            difference,
            last_updated: stored.map(|record| record.updated_at),
            needs_sync: !is_consistent,
        })
    }

    /// Consistency plus record counts.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub async fn health_check(&self) -> Result<HealthReport, FinanceError> {
        let consistency = self.validate_balance_consistency().await?;
        let (total_incomes, total_expenses, cached_periods) = tokio::try_join!(
            self.ledger.count(TransactionKind::Income),
            self.ledger.count(TransactionKind::Expense),
            self.periods.count(),
        )?;

        let status = if consistency.is_consistent {
            HealthStatus::Healthy
        } else {
            HealthStatus::NeedsRepair
        };

        Ok(HealthReport {
            status,
            consistency,
            total_incomes,
            total_expenses,
            cached_periods,
            timestamp: self.clock.now(),
        })
    }
}

impl std::fmt::Debug for BalanceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceEngine")
            .field("cache", &self.cache)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
