//! Period aggregation and the persistent period-balance cache.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use super::engine::BalanceEngine;
use super::error::FinanceError;
use super::store::DateFilter;
use super::types::{PeriodBalance, PeriodKey, PeriodSummary, TransactionKind};

/// Computes period summaries and maintains cached period rows.
#[derive(Debug, Clone)]
pub struct PeriodAggregator {
    engine: Arc<BalanceEngine>,
}

impl PeriodAggregator {
    /// Creates an aggregator over `engine`.
    #[must_use]
    pub const fn new(engine: Arc<BalanceEngine>) -> Self {
        Self { engine }
    }

    pub(crate) fn max_report_years(&self) -> u32 {
        self.engine.settings().max_report_years
    }

    /// Summarizes the inclusive range `[start, end]`.
    ///
    /// The opening balance uses the point-in-time cache unless
    /// `force_recalculate` is set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriod` when `start > end`; store failures propagate.
    pub async fn get_balance_in_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        force_recalculate: bool,
    ) -> Result<PeriodSummary, FinanceError> {
        if start > end {
            return Err(FinanceError::InvalidPeriod { start, end });
        }

        let balance_start = self
            .engine
            .get_balance_before_date(start, !force_recalculate)
            .await?;

        let ledger = self.engine.ledger();
        let filter = DateFilter::Between { start, end };
        let (total_income, total_expense) = tokio::try_join!(
            ledger.sum(TransactionKind::Income, filter),
            ledger.sum(TransactionKind::Expense, filter),
        )?;

        let summary = PeriodSummary::from_totals(
            balance_start,
            total_income,
            total_expense,
            self.engine.clock().now(),
            force_recalculate,
        );

        debug!(
            %start,
            %end,
            balance_start = %summary.balance_start,
            balance_end = %summary.balance_end,
            force_recalculate,
            "Computed period balance"
        );
        Ok(summary)
    }

    /// Computes `[start, end]` and stores it under `key`, replacing any row
    /// with the same key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriodKey` for a malformed key, `InvalidPeriod` for a
    /// reversed range; store failures propagate.
    pub async fn save_period_balance(
        &self,
        key: PeriodKey,
        start: NaiveDate,
        end: NaiveDate,
        force_recalculate: bool,
    ) -> Result<PeriodBalance, FinanceError> {
        key.validate()?;
        let summary = self
            .get_balance_in_period(start, end, force_recalculate)
            .await?;

        let row = PeriodBalance::from_summary(key, start, end, &summary, self.engine.clock().now());
        let saved = self.engine.periods().upsert(row).await?;

        debug!(
            period_type = %key.period_type,
            year = key.year,
            month = ?key.month,
            week = ?key.week,
            "Saved period balance"
        );
        Ok(saved)
    }

    /// Returns the cached row for `key` unless it is missing or older than
    /// `max_age` (the configured default when `None`).
    ///
    /// `None` means "recompute", never zero.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriodKey` for a malformed key; store failures
    /// propagate.
    pub async fn get_period_balance(
        &self,
        key: &PeriodKey,
        max_age: Option<Duration>,
    ) -> Result<Option<PeriodBalance>, FinanceError> {
        key.validate()?;
        let Some(row) = self.engine.periods().find(key).await? else {
            return Ok(None);
        };

        let max_age = max_age.unwrap_or(self.engine.settings().period_max_age);
        let age = self.engine.clock().now() - row.updated_at;
        if age > max_age {
            debug!(
                period_type = %key.period_type,
                year = key.year,
                age_secs = age.num_seconds(),
                "Cached period balance is stale"
            );
            return Ok(None);
        }
        Ok(Some(row))
    }
}
