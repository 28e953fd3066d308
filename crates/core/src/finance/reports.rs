//! Weekly, monthly, and yearly reports over the period cache.
//!
//! Every report is cache-first: a fresh cached row is served as is, a miss
//! or a forced refresh recomputes from the ledger and writes the row back.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::FinanceError;
use super::period::PeriodAggregator;
use super::types::{PeriodKey, PeriodSummary};

/// Figures for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodReport {
    /// Cache key of the period.
    pub key: PeriodKey,
    /// First day covered (inclusive).
    pub start_date: NaiveDate,
    /// Last day covered (inclusive).
    pub end_date: NaiveDate,
    /// Balances and totals.
    pub summary: PeriodSummary,
    /// Whether the figures came from a cached row.
    pub from_cache: bool,
}

/// Totals across the years of a yearly report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    /// Balance before the first day of the range.
    pub balance_start: Decimal,
    /// Income within the range.
    pub total_income: Decimal,
    /// Expense within the range.
    pub total_expense: Decimal,
    /// Income minus expense within the range.
    pub net_change: Decimal,
    /// Balance after the last day of the range.
    pub balance_end: Decimal,
}

/// One entry per calendar year intersecting `[start, end]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlyReport {
    /// Requested range start.
    pub start: NaiveDate,
    /// Requested range end.
    pub end: NaiveDate,
    /// Per-year figures, oldest first.
    pub years: Vec<PeriodReport>,
    /// Aggregate over all years.
    pub totals: ReportTotals,
}

/// Generates period reports.
#[derive(Debug, Clone)]
pub struct ReportService {
    aggregator: PeriodAggregator,
}

impl ReportService {
    /// Creates a report service over `aggregator`.
    #[must_use]
    pub const fn new(aggregator: PeriodAggregator) -> Self {
        Self { aggregator }
    }

    /// Report for the weekly bucket containing `date`.
    ///
    /// # Errors
    ///
    /// Store failures propagate.
    pub async fn weekly(
        &self,
        date: NaiveDate,
        force_refresh: bool,
    ) -> Result<PeriodReport, FinanceError> {
        self.cached_period(PeriodKey::weekly_containing(date), force_refresh)
            .await
    }

    /// Report for the calendar month containing `date`.
    ///
    /// # Errors
    ///
    /// Store failures propagate.
    pub async fn monthly(
        &self,
        date: NaiveDate,
        force_refresh: bool,
    ) -> Result<PeriodReport, FinanceError> {
        self.cached_period(PeriodKey::monthly_containing(date), force_refresh)
            .await
    }

    /// Per-year report over `[start, end]`.
    ///
    /// Whole years go through the cache. A year clamped by the range is
    /// computed directly and not cached.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriod` when `start > end` or when the range spans
    /// more calendar years than the configured maximum; store failures
    /// propagate.
    pub async fn yearly(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        force_refresh: bool,
    ) -> Result<YearlyReport, FinanceError> {
        if start > end {
            return Err(FinanceError::InvalidPeriod { start, end });
        }
        let span = i64::from(end.year()) - i64::from(start.year()) + 1;
        if span > i64::from(self.aggregator.max_report_years()) {
            warn!(%start, %end, span, "Yearly report range too wide");
            return Err(FinanceError::InvalidPeriod { start, end });
        }

        let mut years = Vec::new();
        for year in start.year()..=end.year() {
            let key = PeriodKey::yearly(year);
            let (year_start, year_end) = key.date_range()?;
            let clamped_start = year_start.max(start);
            let clamped_end = year_end.min(end);

            let report = if clamped_start == year_start && clamped_end == year_end {
                self.cached_period(key, force_refresh).await?
            } else {
                let summary = self
                    .aggregator
                    .get_balance_in_period(clamped_start, clamped_end, force_refresh)
                    .await?;
                PeriodReport {
                    key,
                    start_date: clamped_start,
                    end_date: clamped_end,
                    summary,
                    from_cache: false,
                }
            };
            years.push(report);
        }

        let totals = totals_of(&years);
        Ok(YearlyReport {
            start,
            end,
            years,
            totals,
        })
    }

    async fn cached_period(
        &self,
        key: PeriodKey,
        force_refresh: bool,
    ) -> Result<PeriodReport, FinanceError> {
        let (start_date, end_date) = key.date_range()?;

        if !force_refresh {
            if let Some(row) = self.aggregator.get_period_balance(&key, None).await? {
                debug!(period_type = %key.period_type, year = key.year, "Serving cached period");
                return Ok(PeriodReport {
                    key,
                    start_date: row.start_date,
                    end_date: row.end_date,
                    summary: row.summary(),
                    from_cache: true,
                });
            }
        }

        let row = self
            .aggregator
            .save_period_balance(key, start_date, end_date, force_refresh)
            .await?;
        Ok(PeriodReport {
            key,
            start_date: row.start_date,
            end_date: row.end_date,
            summary: row.summary(),
            from_cache: false,
        })
    }
}

fn totals_of(years: &[PeriodReport]) -> ReportTotals {
    let total_income: Decimal = years.iter().map(|r| r.summary.total_income).sum();
    let total_expense: Decimal = years.iter().map(|r| r.summary.total_expense).sum();
    let balance_start = years
        .first()
        .map_or(Decimal::ZERO, |r| r.summary.balance_start);
    let net_change = total_income - total_expense;

    ReportTotals {
        balance_start,
        total_income,
        total_expense,
        net_change,
        balance_end: balance_start + net_change,
    }
}
