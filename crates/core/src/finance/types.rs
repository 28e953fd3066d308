//! Domain types for the finance ledger and its derived balances.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mizan_shared::types::{PeriodBalanceId, TransactionId};

use super::error::FinanceError;

/// Which ledger a transaction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money received (donations, infaq, rental income, ...).
    Income,
    /// Money spent.
    Expense,
}

impl TransactionKind {
    /// Returns the lowercase name used in routes and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Sign applied to the amount when folding into a balance.
    #[must_use]
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Self::Income => amount,
            Self::Expense => -amount,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored income or expense record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Store-generated identifier.
    pub id: TransactionId,
    /// Income or expense.
    pub kind: TransactionKind,
    /// Day the transaction is attributed to. May be backdated.
    pub date: NaiveDate,
    /// Positive amount in whole rupiah.
    pub amount: Decimal,
    /// Optional free-text note.
    pub description: Option<String>,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
    /// When the record was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a new transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// Income or expense.
    pub kind: TransactionKind,
    /// Attributed day.
    pub date: NaiveDate,
    /// Must be strictly positive.
    pub amount: Decimal,
    /// Optional note.
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update of a transaction. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionChanges {
    /// New attributed day.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// New amount, must be strictly positive.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Replacement note. `Some(None)` (JSON `null`) clears it.
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
}

/// Distinguishes an explicit `null` from a missing field.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl TransactionChanges {
    /// Applies the changes to a copy of `record`.
    #[must_use]
    pub fn apply_to(&self, record: &LedgerTransaction, at: DateTime<Utc>) -> LedgerTransaction {
        LedgerTransaction {
            date: self.date.unwrap_or(record.date),
            amount: self.amount.unwrap_or(record.amount),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| record.description.clone()),
            updated_at: at,
            ..record.clone()
        }
    }
}

/// Validates the `amount > 0` ledger invariant.
pub(crate) fn ensure_positive(amount: Decimal) -> Result<(), FinanceError> {
    if amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(FinanceError::InvalidAmount(amount))
    }
}

/// The singleton stored balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    /// Signed balance: total income minus total expense.
    pub amount: Decimal,
    /// Time of the last recomputation.
    pub updated_at: DateTime<Utc>,
}

/// Granularity of a cached period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    /// Seven-day bucket within a month.
    Weekly,
    /// Calendar month.
    Monthly,
    /// Calendar year.
    Yearly,
}

impl PeriodType {
    /// Returns the lowercase name stored in the cache table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for PeriodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PeriodType {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(FinanceError::InvalidPeriodKey(format!(
                "unknown period type: {other}"
            ))),
        }
    }
}

/// Composite key of a cached period balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    /// Granularity.
    pub period_type: PeriodType,
    /// Calendar year.
    pub year: i32,
    /// Month 1-12, present for weekly and monthly periods.
    pub month: Option<u32>,
    /// Week of month 1-5, present for weekly periods.
    pub week: Option<u32>,
}

/// Aggregates over a date range, computed from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSummary {
    /// Ledger balance strictly before the range start.
    pub balance_start: Decimal,
    /// Income within the range.
    pub total_income: Decimal,
    /// Expense within the range.
    pub total_expense: Decimal,
    /// `balance_start + total_income - total_expense`.
    pub balance_end: Decimal,
    /// `total_income - total_expense`.
    pub net_change: Decimal,
    /// When the figures were computed.
    pub calculated_at: DateTime<Utc>,
    /// Whether the point-in-time cache was bypassed.
    pub is_real_time: bool,
}

impl PeriodSummary {
    /// Derives end balance and net change from the raw sums.
    #[must_use]
    pub fn from_totals(
        balance_start: Decimal,
        total_income: Decimal,
        total_expense: Decimal,
        calculated_at: DateTime<Utc>,
        is_real_time: bool,
    ) -> Self {
        let net_change = total_income - total_expense;
        Self {
            balance_start,
            total_income,
            total_expense,
            balance_end: balance_start + net_change,
            net_change,
            calculated_at,
            is_real_time,
        }
    }
}

/// A cached period balance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBalance {
    /// Row identifier. Kept stable across upserts of the same key.
    pub id: PeriodBalanceId,
    /// Composite cache key.
    #[serde(flatten)]
    pub key: PeriodKey,
    /// First day summarized (inclusive).
    pub start_date: NaiveDate,
    /// Last day summarized (inclusive).
    pub end_date: NaiveDate,
    /// Balance before `start_date`.
    pub balance_start: Decimal,
    /// Income within the range.
    pub total_income: Decimal,
    /// Expense within the range.
    pub total_expense: Decimal,
    /// Balance after `end_date`.
    pub balance_end: Decimal,
    /// Income minus expense within the range.
    pub net_change: Decimal,
    /// Whether the save that produced this row forced recalculation.
    pub is_real_time: bool,
    /// When the figures were computed.
    pub last_calculated_at: DateTime<Utc>,
    /// Freshness marker checked against the maximum age on read.
    pub updated_at: DateTime<Utc>,
}

impl PeriodBalance {
    /// Builds a row from a freshly computed summary.
    #[must_use]
    pub fn from_summary(
        key: PeriodKey,
        start_date: NaiveDate,
        end_date: NaiveDate,
        summary: &PeriodSummary,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PeriodBalanceId::new(),
            key,
            start_date,
            end_date,
            balance_start: summary.balance_start,
            total_income: summary.total_income,
            total_expense: summary.total_expense,
            balance_end: summary.balance_end,
            net_change: summary.net_change,
            is_real_time: summary.is_real_time,
            last_calculated_at: at,
            updated_at: at,
        }
    }

    /// Returns the cached figures in summary form.
    #[must_use]
    pub fn summary(&self) -> PeriodSummary {
        PeriodSummary {
            balance_start: self.balance_start,
            total_income: self.total_income,
            total_expense: self.total_expense,
            balance_end: self.balance_end,
            net_change: self.net_change,
            calculated_at: self.last_calculated_at,
            is_real_time: self.is_real_time,
        }
    }
}

/// Which mutation triggered a balance sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    /// A transaction was recorded.
    Create,
    /// A transaction was changed.
    Update,
    /// A transaction was removed.
    Delete,
}

impl SyncOperation {
    /// Returns the lowercase operation tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of resynchronizing the balance after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    /// Always true; failures are returned as errors instead.
    pub success: bool,
    /// Recomputed current balance.
    pub balance: Decimal,
    /// Operation that triggered the sync.
    pub operation: SyncOperation,
    /// Human-readable summary.
    pub message: String,
    /// When the sync completed.
    pub timestamp: DateTime<Utc>,
}

/// Result of invalidating cached periods for a change date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationResult {
    /// The change date used for the invalidation.
    pub date: NaiveDate,
    /// Number of period rows deleted.
    pub invalidated_count: u64,
    /// Balance recomputed right after the deletion.
    pub balance: Decimal,
}

/// Stored balance compared with a fresh recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// `|difference|` is below the tolerance.
    pub is_consistent: bool,
    /// Stored balance as read before recomputation; zero when absent.
    pub balance_in_db: Decimal,
    /// Balance recomputed from the full ledger.
    pub actual_balance: Decimal,
    /// `balance_in_db - actual_balance`.
    pub difference: Decimal,
    /// When the stored balance was last written, if ever.
    pub last_updated: Option<DateTime<Utc>>,
    /// Inverse of `is_consistent`.
    pub needs_sync: bool,
}

/// Overall state of the balance subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Stored balance matches the ledger.
    Healthy,
    /// Stored balance drifted; run a repair.
    NeedsRepair,
}

/// Health summary for operational endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Derived from the consistency check.
    pub status: HealthStatus,
    /// Consistency details.
    pub consistency: ConsistencyReport,
    /// Number of income records.
    pub total_incomes: u64,
    /// Number of expense records.
    pub total_expenses: u64,
    /// Number of cached period rows.
    pub cached_periods: u64,
    /// When the check ran.
    pub timestamp: DateTime<Utc>,
}
