//! Which cached periods a ledger change can affect.
//!
//! A change on day `d` shifts the totals of every period containing `d` and
//! the opening balance of every period after it. Rows are over-invalidated
//! rather than risk a stale one surviving.

use chrono::NaiveDate;

use super::types::LedgerTransaction;

/// Returns true if the cached row `[row_start, row_end]` must be dropped
/// after a change dated `change_date`.
///
/// This also covers rows that merely contain the date, since such a row
/// necessarily ends on or after it.
#[must_use]
pub fn is_affected(row_start: NaiveDate, row_end: NaiveDate, change_date: NaiveDate) -> bool {
    row_start >= change_date || row_end >= change_date
}

/// Dates to invalidate for a record before and after an update.
///
/// Always includes the old date; adds the new one only when it differs.
#[must_use]
pub fn affected_dates(old: &LedgerTransaction, new: Option<&LedgerTransaction>) -> Vec<NaiveDate> {
    let mut dates = vec![old.date];
    if let Some(new) = new {
        if new.date != old.date {
            dates.push(new.date);
        }
    }
    dates
}

/// Sorts and deduplicates change dates for bulk invalidation.
#[must_use]
pub fn unique_days(dates: &[NaiveDate]) -> Vec<NaiveDate> {
    let mut days = dates.to_vec();
    days.sort_unstable();
    days.dedup();
    days
}
