//! Mosque finance ledger and balance reconciliation.
//!
//! The ledger (incomes and expenses) is the only source of truth. Everything
//! else here is derived from it and can be rebuilt at any time:
//!
//! - the stored current balance, recomputed in full after every mutation
//! - cached period balances (weekly, monthly, yearly), deleted whenever a
//!   change could have altered them
//! - an in-process cache of "balance before day D" values
//!
//! [`engine::BalanceEngine`] owns recomputation and invalidation,
//! [`period::PeriodAggregator`] computes and caches period summaries, and
//! [`transactions::TransactionService`] wraps ledger writes so they are
//! always followed by a resync.

pub mod cache;
pub mod calendar;
pub mod clock;
pub mod engine;
pub mod error;
pub mod invalidation;
pub mod memory;
pub mod period;
pub mod reports;
pub mod store;
pub mod transactions;
pub mod types;

#[cfg(test)]
mod props;

pub use cache::BalanceCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{BalanceEngine, EngineSettings};
pub use error::FinanceError;
pub use memory::InMemoryFinanceStore;
pub use period::PeriodAggregator;
pub use reports::{PeriodReport, ReportService, ReportTotals, YearlyReport};
pub use store::{
    BalanceStore, DateFilter, FinanceStores, LedgerStore, PeriodCacheStore, StoreError,
};
pub use transactions::{DeleteOutcome, MutationOutcome, TransactionService, UpdateOutcome};
pub use types::*;
