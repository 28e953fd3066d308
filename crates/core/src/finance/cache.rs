//! In-process point-in-time balance cache using Moka.
//!
//! Maps a calendar day to the ledger balance strictly before it. Entries
//! expire after a fixed lifetime, checked on read against the caller's
//! clock; Moka's own TTL only reclaims memory. A ledger change on day `d`
//! evicts every entry for a day after `d`.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use moka::sync::Cache;
use rust_decimal::Decimal;

/// Default cache capacity (number of days).
const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Default lifetime of an entry (1 hour).
const DEFAULT_TTL_SECS: i64 = 3600;

/// Longest lifetime handed to Moka for reclamation (Moka rejects huge TTLs).
const MAX_RECLAIM_TTL: std::time::Duration = std::time::Duration::from_secs(365 * 24 * 3600);

#[derive(Debug, Clone, Copy)]
struct CachedBalance {
    amount: Decimal,
    cached_at: DateTime<Utc>,
}

/// Cache of balances before a given day.
#[derive(Clone)]
pub struct BalanceCache {
    cache: Cache<NaiveDate, CachedBalance>,
    ttl: Duration,
}

impl BalanceCache {
    /// Creates a cache with default settings: 10 000 days, 1 hour lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, Duration::seconds(DEFAULT_TTL_SECS))
    }

    /// Creates a cache with custom capacity and entry lifetime.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl: Duration) -> Self {
        let mut builder = Cache::builder().max_capacity(max_capacity);
        if let Ok(std_ttl) = ttl.to_std() {
            if std_ttl <= MAX_RECLAIM_TTL {
                builder = builder.time_to_live(std_ttl);
            }
        }

        Self {
            cache: builder.build(),
            ttl,
        }
    }

    /// Returns the cached balance before `day`, unless missing or expired
    /// as of `now`.
    #[must_use]
    pub fn get(&self, day: NaiveDate, now: DateTime<Utc>) -> Option<Decimal> {
        let entry = self.cache.get(&day)?;
        if now - entry.cached_at >= self.ttl {
            self.cache.invalidate(&day);
            return None;
        }
        Some(entry.amount)
    }

    /// Stores the balance before `day`, computed at `now`.
    pub fn set(&self, day: NaiveDate, amount: Decimal, now: DateTime<Utc>) {
        self.cache.insert(
            day,
            CachedBalance {
                amount,
                cached_at: now,
            },
        );
    }

    /// Drops the entries whose prefix includes `changed`, that is every day
    /// strictly after it. Returns how many were dropped.
    pub fn evict_after(&self, changed: NaiveDate) -> u64 {
        let stale: Vec<NaiveDate> = self
            .cache
            .iter()
            .map(|(day, _)| *day)
            .filter(|day| *day > changed)
            .collect();
        for day in &stale {
            self.cache.invalidate(day);
        }
        stale.len() as u64
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    #[cfg(test)]
    fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BalanceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceCache")
            .field("entries", &self.cache.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}
