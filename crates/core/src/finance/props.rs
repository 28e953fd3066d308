//! Property-based tests for balance recomputation, period aggregation,
//! invalidation, and the point-in-time cache.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use mizan_shared::types::TransactionId;

use super::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
}

fn setup() -> (Arc<InMemoryFinanceStore>, Arc<BalanceEngine>) {
    let store = Arc::new(InMemoryFinanceStore::new());
    let engine = Arc::new(BalanceEngine::new(
        FinanceStores::from_backend(store.clone()),
        EngineSettings::default(),
    ));
    (store, engine)
}

fn kind_of(income: bool) -> TransactionKind {
    if income {
        TransactionKind::Income
    } else {
        TransactionKind::Expense
    }
}

#[derive(Debug, Clone)]
enum Op {
    Create { income: bool, offset: i64, amount: i64 },
    Update { pick: usize, offset: Option<i64>, amount: Option<i64> },
    Delete { pick: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<bool>(), 0i64..366, 1i64..1_000_000)
            .prop_map(|(income, offset, amount)| Op::Create { income, offset, amount }),
        1 => (any::<usize>(), prop::option::of(0i64..366), prop::option::of(1i64..1_000_000))
            .prop_map(|(pick, offset, amount)| Op::Update { pick, offset, amount }),
        1 => any::<usize>().prop_map(|pick| Op::Delete { pick }),
    ]
}

fn entry_strategy() -> impl Strategy<Value = (bool, i64, i64)> {
    (any::<bool>(), 0i64..366, 1i64..1_000_000)
}

async fn seed(store: &InMemoryFinanceStore, entries: &[(bool, i64, i64)]) {
    for &(income, offset, amount) in entries {
        let input = NewTransaction {
            kind: if income {
                TransactionKind::Income
            } else {
                TransactionKind::Expense
            },
            date: day(offset),
            amount: Decimal::from(amount),
            description: None,
        };
        store.insert(&input, chrono::Utc::now()).await.unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Ledger identity and post-mutation consistency: after every façade
    /// call the balance equals an independent fold over the ledger.
    #[test]
    fn prop_balance_matches_ledger_after_every_mutation(
        ops in prop::collection::vec(op_strategy(), 1..30),
    ) {
        runtime().block_on(async {
            let (_store, engine) = setup();
            let service = TransactionService::new(engine.clone());
            let mut model: HashMap<TransactionId, (TransactionKind, Decimal)> = HashMap::new();
            let mut ids: Vec<(TransactionKind, TransactionId)> = Vec::new();

            for op in ops {
                match op {
                    Op::Create { income, offset, amount } => {
                        let kind = kind_of(income);
                        let outcome = service
                            .create(NewTransaction {
                                kind,
                                date: day(offset),
                                amount: Decimal::from(amount),
                                description: None,
                            })
                            .await
                            .unwrap();
                        model.insert(outcome.record.id, (kind, outcome.record.amount));
                        ids.push((kind, outcome.record.id));
                    }
                    Op::Update { pick, offset, amount } => {
                        if ids.is_empty() {
                            continue;
                        }
                        let (kind, id) = ids[pick % ids.len()];
                        let changes = TransactionChanges {
                            date: offset.map(day),
                            amount: amount.map(Decimal::from),
                            description: None,
                        };
                        let outcome = service.update(kind, id, changes).await.unwrap();
                        model.insert(id, (kind, outcome.record.amount));
                    }
                    Op::Delete { pick } => {
                        if ids.is_empty() {
                            continue;
                        }
                        let (kind, id) = ids.remove(pick % ids.len());
                        service.delete(kind, id).await.unwrap();
                        model.remove(&id);
                    }
                }

                let expected: Decimal =
                    model.values().map(|(kind, amount)| kind.signed(*amount)).sum();
                assert_eq!(engine.compute_actual_balance().await.unwrap(), expected);
                assert!(engine.validate_balance_consistency().await.unwrap().is_consistent);
            }
        });
    }

    /// A period's closing balance equals the point-in-time balance of the
    /// following day.
    #[test]
    fn prop_period_end_matches_point_in_time(
        entries in prop::collection::vec(entry_strategy(), 0..40),
        start in 0i64..366,
        len in 0i64..120,
    ) {
        runtime().block_on(async {
            let (store, engine) = setup();
            seed(&store, &entries).await;
            let aggregator = PeriodAggregator::new(engine.clone());

            let (start, end) = (day(start), day(start + len));
            let summary = aggregator.get_balance_in_period(start, end, true).await.unwrap();
            let after = engine
                .get_balance_before_date(end + Duration::days(1), false)
                .await
                .unwrap();

            assert_eq!(summary.balance_end, after);
            assert_eq!(summary.balance_end, summary.balance_start + summary.net_change);
        });
    }

    /// After invalidating for `d`, only rows entirely before `d` survive,
    /// and every such row survives.
    #[test]
    fn prop_invalidation_removes_exactly_affected_rows(
        months in prop::collection::btree_set(1u32..=12, 1..12),
        change in 0i64..366,
    ) {
        runtime().block_on(async {
            let (store, engine) = setup();
            let aggregator = PeriodAggregator::new(engine.clone());
            for month in &months {
                let key = PeriodKey::monthly(2024, *month).unwrap();
                let (start, end) = key.date_range().unwrap();
                aggregator.save_period_balance(key, start, end, false).await.unwrap();
            }

            let change = day(change);
            let expected_survivors: Vec<u32> = months
                .iter()
                .copied()
                .filter(|m| {
                    let (_, end) = PeriodKey::monthly(2024, *m).unwrap().date_range().unwrap();
                    end < change
                })
                .collect();

            let result = engine.invalidate_cache(change).await.unwrap();
            let remaining = store.list().await.unwrap();

            assert_eq!(result.invalidated_count as usize, months.len() - expected_survivors.len());
            for row in &remaining {
                assert!(row.start_date < change && row.end_date < change);
            }
            let mut surviving: Vec<u32> = remaining.iter().filter_map(|r| r.key.month).collect();
            surviving.sort_unstable();
            assert_eq!(surviving, expected_survivors);
        });
    }

    /// Cached and uncached point-in-time lookups agree, including after
    /// mutations through the façade.
    #[test]
    fn prop_cached_point_in_time_matches_uncached(
        before in prop::collection::vec(entry_strategy(), 0..20),
        after in prop::collection::vec(entry_strategy(), 0..10),
        query_days in prop::collection::vec(0i64..400, 1..10),
    ) {
        runtime().block_on(async {
            let (store, engine) = setup();
            seed(&store, &before).await;
            let service = TransactionService::new(engine.clone());

            for &query_day in &query_days {
                let query_day = day(query_day);
                let cached = engine.get_balance_before_date(query_day, true).await.unwrap();
                let direct = engine.get_balance_before_date(query_day, false).await.unwrap();
                assert_eq!(cached, direct);
            }

            for &(income, offset, amount) in &after {
                service
                    .create(NewTransaction {
                        kind: kind_of(income),
                        date: day(offset),
                        amount: Decimal::from(amount),
                        description: None,
                    })
                    .await
                    .unwrap();
            }

            for &query_day in &query_days {
                let query_day = day(query_day);
                let cached = engine.get_balance_before_date(query_day, true).await.unwrap();
                let direct = engine.get_balance_before_date(query_day, false).await.unwrap();
                assert_eq!(cached, direct, "query_day {query_day} (day {})", query_day.ordinal());
            }
        });
    }
}
