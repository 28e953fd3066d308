//! PostgreSQL implementation of the finance store traits.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{debug, error};
use uuid::Uuid;

use mizan_core::finance::{
    BalanceRecord, BalanceStore, DateFilter, LedgerStore, LedgerTransaction, NewTransaction,
    PeriodBalance, PeriodCacheStore, PeriodKey, StoreError, TransactionChanges, TransactionKind,
};
use mizan_shared::types::{PeriodBalanceId, TransactionId};

use crate::entities::{balances, period_balances};

/// Maps a database error onto the core store error.
fn store_err(err: DbErr) -> StoreError {
    error!(error = %err, "Finance store query failed");
    StoreError::new(err.to_string())
}

fn to_column(value: u32, field: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::new(format!("{field} out of range: {value}")))
}

fn from_column(value: i32, field: &str) -> Result<u32, StoreError> {
    u32::try_from(value)
        .map_err(|_| StoreError::new(format!("stored {field} is negative: {value}")))
}

// Incomes and expenses share a shape; each table gets the same query set.
macro_rules! ledger_queries {
    ($module:ident, $kind:expr) => {
        mod $module {
            use super::*;
            use crate::entities::$module as table;

            fn to_domain(model: table::Model) -> LedgerTransaction {
                LedgerTransaction {
                    id: TransactionId::from_uuid(model.id),
                    kind: $kind,
                    date: model.date,
                    amount: model.amount,
                    description: model.description,
                    created_at: model.created_at.with_timezone(&Utc),
                    updated_at: model.updated_at.with_timezone(&Utc),
                }
            }

            fn date_condition(filter: DateFilter) -> Condition {
                match filter {
                    DateFilter::All => Condition::all(),
                    DateFilter::Before(limit) => {
                        Condition::all().add(table::Column::Date.lt(limit))
                    }
                    DateFilter::Between { start, end } => {
                        Condition::all().add(table::Column::Date.between(start, end))
                    }
                }
            }

            pub(super) async fn insert(
                db: &DatabaseConnection,
                input: &NewTransaction,
                at: DateTime<Utc>,
            ) -> Result<LedgerTransaction, DbErr> {
                let row = table::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    date: Set(input.date),
                    amount: Set(input.amount),
                    description: Set(input.description.clone()),
                    created_at: Set(at.into()),
                    updated_at: Set(at.into()),
                };
                Ok(to_domain(row.insert(db).await?))
            }

            pub(super) async fn find(
                db: &DatabaseConnection,
                id: TransactionId,
            ) -> Result<Option<LedgerTransaction>, DbErr> {
                Ok(table::Entity::find_by_id(id.into_inner())
                    .one(db)
                    .await?
                    .map(to_domain))
            }

            pub(super) async fn update(
                db: &DatabaseConnection,
                id: TransactionId,
                changes: &TransactionChanges,
                at: DateTime<Utc>,
            ) -> Result<Option<LedgerTransaction>, DbErr> {
                let Some(existing) = table::Entity::find_by_id(id.into_inner()).one(db).await?
                else {
                    return Ok(None);
                };

                let mut row: table::ActiveModel = existing.into();
                if let Some(date) = changes.date {
                    row.date = Set(date);
                }
                if let Some(amount) = changes.amount {
                    row.amount = Set(amount);
                }
                if let Some(description) = &changes.description {
                    row.description = Set(description.clone());
                }
                row.updated_at = Set(at.into());

                Ok(Some(to_domain(row.update(db).await?)))
            }

            pub(super) async fn delete(
                db: &DatabaseConnection,
                id: TransactionId,
            ) -> Result<bool, DbErr> {
                let result = table::Entity::delete_by_id(id.into_inner()).exec(db).await?;
                Ok(result.rows_affected > 0)
            }

            pub(super) async fn sum(
                db: &DatabaseConnection,
                filter: DateFilter,
            ) -> Result<Decimal, DbErr> {
                let total: Option<Option<Decimal>> = table::Entity::find()
                    .filter(date_condition(filter))
                    .select_only()
                    .column_as(Expr::col(table::Column::Amount).sum(), "total")
                    .into_tuple()
                    .one(db)
                    .await?;
                Ok(total.flatten().unwrap_or(Decimal::ZERO))
            }

            pub(super) async fn count(db: &DatabaseConnection) -> Result<u64, DbErr> {
                table::Entity::find().count(db).await
            }
        }
    };
}

ledger_queries!(incomes, TransactionKind::Income);
ledger_queries!(expenses, TransactionKind::Expense);

fn key_condition(key: &PeriodKey) -> Result<Condition, StoreError> {
    let mut condition = Condition::all()
        .add(period_balances::Column::PeriodType.eq(key.period_type.as_str()))
        .add(period_balances::Column::Year.eq(key.year));
    condition = match key.month {
        Some(month) => condition.add(period_balances::Column::Month.eq(to_column(month, "month")?)),
        None => condition.add(period_balances::Column::Month.is_null()),
    };
    condition = match key.week {
        Some(week) => condition.add(period_balances::Column::Week.eq(to_column(week, "week")?)),
        None => condition.add(period_balances::Column::Week.is_null()),
    };
    Ok(condition)
}

fn period_to_domain(model: period_balances::Model) -> Result<PeriodBalance, StoreError> {
    let key = PeriodKey {
        period_type: model
            .period_type
            .parse()
            .map_err(|_| StoreError::new(format!("unknown period type: {}", model.period_type)))?,
        year: model.year,
        month: model.month.map(|m| from_column(m, "month")).transpose()?,
        week: model.week.map(|w| from_column(w, "week")).transpose()?,
    };

    Ok(PeriodBalance {
        id: PeriodBalanceId::from_uuid(model.id),
        key,
        start_date: model.start_date,
        end_date: model.end_date,
        balance_start: model.balance_start,
        total_income: model.total_income,
        total_expense: model.total_expense,
        balance_end: model.balance_end,
        net_change: model.net_change,
        is_real_time: model.is_real_time,
        last_calculated_at: model.last_calculated_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

/// Ledger, balance singleton, and period cache on PostgreSQL.
#[derive(Debug, Clone)]
pub struct FinanceRepository {
    db: DatabaseConnection,
}

impl FinanceRepository {
    /// Creates a new finance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for FinanceRepository {
    async fn insert(
        &self,
        input: &NewTransaction,
        at: DateTime<Utc>,
    ) -> Result<LedgerTransaction, StoreError> {
        match input.kind {
            TransactionKind::Income => incomes::insert(&self.db, input, at).await,
            TransactionKind::Expense => expenses::insert(&self.db, input, at).await,
        }
        .map_err(store_err)
    }

    async fn find(
        &self,
        kind: TransactionKind,
        id: TransactionId,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        match kind {
            TransactionKind::Income => incomes::find(&self.db, id).await,
            TransactionKind::Expense => expenses::find(&self.db, id).await,
        }
        .map_err(store_err)
    }

    async fn update(
        &self,
        kind: TransactionKind,
        id: TransactionId,
        changes: &TransactionChanges,
        at: DateTime<Utc>,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        match kind {
            TransactionKind::Income => incomes::update(&self.db, id, changes, at).await,
            TransactionKind::Expense => expenses::update(&self.db, id, changes, at).await,
        }
        .map_err(store_err)
    }

    async fn delete(&self, kind: TransactionKind, id: TransactionId) -> Result<bool, StoreError> {
        match kind {
            TransactionKind::Income => incomes::delete(&self.db, id).await,
            TransactionKind::Expense => expenses::delete(&self.db, id).await,
        }
        .map_err(store_err)
    }

    async fn sum(&self, kind: TransactionKind, filter: DateFilter) -> Result<Decimal, StoreError> {
        match kind {
            TransactionKind::Income => incomes::sum(&self.db, filter).await,
            TransactionKind::Expense => expenses::sum(&self.db, filter).await,
        }
        .map_err(store_err)
    }

    async fn count(&self, kind: TransactionKind) -> Result<u64, StoreError> {
        match kind {
            TransactionKind::Income => incomes::count(&self.db).await,
            TransactionKind::Expense => expenses::count(&self.db).await,
        }
        .map_err(store_err)
    }
}

#[async_trait]
impl BalanceStore for FinanceRepository {
    async fn load(&self) -> Result<Option<BalanceRecord>, StoreError> {
        let row = balances::Entity::find_by_id(balances::SINGLETON_ID)
            .one(&self.db)
            .await
            .map_err(store_err)?;
        Ok(row.map(|model| BalanceRecord {
            amount: model.amount,
            updated_at: model.updated_at.with_timezone(&Utc),
        }))
    }

    async fn save(&self, amount: Decimal, at: DateTime<Utc>) -> Result<BalanceRecord, StoreError> {
        let row = balances::ActiveModel {
            id: Set(balances::SINGLETON_ID),
            amount: Set(amount),
            updated_at: Set(at.into()),
        };

        balances::Entity::insert(row)
            .on_conflict(
                OnConflict::column(balances::Column::Id)
                    .update_columns([balances::Column::Amount, balances::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(store_err)?;

        Ok(BalanceRecord {
            amount,
            updated_at: at,
        })
    }
}

#[async_trait]
impl PeriodCacheStore for FinanceRepository {
    async fn find(&self, key: &PeriodKey) -> Result<Option<PeriodBalance>, StoreError> {
        period_balances::Entity::find()
            .filter(key_condition(key)?)
            .one(&self.db)
            .await
            .map_err(store_err)?
            .map(period_to_domain)
            .transpose()
    }

    async fn upsert(&self, row: PeriodBalance) -> Result<PeriodBalance, StoreError> {
        let month = row.key.month.map(|m| to_column(m, "month")).transpose()?;
        let week = row.key.week.map(|w| to_column(w, "week")).transpose()?;
        let active = period_balances::ActiveModel {
            id: Set(row.id.into_inner()),
            period_type: Set(row.key.period_type.as_str().to_string()),
            year: Set(row.key.year),
            month: Set(month),
            week: Set(week),
            start_date: Set(row.start_date),
            end_date: Set(row.end_date),
            balance_start: Set(row.balance_start),
            total_income: Set(row.total_income),
            total_expense: Set(row.total_expense),
            balance_end: Set(row.balance_end),
            net_change: Set(row.net_change),
            is_real_time: Set(row.is_real_time),
            last_calculated_at: Set(row.last_calculated_at.into()),
            created_at: Set(row.updated_at.into()),
            updated_at: Set(row.updated_at.into()),
        };

        // Conflict target matches uq_period_balances_key (NULLS NOT DISTINCT);
        // an existing row keeps its id and created_at.
        let saved = period_balances::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([
                    period_balances::Column::PeriodType,
                    period_balances::Column::Year,
                    period_balances::Column::Month,
                    period_balances::Column::Week,
                ])
                .update_columns([
                    period_balances::Column::StartDate,
                    period_balances::Column::EndDate,
                    period_balances::Column::BalanceStart,
                    period_balances::Column::TotalIncome,
                    period_balances::Column::TotalExpense,
                    period_balances::Column::BalanceEnd,
                    period_balances::Column::NetChange,
                    period_balances::Column::IsRealTime,
                    period_balances::Column::LastCalculatedAt,
                    period_balances::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_with_returning(&self.db)
            .await
            .map_err(store_err)?;

        debug!(
            id = %saved.id,
            period_type = %saved.period_type,
            year = saved.year,
            "Period balance upserted"
        );
        period_to_domain(saved)
    }

    async fn delete_affected(&self, change_date: NaiveDate) -> Result<u64, StoreError> {
        let result = period_balances::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(period_balances::Column::StartDate.gte(change_date))
                    .add(period_balances::Column::EndDate.gte(change_date)),
            )
            .exec(&self.db)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = period_balances::Entity::delete_many()
            .exec(&self.db)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        period_balances::Entity::find()
            .count(&self.db)
            .await
            .map_err(store_err)
    }

    async fn list(&self) -> Result<Vec<PeriodBalance>, StoreError> {
        period_balances::Entity::find()
            .order_by_asc(period_balances::Column::StartDate)
            .order_by_asc(period_balances::Column::EndDate)
            .all(&self.db)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(period_to_domain)
            .collect()
    }
}
