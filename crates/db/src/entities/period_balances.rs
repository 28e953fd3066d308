//! `SeaORM` Entity for period_balances table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "period_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub period_type: String,
    pub year: i32,
    pub month: Option<i32>,
    pub week: Option<i32>,
    pub start_date: Date,
    pub end_date: Date,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub balance_start: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_income: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_expense: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub balance_end: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub net_change: Decimal,
    pub is_real_time: bool,
    pub last_calculated_at: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
