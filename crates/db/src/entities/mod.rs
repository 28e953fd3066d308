//! `SeaORM` entities for the finance schema.

pub mod balances;
pub mod expenses;
pub mod incomes;
pub mod period_balances;
