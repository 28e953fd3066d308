//! Finance schema migration.
//!
//! Creates the income and expense ledgers, the balance singleton, and the
//! period balance cache.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: LEDGER
        // ============================================================
        db.execute_unprepared(LEDGER_SQL).await?;

        // ============================================================
        // PART 2: DERIVED BALANCES
        // ============================================================
        db.execute_unprepared(BALANCES_SQL).await?;
        db.execute_unprepared(PERIOD_BALANCES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS period_balances, balances, expenses, incomes CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const LEDGER_SQL: &str = r"
CREATE TABLE incomes (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    date DATE NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_incomes_amount_positive CHECK (amount > 0)
);

CREATE TABLE expenses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    date DATE NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_expenses_amount_positive CHECK (amount > 0)
);

-- Prefix and range sums filter on date
CREATE INDEX idx_incomes_date ON incomes(date);
CREATE INDEX idx_expenses_date ON expenses(date);
";

const BALANCES_SQL: &str = r"
-- Singleton: the fixed key admits exactly one row
CREATE TABLE balances (
    id SMALLINT PRIMARY KEY DEFAULT 1,
    amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_balances_singleton CHECK (id = 1)
);
";

const PERIOD_BALANCES_SQL: &str = r"
CREATE TABLE period_balances (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    period_type VARCHAR(10) NOT NULL,
    year INTEGER NOT NULL,
    month INTEGER,
    week INTEGER,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    balance_start NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_income NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_expense NUMERIC(19, 4) NOT NULL DEFAULT 0,
    balance_end NUMERIC(19, 4) NOT NULL DEFAULT 0,
    net_change NUMERIC(19, 4) NOT NULL DEFAULT 0,
    is_real_time BOOLEAN NOT NULL DEFAULT false,
    last_calculated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_period_type CHECK (period_type IN ('weekly', 'monthly', 'yearly')),
    CONSTRAINT chk_period_range CHECK (start_date <= end_date),
    CONSTRAINT chk_period_month CHECK (month IS NULL OR month BETWEEN 1 AND 12),
    CONSTRAINT chk_period_week CHECK (week IS NULL OR week BETWEEN 1 AND 5)
);

-- One row per key; absent month/week compare equal
CREATE UNIQUE INDEX uq_period_balances_key
    ON period_balances(period_type, year, month, week) NULLS NOT DISTINCT;

-- Invalidation deletes by start/end date
CREATE INDEX idx_period_balances_start ON period_balances(start_date);
CREATE INDEX idx_period_balances_end ON period_balances(end_date);
";
