//! Balance reconciler for Mizan.
//!
//! Compares the stored balance with a full recomputation from the ledger,
//! repairs every cache when they disagree, and checks again. Exits non-zero
//! if the balance is still inconsistent afterwards.

use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mizan_core::finance::{
    BalanceEngine, DateFilter, EngineSettings, LedgerStore, TransactionKind,
};
use mizan_db::{connect_with, finance_stores};
use mizan_shared::{AppConfig, types::format_rupiah};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mizan=info,reconciler=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;

    let stores = finance_stores(db);
    let ledger = stores.ledger.clone();
    let engine = BalanceEngine::new(stores, EngineSettings::from(&config.finance));

    let total_income = ledger.sum(TransactionKind::Income, DateFilter::All).await?;
    let total_expense = ledger.sum(TransactionKind::Expense, DateFilter::All).await?;
    info!(
        total_income = %format_rupiah(total_income),
        total_expense = %format_rupiah(total_expense),
        incomes = ledger.count(TransactionKind::Income).await?,
        expenses = ledger.count(TransactionKind::Expense).await?,
        "Ledger totals"
    );

    let before = engine.validate_balance_consistency().await?;
    info!(
        stored = %format_rupiah(before.balance_in_db),
        calculated = %format_rupiah(before.actual_balance),
        difference = %before.difference,
        consistent = before.is_consistent,
        "Stored vs calculated balance"
    );

    if before.is_consistent {
        info!("Balance is consistent, nothing to repair");
        return Ok(ExitCode::SUCCESS);
    }

    warn!(difference = %before.difference, "Balance drifted, repairing");
    let repaired = engine.repair_balance().await?;
    info!(balance = %format_rupiah(repaired), "Repair finished");

    let after = engine.validate_balance_consistency().await?;
    if after.is_consistent {
        info!(balance = %format_rupiah(after.actual_balance), "Balance is consistent after repair");
        Ok(ExitCode::SUCCESS)
    } else {
        error!(
            stored = %after.balance_in_db,
            calculated = %after.actual_balance,
            difference = %after.difference,
            "Balance is still inconsistent after repair"
        );
        Ok(ExitCode::FAILURE)
    }
}
