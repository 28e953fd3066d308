//! Mizan API Server
//!
//! Main entry point for the mosque finance backend.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mizan_api::{AppState, create_router};
use mizan_core::finance::{BalanceEngine, EngineSettings};
use mizan_db::{connect_with, finance_stores};
use mizan_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mizan=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_with(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let settings = EngineSettings::from(&config.finance);
    let engine = Arc::new(BalanceEngine::new(finance_stores(db), settings));

    // Drift is logged, not fatal.
    let report = engine.validate_balance_consistency().await?;
    if report.needs_sync {
        tracing::warn!(
            balance_in_db = %report.balance_in_db,
            actual_balance = %report.actual_balance,
            "Stored balance drifted from ledger; run the reconciler or POST /api/v1/finance/cache/clear"
        );
    }

    let app = create_router(AppState::new(engine));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
