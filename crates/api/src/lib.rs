//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for the finance ledger, balance, cache, and reports
//! - Application state wiring the balance engine to handlers
//! - JSON error responses

pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use mizan_core::finance::{BalanceEngine, PeriodAggregator, ReportService, TransactionService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Balance engine over the configured stores.
    pub engine: Arc<BalanceEngine>,
    /// Cache-first period reports.
    pub reports: ReportService,
    /// Ledger mutations with balance resync.
    pub transactions: TransactionService,
}

impl AppState {
    /// Builds the services around one engine.
    #[must_use]
    pub fn new(engine: Arc<BalanceEngine>) -> Self {
        Self {
            reports: ReportService::new(PeriodAggregator::new(engine.clone())),
            transactions: TransactionService::new(engine.clone()),
            engine,
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
