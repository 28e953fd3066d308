//! Finance routes: ledger mutations, balance, cache maintenance, and reports.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use mizan_core::finance::{
    FinanceError, HealthReport, HealthStatus, NewTransaction, PeriodReport, TransactionChanges,
    TransactionKind, YearlyReport,
};
use mizan_shared::AppError;
use mizan_shared::types::{TransactionId, format_rupiah};

use crate::AppState;

/// Creates the finance routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/finance/incomes", post(create_income))
        .route(
            "/finance/incomes/{id}",
            get(get_income).put(update_income).delete(delete_income),
        )
        .route("/finance/expenses", post(create_expense))
        .route(
            "/finance/expenses/{id}",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
        .route("/finance/balance", get(get_balance))
        .route("/finance/balance/sync", post(sync_balance))
        .route("/finance/health", get(finance_health))
        .route("/finance/cache/clear", post(clear_cache))
        .route("/finance/reports/weekly", get(weekly_report))
        .route("/finance/reports/monthly", get(monthly_report))
        .route("/finance/reports/yearly", get(yearly_report))
        .route("/finance/reports/realtime", get(realtime_report))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for recording an income or expense.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Attributed day.
    pub date: NaiveDate,
    /// Positive amount.
    pub amount: Decimal,
    /// Optional note.
    pub description: Option<String>,
}

/// Request body for a manual balance sync.
#[derive(Debug, Deserialize)]
pub struct SyncBalanceRequest {
    /// Clear the point-in-time cache first.
    #[serde(default = "default_true")]
    pub clear_cache: bool,
}

const fn default_true() -> bool {
    true
}

/// Request body for cache maintenance.
#[derive(Debug, Deserialize)]
pub struct ClearCacheRequest {
    /// `all` or `date`.
    #[serde(rename = "type", default = "default_clear_type")]
    pub clear_type: String,
    /// Change date, required for `date`.
    pub date: Option<NaiveDate>,
}

fn default_clear_type() -> String {
    "all".to_string()
}

/// Query for weekly and monthly reports.
#[derive(Debug, Deserialize)]
pub struct PeriodReportQuery {
    /// Any day inside the wanted period; defaults to today.
    pub date: Option<NaiveDate>,
    /// Recompute even when a fresh cached row exists.
    #[serde(default)]
    pub force_refresh: bool,
}

/// Query for yearly reports.
#[derive(Debug, Deserialize)]
pub struct YearlyReportQuery {
    /// Range start; defaults to January 1 of the current year.
    pub start: Option<NaiveDate>,
    /// Range end; defaults to December 31 of the current year.
    pub end: Option<NaiveDate>,
    /// Recompute even when a fresh cached row exists.
    #[serde(default)]
    pub force_refresh: bool,
}

/// Query for forced-fresh reports.
#[derive(Debug, Deserialize)]
pub struct RealtimeReportQuery {
    /// `weekly`, `monthly` or `yearly`.
    #[serde(rename = "type")]
    pub report_type: Option<String>,
    /// Reference day for weekly and monthly.
    pub date: Option<NaiveDate>,
    /// Yearly range start.
    pub start: Option<NaiveDate>,
    /// Yearly range end.
    pub end: Option<NaiveDate>,
}

/// Report payload for the realtime endpoint.
#[derive(Serialize)]
#[serde(untagged)]
enum RealtimeData {
    Period(PeriodReport),
    Yearly(YearlyReport),
}

#[derive(Serialize)]
struct ReportMeta {
    is_real_time: bool,
    generated_at: DateTime<Utc>,
    period: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    forced_refresh: Option<bool>,
}

#[derive(Serialize)]
struct ReportResponse<T> {
    message: String,
    data: T,
    meta: ReportMeta,
}

#[derive(Serialize)]
struct HealthResponse {
    message: &'static str,
    #[serde(flatten)]
    report: HealthReport,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Maps a finance error to a JSON error response.
fn finance_error(err: FinanceError) -> Response {
    let code = err.error_code().to_ascii_lowercase();
    let mut message = err.to_string();
    let app_err = AppError::from(err);
    let status =
        StatusCode::from_u16(app_err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if !app_err.is_client_error() {
        error!(error = %app_err, "Finance operation failed");
        message = "An error occurred".to_string();
    }

    (status, Json(json!({ "error": code, "message": message }))).into_response()
}

fn bad_request(error: &str, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": error, "message": message })),
    )
        .into_response()
}

fn report_response<T: Serialize>(
    message: String,
    data: T,
    period: &str,
    real_time: bool,
) -> Response {
    let body = ReportResponse {
        message,
        data,
        meta: ReportMeta {
            is_real_time: real_time,
            generated_at: Utc::now(),
            period: period.to_string(),
            forced_refresh: None,
        },
    };
    (StatusCode::OK, Json(body)).into_response()
}

fn current_year_bounds() -> (NaiveDate, NaiveDate) {
    let today = Utc::now().date_naive();
    let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
    let end = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
    (start, end)
}

// ============================================================================
// Ledger Mutations
// ============================================================================

async fn create_transaction(
    state: &AppState,
    kind: TransactionKind,
    payload: CreateTransactionRequest,
) -> Response {
    let input = NewTransaction {
        kind,
        date: payload.date,
        amount: payload.amount,
        description: payload.description,
    };

    match state.transactions.create(input).await {
        Ok(outcome) => {
            info!(kind = %kind, id = %outcome.record.id, "Transaction created via API");
            (
                StatusCode::CREATED,
                Json(json!({
                    "message": format!("{kind} recorded and balance synced"),
                    "data": outcome.record,
                    "current_balance": outcome.sync.balance,
                    "sync_info": {
                        "operation": outcome.sync.operation,
                        "timestamp": outcome.sync.timestamp,
                    }
                })),
            )
                .into_response()
        }
        Err(e) => finance_error(e),
    }
}

async fn get_transaction(state: &AppState, kind: TransactionKind, id: Uuid) -> Response {
    match state.transactions.get(kind, TransactionId::from_uuid(id)).await {
        Ok(record) => (
            StatusCode::OK,
            Json(json!({
                "message": format!("{kind} retrieved"),
                "data": record,
            })),
        )
            .into_response(),
        Err(e) => finance_error(e),
    }
}

async fn update_transaction(
    state: &AppState,
    kind: TransactionKind,
    id: Uuid,
    changes: TransactionChanges,
) -> Response {
    match state
        .transactions
        .update(kind, TransactionId::from_uuid(id), changes)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "message": format!("{kind} updated and balance synced"),
                "data": outcome.record,
                "current_balance": outcome.sync.balance,
                "sync_info": {
                    "operation": outcome.sync.operation,
                    "affected_dates": outcome.affected_dates,
                    "timestamp": outcome.sync.timestamp,
                }
            })),
        )
            .into_response(),
        Err(e) => finance_error(e),
    }
}

async fn delete_transaction(state: &AppState, kind: TransactionKind, id: Uuid) -> Response {
    match state
        .transactions
        .delete(kind, TransactionId::from_uuid(id))
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "message": format!("{kind} deleted and balance synced"),
                "deleted_data": outcome.deleted_record,
                "current_balance": outcome.sync.balance,
                "sync_info": {
                    "operation": outcome.sync.operation,
                    "affected_date": outcome.deleted_record.date,
                    "timestamp": outcome.sync.timestamp,
                }
            })),
        )
            .into_response(),
        Err(e) => finance_error(e),
    }
}

/// POST `/finance/incomes` - Record an income.
async fn create_income(
    State(state): State<AppState>,
    Json(payload): Json<CreateTransactionRequest>,
) -> impl IntoResponse {
    create_transaction(&state, TransactionKind::Income, payload).await
}

/// POST `/finance/expenses` - Record an expense.
async fn create_expense(
    State(state): State<AppState>,
    Json(payload): Json<CreateTransactionRequest>,
) -> impl IntoResponse {
    create_transaction(&state, TransactionKind::Expense, payload).await
}

/// GET `/finance/incomes/{id}` - Fetch one income.
async fn get_income(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    get_transaction(&state, TransactionKind::Income, id).await
}

/// GET `/finance/expenses/{id}` - Fetch one expense.
async fn get_expense(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    get_transaction(&state, TransactionKind::Expense, id).await
}

/// PUT `/finance/incomes/{id}` - Change an income.
async fn update_income(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<TransactionChanges>,
) -> impl IntoResponse {
    update_transaction(&state, TransactionKind::Income, id, changes).await
}

/// PUT `/finance/expenses/{id}` - Change an expense.
async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<TransactionChanges>,
) -> impl IntoResponse {
    update_transaction(&state, TransactionKind::Expense, id, changes).await
}

/// DELETE `/finance/incomes/{id}` - Remove an income.
async fn delete_income(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    delete_transaction(&state, TransactionKind::Income, id).await
}

/// DELETE `/finance/expenses/{id}` - Remove an expense.
async fn delete_expense(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    delete_transaction(&state, TransactionKind::Expense, id).await
}

// ============================================================================
// Balance & Cache
// ============================================================================

/// GET `/finance/balance` - Current balance, always recomputed.
async fn get_balance(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.get_current_balance().await {
        Ok(balance) => (
            StatusCode::OK,
            Json(json!({
                "message": "Balance retrieved",
                "balance": balance,
                "formatted": format_rupiah(balance),
                "timestamp": Utc::now(),
                "is_real_time": true,
            })),
        )
            .into_response(),
        Err(e) => finance_error(e),
    }
}

/// POST `/finance/balance/sync` - Manual resync.
async fn sync_balance(
    State(state): State<AppState>,
    payload: Option<Json<SyncBalanceRequest>>,
) -> impl IntoResponse {
    let clear_cache = payload.is_none_or(|Json(body)| body.clear_cache);

    match state.engine.sync_balance(clear_cache).await {
        Ok(balance) => (
            StatusCode::OK,
            Json(json!({
                "message": "Balance synced",
                "balance": balance,
                "formatted": format_rupiah(balance),
                "timestamp": Utc::now(),
                "cache_cleared": clear_cache,
            })),
        )
            .into_response(),
        Err(e) => finance_error(e),
    }
}

/// GET `/finance/health` - Consistency and record counts.
async fn finance_health(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.health_check().await {
        Ok(report) => {
            let status = if report.status == HealthStatus::Healthy {
                StatusCode::OK
            } else {
                warn!(
                    difference = %report.consistency.difference,
                    "Finance health check reports drift"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (
                status,
                Json(HealthResponse {
                    message: "Health check completed",
                    report,
                }),
            )
                .into_response()
        }
        Err(e) => finance_error(e),
    }
}

/// POST `/finance/cache/clear` - Wipe every cache, or invalidate for one date.
async fn clear_cache(
    State(state): State<AppState>,
    Json(payload): Json<ClearCacheRequest>,
) -> impl IntoResponse {
    match (payload.clear_type.as_str(), payload.date) {
        ("all", _) => match state.engine.repair_balance().await {
            Ok(balance) => (
                StatusCode::OK,
                Json(json!({
                    "message": "All caches cleared and balance repaired",
                    "balance": balance,
                    "timestamp": Utc::now(),
                })),
            )
                .into_response(),
            Err(e) => finance_error(e),
        },
        ("date", Some(date)) => match state.engine.invalidate_cache(date).await {
            Ok(result) => (
                StatusCode::OK,
                Json(json!({
                    "message": format!("Cache for {date} cleared"),
                    "invalidated_count": result.invalidated_count,
                    "balance": result.balance,
                    "timestamp": Utc::now(),
                })),
            )
                .into_response(),
            Err(e) => finance_error(e),
        },
        _ => bad_request(
            "invalid_request",
            "type must be 'all', or 'date' together with a date",
        ),
    }
}

// ============================================================================
// Reports
// ============================================================================

/// GET `/finance/reports/weekly` - Weekly bucket containing `date`.
async fn weekly_report(
    State(state): State<AppState>,
    Query(query): Query<PeriodReportQuery>,
) -> impl IntoResponse {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    match state.reports.weekly(date, query.force_refresh).await {
        Ok(report) => report_response(
            format!("Weekly report containing {date}"),
            report,
            "weekly",
            query.force_refresh,
        ),
        Err(e) => finance_error(e),
    }
}

/// GET `/finance/reports/monthly` - Calendar month containing `date`.
async fn monthly_report(
    State(state): State<AppState>,
    Query(query): Query<PeriodReportQuery>,
) -> impl IntoResponse {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    match state.reports.monthly(date, query.force_refresh).await {
        Ok(report) => report_response(
            format!("Monthly report containing {date}"),
            report,
            "monthly",
            query.force_refresh,
        ),
        Err(e) => finance_error(e),
    }
}

/// GET `/finance/reports/yearly` - One entry per year in `[start, end]`.
async fn yearly_report(
    State(state): State<AppState>,
    Query(query): Query<YearlyReportQuery>,
) -> impl IntoResponse {
    let (year_start, year_end) = current_year_bounds();
    let start = query.start.unwrap_or(year_start);
    let end = query.end.unwrap_or(year_end);
    match state.reports.yearly(start, end, query.force_refresh).await {
        Ok(report) => report_response(
            format!("Yearly report from {start} to {end}"),
            report,
            "yearly",
            query.force_refresh,
        ),
        Err(e) => finance_error(e),
    }
}

/// GET `/finance/reports/realtime` - Any report type, always recomputed.
async fn realtime_report(
    State(state): State<AppState>,
    Query(query): Query<RealtimeReportQuery>,
) -> impl IntoResponse {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let result = match query.report_type.as_deref() {
        Some("weekly") => state.reports.weekly(date, true).await.map(RealtimeData::Period),
        Some("monthly") => state.reports.monthly(date, true).await.map(RealtimeData::Period),
        Some("yearly") => {
            let (year_start, year_end) = current_year_bounds();
            let start = query.start.unwrap_or(year_start);
            let end = query.end.unwrap_or(year_end);
            state
                .reports
                .yearly(start, end, true)
                .await
                .map(RealtimeData::Yearly)
        }
        _ => {
            return bad_request(
                "invalid_report_type",
                "type must be one of: weekly, monthly, yearly",
            );
        }
    };

    let period = query.report_type.unwrap_or_default();
    match result {
        Ok(data) => {
            let body = ReportResponse {
                message: format!("Real-time {period} report"),
                data,
                meta: ReportMeta {
                    is_real_time: true,
                    generated_at: Utc::now(),
                    period,
                    forced_refresh: Some(true),
                },
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => finance_error(e),
    }
}
