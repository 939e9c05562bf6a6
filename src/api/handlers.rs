use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Local, NaiveDate};
use std::sync::Arc;

use super::types::*;
use super::AppState;
use crate::analytics::breakdown::{CategoryBreakdown, RiskBucket, TypeBreakdown};
use crate::analytics::{self, DailyTotal, TransactionFilter};
use crate::dashboard::{
    DashboardError, DatasetCommand, GenerateRequest, RuleCommand, RuleReport, UploadSummary,
};
use crate::notify::ReportResponse;
use crate::rules::{FraudRule, NewRule, Recommendation};
use crate::session::{ProfileUpdate, SignIn, SignUp, User};
use crate::transaction::Transaction;

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

const DEFAULT_PAGE: usize = 100;
const MAX_PAGE: usize = 1000;
const DEFAULT_DAYS: u32 = 30;
const MAX_DAYS: u32 = 366;
const DEFAULT_TOP: usize = 5;

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}

pub(crate) fn status_for(e: &DashboardError) -> StatusCode {
    match e {
        DashboardError::Validation(_) => StatusCode::BAD_REQUEST,
        DashboardError::Unauthorized => StatusCode::UNAUTHORIZED,
        DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
        DashboardError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DashboardError::Remote(_) => StatusCode::BAD_GATEWAY,
        DashboardError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn dashboard_error(e: DashboardError) -> ApiError {
    let status = status_for(&e);
    if status.is_server_error() {
        tracing::error!(error = %e, "Request failed");
    }
    api_error(status, e.to_string())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn find(transactions: &[Transaction], id: &str) -> ApiResult<Transaction> {
    transactions
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("transaction '{}' not found", id)))
}

// ============================================================
// Health
// ============================================================

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    let dashboard = state.dashboard.lock().await;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        transactions: dashboard.transactions().len(),
        rules: dashboard.rules().len(),
        signed_in: dashboard.user().is_some(),
        last_uploaded_file: dashboard.last_uploaded_file().map(str::to_string),
    }))
}

// ============================================================
// Transactions
// ============================================================

pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TransactionFilter>,
    Query(page): Query<PageParams>,
) -> ApiResult<TransactionsResponse> {
    let dashboard = state.dashboard.lock().await;
    let matched = filter.apply(dashboard.transactions(), today());
    let total = matched.len();
    let limit = page.limit.unwrap_or(DEFAULT_PAGE).min(MAX_PAGE);
    let offset = page.offset.unwrap_or(0);

    Ok(Json(TransactionsResponse {
        transactions: matched.into_iter().skip(offset).take(limit).collect(),
        total,
    }))
}

pub async fn generate_transactions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<GenerateResponse> {
    let mut dashboard = state.dashboard.lock().await;
    let generated = dashboard.generate(request).map_err(dashboard_error)?;
    Ok(Json(GenerateResponse { generated }))
}

pub async fn reset_transactions(State(state): State<Arc<AppState>>) -> ApiResult<GenerateResponse> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard
        .dataset(DatasetCommand::ResetToDemo)
        .map_err(dashboard_error)?;
    Ok(Json(GenerateResponse {
        generated: dashboard.transactions().len(),
    }))
}

pub async fn flag_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Transaction> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard
        .dataset(DatasetCommand::Flag(id.clone()))
        .map_err(dashboard_error)?;
    find(dashboard.transactions(), &id)
}

pub async fn dismiss_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Transaction> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard
        .dataset(DatasetCommand::Dismiss(id.clone()))
        .map_err(dashboard_error)?;
    find(dashboard.transactions(), &id)
}

pub async fn rule_hits(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<RuleReport> {
    let dashboard = state.dashboard.lock().await;
    dashboard.rule_report(&id).map(Json).map_err(dashboard_error)
}

pub async fn report_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ReportResponse> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard
        .report_fraud(&id)
        .await
        .map(Json)
        .map_err(dashboard_error)
}

pub async fn list_alerts(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Transaction>> {
    let dashboard = state.dashboard.lock().await;
    Ok(Json(dashboard.alerts()))
}

pub async fn upload_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResult<UploadSummary> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard
        .upload(&params.filename, &body)
        .map(Json)
        .map_err(dashboard_error)
}

// ============================================================
// Analytics
// ============================================================

pub async fn analytics_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryParams>,
) -> ApiResult<SummaryResponse> {
    let dashboard = state.dashboard.lock().await;
    let transactions = dashboard.transactions();
    let summary = analytics::account_summary(transactions);

    let today = today();
    let window = |since: NaiveDate, until: NaiveDate| {
        let filter = TransactionFilter {
            since: Some(since),
            until: Some(until),
            ..Default::default()
        };
        analytics::account_summary(&filter.apply(transactions, today))
    };
    let current = window(today - Duration::days(29), today);
    let previous = window(today - Duration::days(59), today - Duration::days(30));

    let currency = params.currency;
    Ok(Json(SummaryResponse {
        formatted: FormattedSummary {
            balance: currency.format(summary.total_balance),
            inflow: currency.format(summary.total_inflow),
            outflow: currency.format(summary.total_outflow),
            average: currency.format(summary.average_transaction_amount),
        },
        summary,
        currency,
        inflow_change: analytics::percent_change(current.total_inflow, previous.total_inflow),
        outflow_change: analytics::percent_change(current.total_outflow, previous.total_outflow),
    }))
}

pub async fn analytics_daily(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DailyParams>,
) -> ApiResult<Vec<DailyTotal>> {
    let days = params.days.unwrap_or(DEFAULT_DAYS);
    if days == 0 || days > MAX_DAYS {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("days must be between 1 and {}", MAX_DAYS),
        ));
    }
    let dashboard = state.dashboard.lock().await;
    Ok(Json(analytics::daily_totals(
        dashboard.transactions(),
        days,
        today(),
    )))
}

pub async fn analytics_by_type(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<TypeBreakdown>> {
    let dashboard = state.dashboard.lock().await;
    Ok(Json(analytics::by_type(dashboard.transactions())))
}

pub async fn analytics_by_category(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<CategoryBreakdown>> {
    let dashboard = state.dashboard.lock().await;
    Ok(Json(analytics::by_category(dashboard.transactions())))
}

pub async fn analytics_risk(State(state): State<Arc<AppState>>) -> ApiResult<Vec<RiskBucket>> {
    let dashboard = state.dashboard.lock().await;
    Ok(Json(analytics::risk_distribution(dashboard.transactions())))
}

pub async fn analytics_top_merchants(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopParams>,
) -> ApiResult<TopMerchantsResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_TOP).min(MAX_PAGE);
    let dashboard = state.dashboard.lock().await;
    let transactions = dashboard.transactions();
    Ok(Json(TopMerchantsResponse {
        by_count: analytics::top_merchants_by_count(transactions, limit),
        by_amount: analytics::top_merchants_by_amount(transactions, limit),
    }))
}

// ============================================================
// Rules
// ============================================================

pub async fn list_rules(State(state): State<Arc<AppState>>) -> ApiResult<Vec<FraudRule>> {
    let dashboard = state.dashboard.lock().await;
    Ok(Json(dashboard.rules().to_vec()))
}

async fn rule_command(state: &AppState, command: RuleCommand) -> ApiResult<Vec<FraudRule>> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.rule(command).await.map(Json).map_err(dashboard_error)
}

pub async fn add_rule(
    State(state): State<Arc<AppState>>,
    Json(rule): Json<NewRule>,
) -> ApiResult<Vec<FraudRule>> {
    rule_command(&state, RuleCommand::Add(rule)).await
}

pub async fn toggle_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<FraudRule>> {
    rule_command(&state, RuleCommand::Toggle(id)).await
}

pub async fn set_rule_threshold(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ThresholdRequest>,
) -> ApiResult<Vec<FraudRule>> {
    rule_command(
        &state,
        RuleCommand::SetThreshold {
            id,
            threshold: body.threshold,
        },
    )
    .await
}

pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<FraudRule>> {
    rule_command(&state, RuleCommand::Delete(id)).await
}

pub async fn get_recommendation(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Recommendation> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.recommend().map(Json).map_err(dashboard_error)
}

pub async fn apply_recommendation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ApplyRecommendationRequest>,
) -> ApiResult<Vec<FraudRule>> {
    rule_command(
        &state,
        RuleCommand::ApplyRecommendation(body.suggested_changes),
    )
    .await
}

// ============================================================
// Session
// ============================================================

pub async fn get_session(State(state): State<Arc<AppState>>) -> ApiResult<SessionResponse> {
    let dashboard = state.dashboard.lock().await;
    Ok(Json(SessionResponse {
        user: dashboard.user().cloned(),
    }))
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignIn>,
) -> ApiResult<User> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.sign_in(body).await.map(Json).map_err(dashboard_error)
}

pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignUp>,
) -> ApiResult<User> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.sign_up(body).await.map(Json).map_err(dashboard_error)
}

pub async fn sign_out(State(state): State<Arc<AppState>>) -> ApiResult<SessionResponse> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.sign_out().await.map_err(dashboard_error)?;
    Ok(Json(SessionResponse { user: None }))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ProfileUpdate>,
) -> ApiResult<User> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard
        .update_profile(body)
        .await
        .map(Json)
        .map_err(dashboard_error)
}
