pub mod handlers;
pub mod types;

use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::dashboard::Dashboard;

const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub struct AppState {
    pub dashboard: Mutex<Dashboard>,
}

pub fn router(dashboard: Dashboard) -> Router {
    let state = Arc::new(AppState {
        dashboard: Mutex::new(dashboard),
    });

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/transactions", get(handlers::list_transactions))
        .route(
            "/api/v1/transactions/generate",
            post(handlers::generate_transactions),
        )
        .route(
            "/api/v1/transactions/reset",
            post(handlers::reset_transactions),
        )
        .route(
            "/api/v1/transactions/{id}/flag",
            post(handlers::flag_transaction),
        )
        .route(
            "/api/v1/transactions/{id}/dismiss",
            post(handlers::dismiss_transaction),
        )
        .route(
            "/api/v1/transactions/{id}/rule-hits",
            get(handlers::rule_hits),
        )
        .route(
            "/api/v1/transactions/{id}/report",
            post(handlers::report_transaction),
        )
        .route("/api/v1/alerts", get(handlers::list_alerts))
        .route("/api/v1/analytics/summary", get(handlers::analytics_summary))
        .route("/api/v1/analytics/daily", get(handlers::analytics_daily))
        .route("/api/v1/analytics/by-type", get(handlers::analytics_by_type))
        .route(
            "/api/v1/analytics/by-category",
            get(handlers::analytics_by_category),
        )
        .route(
            "/api/v1/analytics/risk-distribution",
            get(handlers::analytics_risk),
        )
        .route(
            "/api/v1/analytics/top-merchants",
            get(handlers::analytics_top_merchants),
        )
        .route(
            "/api/v1/uploads",
            post(handlers::upload_transactions).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route(
            "/api/v1/rules",
            get(handlers::list_rules).post(handlers::add_rule),
        )
        .route("/api/v1/rules/{id}", delete(handlers::delete_rule))
        .route("/api/v1/rules/{id}/toggle", post(handlers::toggle_rule))
        .route(
            "/api/v1/rules/{id}/threshold",
            put(handlers::set_rule_threshold),
        )
        .route(
            "/api/v1/rules/recommendation",
            get(handlers::get_recommendation),
        )
        .route(
            "/api/v1/rules/recommendation/apply",
            post(handlers::apply_recommendation),
        )
        .route(
            "/api/v1/session",
            get(handlers::get_session).delete(handlers::sign_out),
        )
        .route("/api/v1/session/sign-in", post(handlers::sign_in))
        .route("/api/v1/session/sign-up", post(handlers::sign_up))
        .route("/api/v1/session/profile", patch(handlers::update_profile))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    dashboard: Dashboard,
    host: &str,
    port: u16,
    shutdown: CancellationToken,
) -> eyre::Result<()> {
    let app = router(dashboard);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre::eyre!("Failed to bind API listener on {}: {}", addr, e))?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
