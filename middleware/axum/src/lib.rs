//! This crate serves the dashboard HTTP API of the [MCP hub](https://docs.rs/mcp-hub-core) with [Axum](https://docs.rs/axum).
//!
//! The aggregate endpoints read the hub's cached views, so a busy dashboard never
//! recomputes aggregates more often than the cache ttl allows.
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # async fn example(hub: Arc<mcp_hub_core::Hub>, addr: std::net::SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
//! let app = mcp_hub_axum::router(Arc::clone(&hub));
//! axum::Server::bind(&addr).serve(app.into_make_service()).await?;
//! # Ok(())
//! # }
//! ```

mod view;

pub use view::*;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mcp_hub_core::config::{RECENT_CALLS_LIMIT, RECENT_ERRORS_LIMIT};
use mcp_hub_core::report::TrendRange;
use mcp_hub_core::{logging, Hub};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

pub const API_PREFIX: &str = "/api/mcp/dashboard";

/// Failure of one API request, rendered as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub range: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallsQuery {
    pub system: Option<String>,
    pub limit: Option<usize>,
}

/// Build the dashboard routes over a shared hub.
pub fn router(hub: Arc<Hub>) -> Router {
    Router::new()
        .route(&format!("{}/metrics", API_PREFIX), get(metrics))
        .route(&format!("{}/system-health", API_PREFIX), get(system_health))
        .route(&format!("{}/circuit-breakers", API_PREFIX), get(circuit_breakers))
        .route(&format!("{}/errors", API_PREFIX), get(errors))
        .route(&format!("{}/performance-trend", API_PREFIX), get(performance_trend))
        .route(&format!("{}/error-details/:call_id", API_PREFIX), get(error_details))
        .route(&format!("{}/report", API_PREFIX), get(report))
        .route(&format!("{}/cache", API_PREFIX), get(cache))
        .route(&format!("{}/calls/detail", API_PREFIX), get(call_details))
        .route(&format!("{}/mq/status", API_PREFIX), get(queue_status))
        .route(&format!("{}/reset", API_PREFIX), post(reset))
        .with_state(hub)
}

/// Serve the dashboard until `shutdown` completes.
pub async fn serve<F>(hub: Arc<Hub>, addr: SocketAddr, shutdown: F) -> mcp_hub_core::Result<()>
where
    F: Future<Output = ()>,
{
    logging::info!("[Dashboard] Listening on {}", addr);
    axum::Server::try_bind(&addr)?
        .serve(router(hub).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    logging::info!("[Dashboard] Stopped");
    Ok(())
}

async fn metrics(State(hub): State<Arc<Hub>>) -> Json<MetricsView> {
    Json(MetricsView::from(&hub.metrics_overview().value))
}

async fn system_health(State(hub): State<Arc<Hub>>) -> Json<Vec<SystemHealthView>> {
    Json(
        hub.system_health()
            .value
            .iter()
            .map(SystemHealthView::from)
            .collect(),
    )
}

async fn circuit_breakers(State(hub): State<Arc<Hub>>) -> Json<Vec<CircuitBreakerView>> {
    Json(
        hub.circuit_breakers()
            .value
            .iter()
            .map(CircuitBreakerView::from)
            .collect(),
    )
}

async fn errors(
    State(hub): State<Arc<Hub>>,
    Query(query): Query<ErrorsQuery>,
) -> Json<Vec<ErrorView>> {
    let limit = query.limit.unwrap_or(RECENT_ERRORS_LIMIT);
    Json(hub.recent_errors(limit).iter().map(ErrorView::from).collect())
}

async fn performance_trend(
    State(hub): State<Arc<Hub>>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendView>, ApiError> {
    let range = match query.range.as_deref() {
        None => TrendRange::default(),
        Some(range) => range
            .parse::<TrendRange>()
            .map_err(|err| ApiError::BadRequest(err.to_string()))?,
    };
    Ok(Json(TrendView::from(&hub.performance_trend(range).value)))
}

async fn error_details(
    State(hub): State<Arc<Hub>>,
    Path(call_id): Path<String>,
) -> Result<Json<ErrorDetailsView>, ApiError> {
    hub.error_details(&call_id)
        .map(|record| Json(ErrorDetailsView::from(&record)))
        .ok_or_else(|| ApiError::NotFound(format!("no failed call with id {}", call_id)))
}

async fn report(State(hub): State<Arc<Hub>>) -> Json<ReportView> {
    Json(ReportView::from(&hub.performance_report().value))
}

async fn cache(State(hub): State<Arc<Hub>>) -> Json<CacheView> {
    Json(CacheView::from(hub.cache_stats()))
}

/// Without `system`, the latest calls across every client.
async fn call_details(
    State(hub): State<Arc<Hub>>,
    Query(query): Query<CallsQuery>,
) -> Json<Vec<CallDetailView>> {
    let limit = query.limit.unwrap_or(RECENT_CALLS_LIMIT);
    let system = query.system.as_deref().filter(|s| !s.is_empty());
    Json(
        hub.recent_calls(system, limit)
            .iter()
            .map(CallDetailView::from)
            .collect(),
    )
}

async fn queue_status(State(hub): State<Arc<Hub>>) -> Json<QueueStatusView> {
    Json(QueueStatusView::from(&hub.queue_status()))
}

async fn reset(State(hub): State<Arc<Hub>>) -> Json<serde_json::Value> {
    hub.reset_metrics();
    Json(json!({ "success": true, "message": "all metrics reset" }))
}
