// Monitoring stats handlers

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::AppState;
use crate::models::{FleetSnapshot, FleetSummary, SnapshotRecord, ValidationReport};
use crate::scheduler;
use crate::validator;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/monitoring/stats: cached dashboard snapshot.
pub(super) async fn stats_handler(State(state): State<AppState>) -> Json<FleetSnapshot> {
    Json(state.cache.get().await.as_ref().clone())
}

/// GET /api/monitoring/stats/summary: distribution, health score and trends of the cached snapshot.
pub(super) async fn summary_handler(State(state): State<AppState>) -> Json<FleetSummary> {
    Json(state.cache.get().await.summary())
}

/// GET /api/monitoring/stats/latest: most recent stored snapshot (live if none stored).
pub(super) async fn latest_handler(State(state): State<AppState>) -> Json<FleetSnapshot> {
    Json(state.computer.get_latest().await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct HistoryQuery {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl HistoryQuery {
    fn check(&self) -> Result<(), Response> {
        if self.start_date > self.end_date {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!(
                    "startDate {} is after endDate {}",
                    self.start_date, self.end_date
                ),
            ));
        }
        Ok(())
    }
}

/// GET /api/monitoring/stats/history?startDate=..&endDate=..
pub(super) async fn history_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    if let Err(response) = query.check() {
        return response;
    }
    Json(
        state
            .computer
            .get_history(query.start_date, query.end_date)
            .await,
    )
    .into_response()
}

/// GET /api/monitoring/stats/history/average?startDate=..&endDate=..
pub(super) async fn history_average_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    if let Err(response) = query.check() {
        return response;
    }
    Json(
        state
            .computer
            .get_history_average(query.start_date, query.end_date)
            .await,
    )
    .into_response()
}

/// POST /api/monitoring/stats/save: persist today's snapshot now.
pub(super) async fn save_handler(State(state): State<AppState>) -> Response {
    match scheduler::run_persist(&state.computer).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// POST /api/monitoring/stats/validate: report findings for a submitted snapshot, no repair.
pub(super) async fn validate_handler(Json(record): Json<SnapshotRecord>) -> Json<ValidationReport> {
    Json(validator::validate(&record))
}

/// GET /api/monitoring/cache: cache counters.
pub(super) async fn cache_stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.cache.stats().await)
}

/// DELETE /api/monitoring/cache: force the next read to recompute.
pub(super) async fn cache_clear_handler(State(state): State<AppState>) -> StatusCode {
    state.cache.clear().await;
    StatusCode::NO_CONTENT
}
