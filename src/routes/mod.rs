// HTTP routes over the stats cache and computer

mod http;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::stats_cache::StatsCache;
use crate::stats_computer::StatsComputer;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) cache: Arc<StatsCache>,
    pub(crate) computer: Arc<StatsComputer>,
}

pub fn app(cache: Arc<StatsCache>, computer: Arc<StatsComputer>) -> Router {
    let state = AppState { cache, computer };
    Router::new()
        .route("/version", get(http::version_handler))
        .route("/api/monitoring/stats", get(http::stats_handler))
        .route("/api/monitoring/stats/latest", get(http::latest_handler))
        .route("/api/monitoring/stats/summary", get(http::summary_handler))
        .route("/api/monitoring/stats/history", get(http::history_handler))
        .route(
            "/api/monitoring/stats/history/average",
            get(http::history_average_handler),
        )
        .route("/api/monitoring/stats/save", post(http::save_handler))
        .route("/api/monitoring/stats/validate", post(http::validate_handler))
        .route(
            "/api/monitoring/cache",
            get(http::cache_stats_handler).delete(http::cache_clear_handler),
        )
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
