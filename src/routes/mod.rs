// HTTP routes: host registry, windowed series, navigation and sample ingest

mod error;
mod http;

pub use error::{ApiError, ApiResult, ErrorResponse};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

use crate::history_repo::HistoryRepo;
use crate::models::Sample;
use crate::series::SeriesEngine;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) history_repo: Arc<HistoryRepo>,
    pub(crate) engine: Arc<SeriesEngine>,
    pub(crate) ingest_tx: mpsc::Sender<Sample>,
}

pub fn app(
    history_repo: Arc<HistoryRepo>,
    engine: Arc<SeriesEngine>,
    ingest_tx: mpsc::Sender<Sample>,
) -> Router {
    let state = AppState {
        history_repo,
        engine,
        ingest_tx,
    };
    Router::new()
        .route("/", get(|| async { "hostwatch: metric series backend" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route(
            "/api/hosts",
            get(http::list_hosts_handler).post(http::register_host_handler),
        ) // GET, POST /api/hosts
        .route("/api/hosts/{host_id}/series", get(http::series_handler)) // GET series window
        .route(
            "/api/hosts/{host_id}/navigation",
            get(http::navigation_handler),
        ) // GET navigation offsets
        .route("/api/metrics/{host_id}", post(http::ingest_handler)) // POST one sample
        .route(
            "/api/metrics/{host_id}/latest",
            get(http::latest_sample_handler),
        ) // GET newest sample
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
