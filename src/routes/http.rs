// HTTP handlers: version, host registry, series windows, navigation, ingest

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::error::EngineError;
use crate::models::{
    Host, HostId, HostOverview, NavigationResult, NewHost, Sample, SampleReport, SeriesResponse,
};
use crate::series::{Range, window};

#[derive(Debug, Deserialize)]
pub(super) struct WindowQuery {
    #[serde(default = "default_range", alias = "range_name")]
    range: String,
    #[serde(default)]
    offset: i64,
}

fn default_range() -> String {
    Range::Hourly.as_str().to_string()
}

/// GET /version returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/hosts lists every host with its newest sample (dashboard overview).
pub(super) async fn list_hosts_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<HostOverview>>> {
    let hosts = state.history_repo.list_hosts().await?;
    let mut out = Vec::with_capacity(hosts.len());
    for host in hosts {
        let latest_sample = state.history_repo.get_latest_sample(host.id).await?;
        out.push(HostOverview {
            host,
            latest_sample,
        });
    }
    Ok(Json(out))
}

/// POST /api/hosts registers a host: 201 with the stored record.
pub(super) async fn register_host_handler(
    State(state): State<AppState>,
    Json(new_host): Json<NewHost>,
) -> ApiResult<(StatusCode, Json<Host>)> {
    if new_host.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must be non-empty".into()));
    }
    if new_host.poll_interval_seconds == 0 {
        return Err(ApiError::BadRequest(
            "poll_interval_seconds must be > 0".into(),
        ));
    }
    let host = state
        .history_repo
        .register_host(&new_host)
        .await
        .map_err(|e| {
            let duplicate = e
                .downcast_ref::<sqlx::Error>()
                .and_then(|db| db.as_database_error())
                .is_some_and(|db| db.is_unique_violation());
            if duplicate {
                ApiError::Conflict(format!("host {:?} already registered", new_host.name))
            } else {
                ApiError::Internal(e)
            }
        })?;
    tracing::info!(host_id = host.id, name = %host.name, "host registered");
    Ok((StatusCode::CREATED, Json(host)))
}

/// GET /api/hosts/{host_id}/series?range=hourly&offset=0
pub(super) async fn series_handler(
    State(state): State<AppState>,
    Path(host_id): Path<HostId>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<SeriesResponse>> {
    let range: Range = query.range.parse()?;
    let host = find_host(&state, host_id).await?;
    let response = state
        .engine
        .series(&host, range, query.offset, Utc::now())
        .await?;
    Ok(Json(response))
}

/// GET /api/hosts/{host_id}/navigation?range=hourly&offset=0
pub(super) async fn navigation_handler(
    State(state): State<AppState>,
    Path(host_id): Path<HostId>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<NavigationResult>> {
    let now = Utc::now();
    let window = window::resolve_named(&query.range, query.offset, now)?;
    let host = find_host(&state, host_id).await?;
    let nav = state
        .engine
        .navigation(host.id, window.range, window.offset, now)
        .await?;
    Ok(Json(nav))
}

/// POST /api/metrics/{host_id} queues one sample for the ingest writer; 202 once queued.
pub(super) async fn ingest_handler(
    State(state): State<AppState>,
    Path(host_id): Path<HostId>,
    Json(report): Json<SampleReport>,
) -> ApiResult<StatusCode> {
    let host = find_host(&state, host_id).await?;
    if !host.is_active {
        return Err(ApiError::BadRequest(format!("host {} is inactive", host_id)));
    }
    let sample = Sample::from_report(host_id, report);
    state
        .ingest_tx
        .send(sample)
        .await
        .map_err(|_| ApiError::Unavailable("ingest writer stopped".into()))?;
    Ok(StatusCode::ACCEPTED)
}

/// GET /api/metrics/{host_id}/latest; 404 for an unknown host or one with no samples yet.
pub(super) async fn latest_sample_handler(
    State(state): State<AppState>,
    Path(host_id): Path<HostId>,
) -> ApiResult<Json<Sample>> {
    find_host(&state, host_id).await?;
    state
        .history_repo
        .get_latest_sample(host_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no samples for host {}", host_id)))
}

async fn find_host(state: &AppState, host_id: HostId) -> ApiResult<Host> {
    state
        .history_repo
        .get_host(host_id)
        .await?
        .ok_or(ApiError::Engine(EngineError::HostNotFound(host_id)))
}
