//! Admin/operator routes (§6): worker control and system health.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::kernel::service::ServiceHealth;
use crate::server::app::AppState;

fn health_str(h: ServiceHealth) -> &'static str {
    match h {
        ServiceHealth::Running => "running",
        ServiceHealth::Stopped => "stopped",
        ServiceHealth::Unhealthy => "unhealthy",
    }
}

#[derive(Serialize)]
pub struct WorkersStatusResponse {
    pub workers: HashMap<String, String>,
}

pub async fn workers_status_handler(State(state): State<AppState>) -> Json<WorkersStatusResponse> {
    let supervisor = state.supervisor.lock().await;
    let workers = supervisor
        .health()
        .into_iter()
        .map(|(name, health)| (name.to_string(), health_str(health).to_string()))
        .collect();
    Json(WorkersStatusResponse { workers })
}

#[derive(Serialize)]
pub struct WorkersStatsResponse {
    pub workers: HashMap<String, String>,
    pub outbox_interval_seconds: u64,
    pub poll_interval_seconds: u64,
    pub batch_size: i64,
    pub max_retry_attempts: u32,
}

/// Worker runtime stats, one layer deeper than `/admin/workers/status`: health
/// plus the scheduling/retry configuration currently governing them.
pub async fn workers_stats_handler(State(state): State<AppState>) -> Json<WorkersStatsResponse> {
    let supervisor = state.supervisor.lock().await;
    let workers = supervisor
        .health()
        .into_iter()
        .map(|(name, health)| (name.to_string(), health_str(health).to_string()))
        .collect();
    Json(WorkersStatsResponse {
        workers,
        outbox_interval_seconds: state.config.outbox_interval.as_secs(),
        poll_interval_seconds: state.config.poll_interval.as_secs(),
        batch_size: state.config.batch_size,
        max_retry_attempts: state.config.max_retry_attempts,
    })
}

pub async fn workers_start_handler(State(state): State<AppState>) -> StatusCode {
    let mut supervisor = state.supervisor.lock().await;
    supervisor.start_all();
    StatusCode::OK
}

pub async fn workers_stop_handler(State(state): State<AppState>) -> StatusCode {
    let mut supervisor = state.supervisor.lock().await;
    supervisor.stop_all(state.config.shutdown_grace_period).await;
    StatusCode::OK
}

pub async fn worker_restart_handler(State(state): State<AppState>, Path(name): Path<String>) -> StatusCode {
    let mut supervisor = state.supervisor.lock().await;
    supervisor.restart(&name, state.config.shutdown_grace_period).await;
    StatusCode::OK
}

#[derive(Serialize)]
pub struct SystemHealthResponse {
    pub status: String,
    pub database: String,
    pub workers: HashMap<String, String>,
}

pub async fn system_health_handler(State(state): State<AppState>) -> (StatusCode, Json<SystemHealthResponse>) {
    let db_ok = sqlx::query("SELECT 1").execute(&state.db_pool).await.is_ok();
    let supervisor = state.supervisor.lock().await;
    let workers: HashMap<String, String> = supervisor
        .health()
        .into_iter()
        .map(|(name, health)| (name.to_string(), health_str(health).to_string()))
        .collect();
    let healthy = db_ok && workers.values().all(|s| s != "unhealthy");

    (
        if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE },
        Json(SystemHealthResponse {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            database: if db_ok { "ok".to_string() } else { "error".to_string() },
            workers,
        }),
    )
}
