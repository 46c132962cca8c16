//! Health probes (§6): `/health`, `/health/ready`, `/health/live`, `/health/detailed`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::kernel::service::ServiceHealth;
use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    database: DatabaseHealth,
    connection_pool: ConnectionPoolHealth,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
pub struct ConnectionPoolHealth {
    size: u32,
    idle_connections: usize,
    max_connections: u32,
}

async fn check_database(state: &AppState) -> DatabaseHealth {
    match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        sqlx::query("SELECT 1").execute(&state.db_pool),
    )
    .await
    {
        Ok(Ok(_)) => DatabaseHealth { status: "ok".to_string(), error: None },
        Ok(Err(e)) => DatabaseHealth {
            status: "error".to_string(),
            error: Some(format!("query failed: {e}")),
        },
        Err(_) => DatabaseHealth {
            status: "error".to_string(),
            error: Some("query timeout (>5s)".to_string()),
        },
    }
}

/// Overall health: database reachability plus pool utilization.
///
/// Returns 200 if the database check passes, 503 otherwise.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = check_database(&state).await;
    let is_healthy = database.status == "ok";

    let pool_health = ConnectionPoolHealth {
        size: state.db_pool.size(),
        idle_connections: state.db_pool.num_idle(),
        max_connections: state.db_pool.options().get_max_connections(),
    };

    let status_code = if is_healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            database,
            connection_pool: pool_health,
        }),
    )
}

/// Readiness: can this instance accept traffic right now (database reachable).
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if check_database(&state).await.status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Liveness: is the process itself still running its event loop. Always 200 —
/// a process that can answer HTTP at all is alive by definition.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

#[derive(Serialize)]
pub struct DetailedHealthResponse {
    status: String,
    database: DatabaseHealth,
    connection_pool: ConnectionPoolHealth,
    workers: std::collections::HashMap<String, String>,
}

/// Detailed health: database, pool, and per-worker health from the supervisor.
pub async fn detailed_health_handler(State(state): State<AppState>) -> (StatusCode, Json<DetailedHealthResponse>) {
    let database = check_database(&state).await;
    let pool_health = ConnectionPoolHealth {
        size: state.db_pool.size(),
        idle_connections: state.db_pool.num_idle(),
        max_connections: state.db_pool.options().get_max_connections(),
    };

    let supervisor = state.supervisor.lock().await;
    let workers: std::collections::HashMap<String, String> = supervisor
        .health()
        .into_iter()
        .map(|(name, health)| {
            let s = match health {
                ServiceHealth::Running => "running",
                ServiceHealth::Stopped => "stopped",
                ServiceHealth::Unhealthy => "unhealthy",
            };
            (name.to_string(), s.to_string())
        })
        .collect();

    let is_healthy = database.status == "ok" && workers.values().all(|s| s != "unhealthy");
    let status_code = if is_healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status_code,
        Json(DetailedHealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            database,
            connection_pool: pool_health,
            workers,
        }),
    )
}
