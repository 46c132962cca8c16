//! Application setup and HTTP router.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::{ServerKernel, WorkerSupervisor};
use crate::server::routes::{admin, health, jobs, webhooks};

/// Shared application state, threaded through every handler via `State`.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub config: Arc<crate::config::Config>,
    pub providers: Arc<crate::domains::providers::ProviderRegistry>,
    pub rate_limiter: Arc<crate::kernel::rate_limit::RateLimiter>,
    pub supervisor: Arc<tokio::sync::Mutex<WorkerSupervisor>>,
}

/// Build the Axum application router from a [`ServerKernel`] and the worker
/// supervisor managing the outbox/poll workers.
///
/// Thin by design: handlers deserialize the request, call a use case, and map
/// the `Result` through `Categorizable` to an HTTP status + JSON body. No auth
/// layer, no rate-limit middleware on the HTTP surface itself — the CORS and
/// tracing layers below are the only ambient middleware.
pub fn build_app(kernel: Arc<ServerKernel>, supervisor: Arc<tokio::sync::Mutex<WorkerSupervisor>>) -> Router {
    let state = AppState {
        db_pool: kernel.db.clone(),
        config: kernel.config.clone(),
        providers: kernel.providers.clone(),
        rate_limiter: kernel.rate_limiter.clone(),
        supervisor,
    };

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST]);

    Router::new()
        .route("/jobs", post(jobs::create_job_handler).get(jobs::list_jobs_handler))
        .route("/jobs/:job_id/sync", post(jobs::sync_job_handler))
        .route("/jobs/:job_id/routings", get(jobs::list_routings_handler))
        .route("/webhooks/:provider_type", post(webhooks::webhook_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::readiness_handler))
        .route("/health/live", get(health::liveness_handler))
        .route("/health/detailed", get(health::detailed_health_handler))
        .route("/admin/workers/status", get(admin::workers_status_handler))
        .route("/admin/workers/stats", get(admin::workers_stats_handler))
        .route("/admin/workers/start", post(admin::workers_start_handler))
        .route("/admin/workers/stop", post(admin::workers_stop_handler))
        .route("/admin/workers/:name/restart", post(admin::worker_restart_handler))
        .route("/admin/system/health", get(admin::system_health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
