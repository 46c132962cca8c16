//! Job routes (§6): create, imperative resync, routings list, paginated list.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::common::{Categorizable, CompanyId, JobId, TechnicianId};
use crate::domains::companies::SkillLevel;
use crate::domains::jobs::{Address, Homeowner, Job, JobRepository};
use crate::domains::routings::{JobRouting, RoutingRepository};
use crate::domains::use_cases::{create_job, sync_job, CreateJobInput};
use crate::server::app::AppState;

#[derive(Deserialize)]
pub struct CreateJobRequest {
    pub summary: String,
    pub address: Address,
    pub homeowner: Homeowner,
    pub created_by_company_id: CompanyId,
    pub created_by_technician_id: TechnicianId,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub skill_levels: HashMap<String, SkillLevel>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Serialize)]
pub struct CreateJobResponse {
    pub job: Job,
    pub routings: Vec<JobRouting>,
    pub matching_score: f64,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn categorized_error<E: Categorizable>(err: E) -> (StatusCode, Json<ErrorResponse>) {
    let status = StatusCode::from_u16(err.category().http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse { error: err.safe_message().into_owned() }))
}

pub async fn create_job_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<CreateJobResponse>), (StatusCode, Json<ErrorResponse>)> {
    let input = CreateJobInput {
        summary: request.summary,
        address: request.address,
        homeowner: request.homeowner,
        created_by_company_id: request.created_by_company_id,
        created_by_technician_id: request.created_by_technician_id,
        required_skills: request.required_skills,
        skill_levels: request.skill_levels,
        category: request.category,
    };

    let output = create_job(&state.db_pool, input).await.map_err(categorized_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateJobResponse {
            job: output.job,
            routings: output.routings,
            matching_score: output.average_matching_score,
        }),
    ))
}

#[derive(Deserialize)]
pub struct SyncJobQuery {
    pub company_id: CompanyId,
}

#[derive(Serialize)]
pub struct SyncJobResponse {
    pub synced: bool,
}

/// Imperative resync of a specific job/company routing, bypassing the outbox
/// schedule for operators who don't want to wait out the backoff window.
pub async fn sync_job_handler(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
    Query(query): Query<SyncJobQuery>,
) -> Result<Json<SyncJobResponse>, (StatusCode, Json<ErrorResponse>)> {
    let routing_repo = RoutingRepository::new(&state.db_pool);
    let routings = routing_repo.list_for_job(job_id).await.map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: "an internal error occurred".to_string() }),
        )
    })?;

    let Some(routing) = routings.into_iter().find(|r| r.company_id_received == query.company_id) else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse { error: "no routing found for that job and company".to_string() }),
        ));
    };

    let synced = sync_job(
        &state.db_pool,
        &state.providers,
        &state.rate_limiter,
        routing.id,
        state.config.max_retry_attempts,
    )
    .await
    .map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: "an internal error occurred".to_string() }),
        )
    })?;

    Ok(Json(SyncJobResponse { synced }))
}

pub async fn list_routings_handler(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> Result<Json<Vec<JobRouting>>, (StatusCode, Json<ErrorResponse>)> {
    let routing_repo = RoutingRepository::new(&state.db_pool);
    let routings = routing_repo.list_for_job(job_id).await.map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: "an internal error occurred".to_string() }),
        )
    })?;
    Ok(Json(routings))
}

#[derive(Deserialize)]
pub struct ListJobsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<Job>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

pub async fn list_jobs_handler(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<ListJobsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let jobs = JobRepository::new(&state.db_pool);
    let limit = query.limit.clamp(1, 200);
    let items = jobs.list(limit, query.offset.max(0)).await.map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: "an internal error occurred".to_string() }),
        )
    })?;
    let total = jobs.count().await.map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: "an internal error occurred".to_string() }),
        )
    })?;

    Ok(Json(ListJobsResponse { jobs: items, total, limit, offset: query.offset.max(0) }))
}
