//! Sync-job use case (C9): drives a single routing through the state machine
//! toward SYNCED, per the algorithm in §4.7.

use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;

use crate::common::{Categorizable, ErrorCategory, JobRoutingId};
use crate::domains::companies::CompanyRepository;
use crate::domains::jobs::JobRepository;
use crate::domains::providers::{ProviderError, ProviderRegistry};
use crate::domains::routings::{JobRouting, RoutingRepository, STUCK_THRESHOLD};
use crate::kernel::rate_limit::RateLimiter;

#[derive(Debug, thiserror::Error)]
enum SyncAttemptError {
    #[error("receiving company not found")]
    CompanyNotFound,
    #[error("job not found")]
    JobNotFound,
    #[error("database error: {0}")]
    Database(#[from] anyhow::Error),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl Categorizable for SyncAttemptError {
    fn category(&self) -> ErrorCategory {
        match self {
            SyncAttemptError::CompanyNotFound | SyncAttemptError::JobNotFound => ErrorCategory::Validation,
            SyncAttemptError::Database(_) => ErrorCategory::Database,
            SyncAttemptError::Provider(e) => e.category(),
        }
    }

    fn safe_message(&self) -> std::borrow::Cow<'static, str> {
        match self {
            SyncAttemptError::CompanyNotFound => "receiving company not found".into(),
            SyncAttemptError::JobNotFound => "job not found".into(),
            SyncAttemptError::Database(_) => "an internal error occurred".into(),
            SyncAttemptError::Provider(e) => e.safe_message(),
        }
    }
}

/// `true` if the routing is already synced/completed (nothing to do), `false`
/// if sync was attempted and did not succeed this time.
pub async fn sync_job(
    db: &PgPool,
    providers: &ProviderRegistry,
    rate_limiter: &RateLimiter,
    routing_id: JobRoutingId,
    max_retry_attempts: u32,
) -> Result<bool> {
    let routing_repo = RoutingRepository::new(db);

    let Some(routing) = routing_repo.find_by_id(routing_id).await? else {
        return Ok(false);
    };

    let now = Utc::now();
    if !routing.can_sync(max_retry_attempts, now) {
        return Ok(matches!(
            routing.sync_status,
            crate::domains::routings::SyncStatus::Synced | crate::domains::routings::SyncStatus::Completed
        ));
    }

    let Some(claimed) = routing_repo
        .try_claim(routing_id, max_retry_attempts, STUCK_THRESHOLD.num_minutes())
        .await?
    else {
        // Someone else claimed it first, or it was no longer claimable; legal no-op.
        return Ok(false);
    };

    let rate_limit_key = format!("sync_job:{}", claimed.company_id_received);
    if !rate_limiter.check_rate_limit(&rate_limit_key, 60, chrono::Duration::minutes(1)) {
        routing_repo
            .mark_failed(routing_id, "rate limit exceeded", max_retry_attempts, true, Utc::now())
            .await?;
        return Ok(false);
    }
    rate_limiter.increment(&rate_limit_key, chrono::Duration::minutes(1));

    // Exactly one provider call per claim. A failure here schedules a follow-up
    // claim via `mark_failed`'s backoff rather than retrying inline — retrying
    // inline would let one `sync_job()` invocation silently absorb multiple
    // provider attempts, undercounting `retry_count` and skipping the
    // intermediate `failed` state a caller polling routing status expects to see.
    match run_sync_attempt(db, providers, &claimed).await {
        Ok(external_id) => {
            routing_repo.mark_synced(routing_id, &external_id, Utc::now()).await?;
            Ok(true)
        }
        Err(error) => {
            let retryable = error.category().is_retryable();
            routing_repo
                .mark_failed(routing_id, &error.to_string(), max_retry_attempts, retryable, Utc::now())
                .await?;
            Ok(false)
        }
    }
}

async fn run_sync_attempt(
    db: &PgPool,
    providers: &ProviderRegistry,
    routing: &JobRouting,
) -> Result<String, SyncAttemptError> {
    let companies = CompanyRepository::new(db);
    let company = companies
        .find_by_id(routing.company_id_received)
        .await?
        .ok_or(SyncAttemptError::CompanyNotFound)?;

    let jobs = JobRepository::new(db);
    let job = jobs.find_by_id(routing.job_id).await?.ok_or(SyncAttemptError::JobNotFound)?;

    let adapter = providers.resolve(company.provider_type);
    let idempotency_key = routing.id.to_string();

    let lead = adapter.create_lead(&job, &company.provider_config, &idempotency_key).await?;

    if lead.success {
        lead.external_id.ok_or_else(|| {
            SyncAttemptError::Provider(ProviderError::Api("provider returned no external_id".to_string()))
        })
    } else {
        Err(SyncAttemptError::Provider(ProviderError::Api(
            lead.error_message.unwrap_or_else(|| "provider rejected lead".to_string()),
        )))
    }
}
