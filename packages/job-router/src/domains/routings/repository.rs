//! Persistence and claim logic for job routings.
//!
//! The claim operation (`try_claim`) is the load-bearing piece of the concurrency
//! model: it must guarantee that a single routing is never owned by two sync tasks
//! at once. Grounded on the teacher's `claim_jobs` pattern (CTE + `FOR UPDATE SKIP
//! LOCKED` + conditional `UPDATE ... RETURNING`) used for its background job queue.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::{CompanyId, JobId, JobRoutingId};

use super::model::{JobRouting, SyncStatus};

#[derive(sqlx::FromRow)]
struct RoutingRow {
    id: Uuid,
    job_id: Uuid,
    company_id_received: Uuid,
    external_id: Option<String>,
    sync_status: String,
    retry_count: i32,
    total_sync_attempts: i32,
    next_retry_at: Option<DateTime<Utc>>,
    last_synced_at: Option<DateTime<Utc>>,
    claimed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    revenue: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoutingRow {
    fn into_routing(self) -> Result<JobRouting> {
        Ok(JobRouting {
            id: JobRoutingId::from_uuid(self.id),
            job_id: JobId::from_uuid(self.job_id),
            company_id_received: CompanyId::from_uuid(self.company_id_received),
            external_id: self.external_id,
            sync_status: SyncStatus::from_str(&self.sync_status)?,
            retry_count: self.retry_count as u32,
            total_sync_attempts: self.total_sync_attempts as u32,
            next_retry_at: self.next_retry_at,
            last_synced_at: self.last_synced_at,
            claimed_at: self.claimed_at,
            error_message: self.error_message,
            revenue: self.revenue,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        })
    }
}

pub struct RoutingRepository<'a> {
    db: &'a PgPool,
}

impl<'a> RoutingRepository<'a> {
    pub fn new(db: &'a PgPool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: JobRoutingId) -> Result<Option<JobRouting>> {
        let row = sqlx::query_as::<_, RoutingRow>("SELECT * FROM job_routings WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(self.db)
            .await?;
        row.map(RoutingRow::into_routing).transpose()
    }

    pub async fn list_for_job(&self, job_id: JobId) -> Result<Vec<JobRouting>> {
        let rows = sqlx::query_as::<_, RoutingRow>(
            "SELECT * FROM job_routings WHERE job_id = $1 ORDER BY created_at",
        )
        .bind(job_id.as_uuid())
        .fetch_all(self.db)
        .await?;
        rows.into_iter().map(RoutingRow::into_routing).collect()
    }

    pub async fn insert(&self, routing: &JobRouting) -> Result<JobRouting> {
        let row = sqlx::query_as::<_, RoutingRow>(
            r#"
            INSERT INTO job_routings (id, job_id, company_id_received, sync_status, retry_count, total_sync_attempts)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(routing.id.as_uuid())
        .bind(routing.job_id.as_uuid())
        .bind(routing.company_id_received.as_uuid())
        .bind(routing.sync_status.as_str())
        .bind(routing.retry_count as i32)
        .bind(routing.total_sync_attempts as i32)
        .fetch_one(self.db)
        .await?;
        row.into_routing()
    }

    /// Transaction-scoped twin of [`Self::insert`], for callers that must
    /// persist a routing atomically alongside its job and outbox event.
    pub async fn insert_tx(tx: &mut Transaction<'_, Postgres>, routing: &JobRouting) -> Result<JobRouting> {
        let row = sqlx::query_as::<_, RoutingRow>(
            r#"
            INSERT INTO job_routings (id, job_id, company_id_received, sync_status, retry_count, total_sync_attempts)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(routing.id.as_uuid())
        .bind(routing.job_id.as_uuid())
        .bind(routing.company_id_received.as_uuid())
        .bind(routing.sync_status.as_str())
        .bind(routing.retry_count as i32)
        .bind(routing.total_sync_attempts as i32)
        .fetch_one(&mut **tx)
        .await?;
        row.into_routing()
    }

    /// Atomically transition a routing from a claimable state to `processing`.
    ///
    /// Returns `None` if another task already claimed it (or it is not in a
    /// claimable state), which is the only legal outcome for a competing claimer —
    /// the caller must treat it as a no-op, never an error.
    pub async fn try_claim(
        &self,
        id: JobRoutingId,
        max_retry_attempts: u32,
        stuck_threshold_minutes: i64,
    ) -> Result<Option<JobRouting>> {
        let row = sqlx::query_as::<_, RoutingRow>(
            r#"
            UPDATE job_routings
            SET sync_status = 'processing',
                claimed_at = NOW(),
                total_sync_attempts = total_sync_attempts + 1,
                updated_at = NOW()
            WHERE id = $1
              AND (
                sync_status = 'pending'
                OR (sync_status = 'failed' AND retry_count < $2 AND (next_retry_at IS NULL OR next_retry_at <= NOW()))
                OR (sync_status = 'processing' AND claimed_at <= NOW() - ($3 || ' minutes')::interval)
              )
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(max_retry_attempts as i32)
        .bind(stuck_threshold_minutes.to_string())
        .fetch_optional(self.db)
        .await?;

        row.map(RoutingRow::into_routing).transpose()
    }

    pub async fn mark_synced(
        &self,
        id: JobRoutingId,
        external_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE job_routings
            SET sync_status = 'synced',
                external_id = $2,
                last_synced_at = $3,
                error_message = NULL,
                next_retry_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(external_id)
        .bind(now)
        .execute(self.db)
        .await?;
        Ok(())
    }

    /// Mark a sync attempt failed, bumping `retry_count` and computing the next
    /// backoff deadline, or leaving `next_retry_at` null once retries are exhausted.
    ///
    /// `retryable` reflects the error taxonomy (`ErrorCategory::is_retryable`), not
    /// just the attempt count: a non-retryable error (bad credentials, a
    /// non-rate-limit 4xx) exhausts the routing immediately regardless of how many
    /// attempts remain, since retrying it would just reproduce the same failure.
    pub async fn mark_failed(
        &self,
        id: JobRoutingId,
        error: &str,
        max_retry_attempts: u32,
        retryable: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("routing {id} not found"))?;
        let new_retry_count = if retryable {
            current.retry_count + 1
        } else {
            max_retry_attempts.max(current.retry_count + 1)
        };
        let next_retry_at = if retryable && new_retry_count < max_retry_attempts {
            Some(now + JobRouting::next_retry_delay(new_retry_count))
        } else {
            None
        };

        sqlx::query(
            r#"
            UPDATE job_routings
            SET sync_status = 'failed',
                retry_count = $2,
                next_retry_at = $3,
                error_message = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(new_retry_count as i32)
        .bind(next_retry_at)
        .bind(error)
        .execute(self.db)
        .await?;
        Ok(())
    }

    /// Routings eligible for poll-updates (C10): synced, due for a status check.
    pub async fn synced_due_for_poll(
        &self,
        poll_interval_minutes: i64,
        limit: i64,
    ) -> Result<Vec<JobRouting>> {
        let rows = sqlx::query_as::<_, RoutingRow>(
            r#"
            SELECT * FROM job_routings
            WHERE sync_status = 'synced'
              AND (last_synced_at IS NULL OR last_synced_at <= NOW() - ($1 || ' minutes')::interval)
            ORDER BY last_synced_at NULLS FIRST
            LIMIT $2
            "#,
        )
        .bind(poll_interval_minutes.to_string())
        .bind(limit)
        .fetch_all(self.db)
        .await?;
        rows.into_iter().map(RoutingRow::into_routing).collect()
    }

    pub async fn mark_completed(
        &self,
        id: JobRoutingId,
        revenue: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE job_routings
            SET sync_status = 'completed', last_synced_at = $2, revenue = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(now)
        .bind(revenue)
        .execute(self.db)
        .await?;
        Ok(())
    }

    pub async fn touch_last_synced(&self, id: JobRoutingId, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE job_routings SET last_synced_at = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.as_uuid())
            .bind(now)
            .execute(self.db)
            .await?;
        Ok(())
    }

    /// Routings that a backup sweep should re-enqueue: pending, retry-eligible
    /// failed, or stuck processing — mirrors `try_claim`'s own predicate so the
    /// periodic backup claim (§6 `sync_pending_jobs_interval_seconds`) and the
    /// sync path reclaim the same set of routings.
    pub async fn claimable_backlog(
        &self,
        max_retry_attempts: u32,
        stuck_threshold_minutes: i64,
        limit: i64,
    ) -> Result<Vec<JobRouting>> {
        let rows = sqlx::query_as::<_, RoutingRow>(
            r#"
            SELECT * FROM job_routings
            WHERE sync_status = 'pending'
               OR (sync_status = 'failed' AND retry_count < $1 AND (next_retry_at IS NULL OR next_retry_at <= NOW()))
               OR (sync_status = 'processing' AND claimed_at <= NOW() - ($2 || ' minutes')::interval)
            ORDER BY created_at
            LIMIT $3
            "#,
        )
        .bind(max_retry_attempts as i32)
        .bind(stuck_threshold_minutes.to_string())
        .bind(limit)
        .fetch_all(self.db)
        .await?;
        rows.into_iter().map(RoutingRow::into_routing).collect()
    }
}
