//! Persistence for jobs.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::{CompanyId, JobId, TechnicianId};

use super::model::{Address, Homeowner, Job, JobStatus};

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    created_by_company_id: Uuid,
    created_by_technician_id: Uuid,
    summary: String,
    street: String,
    city: String,
    state: String,
    zip_code: String,
    homeowner_name: String,
    homeowner_phone: Option<String>,
    homeowner_email: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    status: String,
    required_skills: Option<serde_json::Value>,
    skill_levels: Option<serde_json::Value>,
    category: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRow {
    fn into_job(self) -> Result<Job> {
        Ok(Job {
            id: JobId::from_uuid(self.id),
            summary: self.summary,
            address: Address {
                street: self.street,
                city: self.city,
                state: self.state,
                zip_code: self.zip_code,
            },
            homeowner: Homeowner {
                name: self.homeowner_name,
                phone: self.homeowner_phone,
                email: self.homeowner_email,
            },
            created_by_company_id: CompanyId::from_uuid(self.created_by_company_id),
            created_by_technician_id: TechnicianId::from_uuid(self.created_by_technician_id),
            required_skills: self
                .required_skills
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default(),
            skill_levels: self
                .skill_levels
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default(),
            category: self.category,
            status: parse_status(&self.status)?,
            completed_at: self.completed_at,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        })
    }
}

pub struct JobRepository<'a> {
    db: &'a PgPool,
}

impl<'a> JobRepository<'a> {
    pub fn new(db: &'a PgPool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: JobId) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(self.db)
            .await?;
        row.map(JobRow::into_job).transpose()
    }

    pub async fn insert(&self, job: &Job) -> Result<Job> {
        let required_skills = serde_json::to_value(&job.required_skills)?;
        let skill_levels = serde_json::to_value(&job.skill_levels)?;

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs (
                id, created_by_company_id, created_by_technician_id, summary,
                street, city, state, zip_code,
                homeowner_name, homeowner_phone, homeowner_email,
                status, required_skills, skill_levels, category
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.created_by_company_id.as_uuid())
        .bind(job.created_by_technician_id.as_uuid())
        .bind(&job.summary)
        .bind(&job.address.street)
        .bind(&job.address.city)
        .bind(&job.address.state)
        .bind(&job.address.zip_code)
        .bind(&job.homeowner.name)
        .bind(&job.homeowner.phone)
        .bind(&job.homeowner.email)
        .bind(status_str(job.status))
        .bind(required_skills)
        .bind(skill_levels)
        .bind(&job.category)
        .fetch_one(self.db)
        .await?;

        row.into_job()
    }

    /// Transaction-scoped twin of [`Self::insert`], for callers that must
    /// persist a job atomically alongside its routings and outbox events.
    pub async fn insert_tx(tx: &mut Transaction<'_, Postgres>, job: &Job) -> Result<Job> {
        let required_skills = serde_json::to_value(&job.required_skills)?;
        let skill_levels = serde_json::to_value(&job.skill_levels)?;

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs (
                id, created_by_company_id, created_by_technician_id, summary,
                street, city, state, zip_code,
                homeowner_name, homeowner_phone, homeowner_email,
                status, required_skills, skill_levels, category
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.created_by_company_id.as_uuid())
        .bind(job.created_by_technician_id.as_uuid())
        .bind(&job.summary)
        .bind(&job.address.street)
        .bind(&job.address.city)
        .bind(&job.address.state)
        .bind(&job.address.zip_code)
        .bind(&job.homeowner.name)
        .bind(&job.homeowner.phone)
        .bind(&job.homeowner.email)
        .bind(status_str(job.status))
        .bind(required_skills)
        .bind(skill_levels)
        .bind(&job.category)
        .fetch_one(&mut **tx)
        .await?;

        row.into_job()
    }

    /// Paginated list of jobs, most recently created first.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM jobs ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db)
        .await?;
        rows.into_iter().map(JobRow::into_job).collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs")
            .fetch_one(self.db)
            .await?;
        Ok(count)
    }

    /// Mark a job completed as part of poll-updates (C10) — called when a routing's
    /// revenue-bearing provider status transitions a routing to COMPLETED.
    pub async fn mark_completed(&self, id: JobId, completed_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed', completed_at = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(completed_at)
        .execute(self.db)
        .await?;
        Ok(())
    }
}

fn parse_status(s: &str) -> Result<JobStatus> {
    Ok(match s {
        "pending" => JobStatus::Pending,
        "completed" => JobStatus::Completed,
        other => anyhow::bail!("unknown job status: {other}"),
    })
}

fn status_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Completed => "completed",
    }
}
