//! Create-job use case (C8): validate, match, and persist job + routings + outbox
//! events atomically.

use std::collections::HashMap;

use anyhow::Result;
use sqlx::PgPool;

use crate::common::{Categorizable, CompanyId, ErrorCategory, TechnicianId};
use crate::domains::companies::{CompanyRepository, SkillLevel};
use crate::domains::jobs::{Address, Homeowner, Job, JobRepository};
use crate::domains::matching::{find_matching_companies, JobRequirements};
use crate::domains::routings::{JobRouting, RoutingRepository};
use crate::kernel::outbox::{EventType, OutboxRepository};

#[derive(Debug, thiserror::Error)]
pub enum CreateJobError {
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl Categorizable for CreateJobError {
    fn category(&self) -> ErrorCategory {
        match self {
            CreateJobError::Validation(_) => ErrorCategory::Validation,
            CreateJobError::Database(_) => ErrorCategory::Database,
        }
    }

    fn safe_message(&self) -> std::borrow::Cow<'static, str> {
        match self {
            CreateJobError::Validation(msg) => msg.clone().into(),
            CreateJobError::Database(_) => "an internal error occurred".into(),
        }
    }
}

pub struct CreateJobInput {
    pub summary: String,
    pub address: Address,
    pub homeowner: Homeowner,
    pub created_by_company_id: CompanyId,
    pub created_by_technician_id: TechnicianId,
    pub required_skills: Vec<String>,
    pub skill_levels: HashMap<String, SkillLevel>,
    pub category: Option<String>,
}

pub struct CreateJobOutput {
    pub job: Job,
    pub routings: Vec<JobRouting>,
    pub average_matching_score: f64,
}

/// Maximum number of companies a single job is routed to. The distilled spec's
/// policy is "one routing per returned match"; this caps how many matches C4
/// is asked to return in the first place.
const MAX_ROUTINGS_PER_JOB: usize = 5;

pub async fn create_job(db: &PgPool, input: CreateJobInput) -> Result<CreateJobOutput, CreateJobError> {
    if input.summary.trim().is_empty() {
        return Err(CreateJobError::Validation("summary must not be empty".to_string()));
    }
    if input.homeowner.name.trim().is_empty() {
        return Err(CreateJobError::Validation("homeowner name must not be empty".to_string()));
    }
    for skill in &input.required_skills {
        if skill.trim().is_empty() {
            return Err(CreateJobError::Validation("required_skills must not contain empty strings".to_string()));
        }
    }
    for skill in input.skill_levels.keys() {
        if !input.required_skills.contains(skill) {
            return Err(CreateJobError::Validation(format!(
                "skill_levels key '{skill}' is not in required_skills"
            )));
        }
    }

    let mut tx = db.begin().await.map_err(anyhow::Error::from)?;

    let requesting_company = CompanyRepository::find_by_id_tx(&mut tx, input.created_by_company_id)
        .await?
        .ok_or_else(|| CreateJobError::Validation("requesting company not found".to_string()))?;

    let technician = crate::domains::technicians::TechnicianRepository::find_by_id_tx(
        &mut tx,
        input.created_by_technician_id,
    )
    .await?
    .ok_or_else(|| CreateJobError::Validation("technician not found".to_string()))?;
    if technician.company_id != requesting_company.id {
        return Err(CreateJobError::Validation(
            "technician does not belong to the requesting company".to_string(),
        ));
    }

    let candidates = CompanyRepository::active_with_skills_tx(&mut tx).await?;

    let requirements = JobRequirements {
        required_skills: input.required_skills.clone(),
        skill_levels: input.skill_levels.clone(),
        category: input.category.clone(),
    };
    let matches: Vec<_> = find_matching_companies(&requirements, &candidates, MAX_ROUTINGS_PER_JOB)
        .into_iter()
        .filter(|m| m.company_id != input.created_by_company_id)
        .collect();

    if matches.is_empty() {
        return Err(CreateJobError::Validation(
            "no matching companies found for this job's required skills".to_string(),
        ));
    }

    let job = Job::builder()
        .summary(input.summary)
        .address(input.address)
        .homeowner(input.homeowner)
        .created_by_company_id(input.created_by_company_id)
        .created_by_technician_id(input.created_by_technician_id)
        .required_skills(input.required_skills)
        .skill_levels(input.skill_levels)
        .maybe_category(input.category)
        .build();
    let job = JobRepository::insert_tx(&mut tx, &job).await?;

    let mut routings = Vec::with_capacity(matches.len());
    let mut total_score = 0.0;

    for m in &matches {
        let routing = JobRouting::builder()
            .job_id(job.id)
            .company_id_received(m.company_id)
            .build();
        let routing = RoutingRepository::insert_tx(&mut tx, &routing).await?;

        let company_provider_type = candidates
            .iter()
            .find(|c| c.id == m.company_id)
            .map(|c| c.provider_type.as_str());

        let event_data = serde_json::json!({
            "routing_id": routing.id.to_string(),
            "job_id": job.id.to_string(),
            "company_id": m.company_id.to_string(),
            "matching_score": m.score,
            "matched_skills": m.matched_skills,
            "provider_type": company_provider_type,
        });
        OutboxRepository::create_event_tx(&mut tx, EventType::JobSync, &routing.id.to_string(), event_data, 3)
            .await?;

        total_score += m.score;
        routings.push(routing);
    }

    tx.commit().await.map_err(anyhow::Error::from)?;

    let average_matching_score = total_score / routings.len() as f64;

    Ok(CreateJobOutput {
        job,
        routings,
        average_matching_score,
    })
}
