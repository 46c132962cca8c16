//! Job aggregate: a service job requested by one company, routed to others.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use typed_builder::TypedBuilder;

use crate::common::{CompanyId, JobId, TechnicianId};
use crate::domains::companies::SkillLevel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    /// Two-letter state code.
    pub state: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Homeowner {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct Job {
    #[builder(default = JobId::new())]
    pub id: JobId,
    pub summary: String,
    pub address: Address,
    pub homeowner: Homeowner,
    pub created_by_company_id: CompanyId,
    pub created_by_technician_id: TechnicianId,
    #[builder(default)]
    pub required_skills: Vec<String>,
    #[builder(default)]
    pub skill_levels: HashMap<String, SkillLevel>,
    #[builder(default, setter(strip_option))]
    pub category: Option<String>,
    #[builder(default = JobStatus::Pending)]
    pub status: JobStatus,
    #[builder(default, setter(strip_option))]
    pub completed_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub created_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A job is routable iff its required fields are present and it is still pending.
    ///
    /// `summary`/`homeowner.name`/company+technician ids are non-optional in this
    /// struct already; this mirrors the source invariant for callers that build a
    /// `Job` incrementally before validation completes.
    pub fn is_routable(&self) -> bool {
        !self.summary.trim().is_empty()
            && !self.homeowner.name.trim().is_empty()
            && self.status == JobStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::builder()
            .summary("Leak under sink".to_string())
            .address(Address {
                street: "1 Main St".into(),
                city: "Dallas".into(),
                state: "TX".into(),
                zip_code: "75201".into(),
            })
            .homeowner(Homeowner {
                name: "Jane".into(),
                phone: Some("5551234".into()),
                email: None,
            })
            .created_by_company_id(CompanyId::new())
            .created_by_technician_id(TechnicianId::new())
            .required_skills(vec!["plumbing".to_string()])
            .build()
    }

    #[test]
    fn pending_job_with_fields_is_routable() {
        assert!(job().is_routable());
    }

    #[test]
    fn completed_job_is_not_routable() {
        let mut j = job();
        j.status = JobStatus::Completed;
        assert!(!j.is_routable());
    }
}
