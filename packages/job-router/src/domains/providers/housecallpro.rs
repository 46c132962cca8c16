//! HousecallPro adapter: API-key auth, no OAuth dance. Webhooks are not implemented
//! by the core (see SPEC_FULL.md's webhook stub); this adapter only ever polls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domains::jobs::Job;

use super::model::{JobStatusResult, LeadResult, ProviderAdapter, ProviderError};

const REQUIRED_KEYS: &[&str] = &["api_key", "company_id"];

#[derive(Serialize)]
struct CreateJobRequest<'a> {
    description: &'a str,
    address: AddressPayload<'a>,
    customer_name: &'a str,
    external_reference: &'a str,
}

#[derive(Serialize)]
struct AddressPayload<'a> {
    street: &'a str,
    city: &'a str,
    state: &'a str,
    zip: &'a str,
}

#[derive(Deserialize)]
struct CreateJobResponse {
    id: String,
}

#[derive(Deserialize)]
struct JobStatusResponse {
    id: String,
    work_status: String,
    #[serde(default)]
    total_amount: Option<Decimal>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

pub struct HousecallProProvider {
    client: reqwest::Client,
    base_url: String,
}

impl Default for HousecallProProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HousecallProProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("failed to build reqwest client"),
            base_url: "https://api.housecallpro.com".to_string(),
        }
    }
}

fn classify_status(status: reqwest::StatusCode) -> ProviderError {
    if status.as_u16() == 429 {
        ProviderError::RateLimited
    } else if status.is_client_error() {
        ProviderError::Api(format!("housecallpro returned {status}"))
    } else {
        ProviderError::Transient(format!("housecallpro returned {status}"))
    }
}

#[async_trait]
impl ProviderAdapter for HousecallProProvider {
    async fn create_lead(
        &self,
        job: &Job,
        company_config: &HashMap<String, String>,
        idempotency_key: &str,
    ) -> Result<LeadResult, ProviderError> {
        let api_key = company_config
            .get("api_key")
            .ok_or_else(|| ProviderError::NotConfigured("missing api_key".to_string()))?;

        let response = self
            .client
            .post(format!("{}/jobs", self.base_url))
            .bearer_auth(api_key)
            .header("Idempotency-Key", idempotency_key)
            .json(&CreateJobRequest {
                description: &job.summary,
                address: AddressPayload {
                    street: &job.address.street,
                    city: &job.address.city,
                    state: &job.address.state,
                    zip: &job.address.zip_code,
                },
                customer_name: &job.homeowner.name,
                external_reference: idempotency_key,
            })
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(classify_status(response.status()));
        }

        let body: CreateJobResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        Ok(LeadResult {
            success: true,
            external_id: Some(body.id),
            error_message: None,
        })
    }

    async fn get_job_status(
        &self,
        external_id: &str,
        company_config: &HashMap<String, String>,
    ) -> Result<JobStatusResult, ProviderError> {
        let api_key = company_config
            .get("api_key")
            .ok_or_else(|| ProviderError::NotConfigured("missing api_key".to_string()))?;

        let response = self
            .client
            .get(format!("{}/jobs/{}", self.base_url, external_id))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(classify_status(response.status()));
        }

        let body: JobStatusResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let is_completed = body.work_status.eq_ignore_ascii_case("completed");
        Ok(JobStatusResult {
            external_id: body.id,
            status: body.work_status,
            is_completed,
            revenue: body.total_amount,
            completed_at: body.completed_at,
            error_message: None,
        })
    }

    fn validate_config(&self, config: &HashMap<String, String>) -> bool {
        REQUIRED_KEYS
            .iter()
            .all(|key| config.get(*key).is_some_and(|v| !v.is_empty()))
    }
}
