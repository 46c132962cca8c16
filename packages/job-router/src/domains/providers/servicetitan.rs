//! ServiceTitan adapter: OAuth client-credentials exchange with pre-expiry refresh,
//! 4xx mapped to a non-retryable error, 5xx/timeout/network error mapped to retryable.
//! HTTP shape grounded on the teacher's `TavilyClient` (`kernel/tavily_client.rs`):
//! a thin struct around `reqwest::Client`, request/response structs, status check
//! before JSON decode.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domains::jobs::Job;

use super::model::{JobStatusResult, LeadResult, ProviderAdapter, ProviderError};

const TOKEN_REFRESH_SKEW: Duration = Duration::minutes(5);
const REQUIRED_KEYS: &[&str] = &["client_id", "client_secret", "tenant_id"];

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Serialize)]
struct CreateLeadRequest<'a> {
    summary: &'a str,
    street: &'a str,
    city: &'a str,
    state: &'a str,
    zip: &'a str,
    customer_name: &'a str,
    reference_id: &'a str,
}

#[derive(Deserialize)]
struct CreateLeadResponse {
    id: String,
}

#[derive(Deserialize)]
struct JobStatusResponse {
    id: String,
    status: String,
    #[serde(default)]
    revenue: Option<Decimal>,
    #[serde(default)]
    completed_on: Option<DateTime<Utc>>,
}

pub struct ServiceTitanProvider {
    client: reqwest::Client,
    base_url: String,
    auth_url: String,
    /// One cached token per distinct credential pair, keyed by `client_id`.
    /// The adapter instance is shared process-wide across every company
    /// configured with this provider type, so caching under a single slot
    /// would hand company B company A's bearer token whenever A's call
    /// happened to refresh it first.
    tokens: Mutex<HashMap<String, CachedToken>>,
}

impl Default for ServiceTitanProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceTitanProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("failed to build reqwest client"),
            base_url: "https://api.servicetitan.io".to_string(),
            auth_url: "https://auth.servicetitan.io/connect/token".to_string(),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    async fn ensure_token(
        &self,
        config: &HashMap<String, String>,
    ) -> Result<String, ProviderError> {
        let client_id = config
            .get("client_id")
            .ok_or_else(|| ProviderError::NotConfigured("missing client_id".to_string()))?;
        let client_secret = config
            .get("client_secret")
            .ok_or_else(|| ProviderError::NotConfigured("missing client_secret".to_string()))?;

        if let Some(cached) = self.tokens.lock().unwrap().get(client_id).cloned() {
            if Utc::now() + TOKEN_REFRESH_SKEW < cached.expires_at {
                return Ok(cached.access_token);
            }
        }

        let response = self
            .client
            .post(&self.auth_url)
            .form(&TokenRequest {
                grant_type: "client_credentials",
                client_id,
                client_secret,
            })
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(classify_status(response.status()));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let cached = CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        };
        self.tokens.lock().unwrap().insert(client_id.clone(), cached);
        Ok(token.access_token)
    }
}

fn classify_status(status: reqwest::StatusCode) -> ProviderError {
    if status.is_client_error() {
        ProviderError::Api(format!("servicetitan returned {status}"))
    } else {
        ProviderError::Transient(format!("servicetitan returned {status}"))
    }
}

#[async_trait]
impl ProviderAdapter for ServiceTitanProvider {
    async fn create_lead(
        &self,
        job: &Job,
        company_config: &HashMap<String, String>,
        idempotency_key: &str,
    ) -> Result<LeadResult, ProviderError> {
        let token = self.ensure_token(company_config).await?;
        let tenant_id = company_config
            .get("tenant_id")
            .ok_or_else(|| ProviderError::NotConfigured("missing tenant_id".to_string()))?;

        let response = self
            .client
            .post(format!("{}/crm/v2/tenant/{}/leads", self.base_url, tenant_id))
            .bearer_auth(token)
            .header("Idempotency-Key", idempotency_key)
            .json(&CreateLeadRequest {
                summary: &job.summary,
                street: &job.address.street,
                city: &job.address.city,
                state: &job.address.state,
                zip: &job.address.zip_code,
                customer_name: &job.homeowner.name,
                reference_id: idempotency_key,
            })
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(classify_status(response.status()));
        }

        let body: CreateLeadResponse = response
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
        let token = self.ensure_token(company_config).await?;
        let tenant_id = company_config
            .get("tenant_id")
            .ok_or_else(|| ProviderError::NotConfigured("missing tenant_id".to_string()))?;

        let response = self
            .client
            .get(format!(
                "{}/crm/v2/tenant/{}/leads/{}",
                self.base_url, tenant_id, external_id
            ))
            .bearer_auth(token)
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

        let is_completed = body.status.eq_ignore_ascii_case("completed");
        Ok(JobStatusResult {
            external_id: body.id,
            status: body.status,
            is_completed,
            revenue: body.revenue,
            completed_at: body.completed_on,
            error_message: None,
        })
    }

    fn validate_config(&self, config: &HashMap<String, String>) -> bool {
        REQUIRED_KEYS
            .iter()
            .all(|key| config.get(*key).is_some_and(|v| !v.is_empty()))
    }
}
