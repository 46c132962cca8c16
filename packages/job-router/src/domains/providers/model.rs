//! Provider adapter contract (C1): uniform capability for pushing a lead to a
//! downstream company's external system and polling its status back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::common::ErrorCategory;
use crate::domains::jobs::Job;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider not configured: {0}")]
    NotConfigured(String),
    #[error("provider rate limited")]
    RateLimited,
    #[error("provider rejected request: {0}")]
    Api(String),
    #[error("provider call failed transiently: {0}")]
    Transient(String),
}

impl crate::common::Categorizable for ProviderError {
    fn category(&self) -> ErrorCategory {
        match self {
            ProviderError::NotConfigured(_) => ErrorCategory::ProviderNotConfigured,
            ProviderError::RateLimited => ErrorCategory::ProviderRateLimited,
            ProviderError::Api(_) => ErrorCategory::ProviderApiError,
            ProviderError::Transient(_) => ErrorCategory::ProviderTransient,
        }
    }

    fn safe_message(&self) -> std::borrow::Cow<'static, str> {
        // None of ProviderError's variants are Validation/SyncStatus, so none may
        // echo internal detail (credential keys, provider response bodies).
        match self {
            ProviderError::NotConfigured(_) => "provider is not configured".into(),
            ProviderError::RateLimited => "provider rate limit exceeded".into(),
            ProviderError::Api(_) => "provider rejected the request".into(),
            ProviderError::Transient(_) => "provider call failed, will retry".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeadResult {
    pub success: bool,
    pub external_id: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JobStatusResult {
    pub external_id: String,
    pub status: String,
    pub is_completed: bool,
    pub revenue: Option<Decimal>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Uniform capability every provider integration must offer. Implementations own
/// their own HTTP client and authentication; the core never sees provider-specific
/// wire formats past this boundary.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Push a job to the provider as a new lead. `idempotency_key` must be surfaced
    /// to the remote system as a client reference so repeated calls with the same
    /// key return the same `external_id` where the provider supports it.
    async fn create_lead(
        &self,
        job: &Job,
        company_config: &HashMap<String, String>,
        idempotency_key: &str,
    ) -> Result<LeadResult, ProviderError>;

    async fn get_job_status(
        &self,
        external_id: &str,
        company_config: &HashMap<String, String>,
    ) -> Result<JobStatusResult, ProviderError>;

    /// Default implementation issues individual calls sequentially with a small
    /// inter-call pause — never unbounded parallel per company, since the core
    /// relies on per-company serialization for rate-limit compliance.
    async fn batch_get_job_status(
        &self,
        external_ids: &[String],
        company_config: &HashMap<String, String>,
    ) -> Vec<Result<JobStatusResult, ProviderError>> {
        let mut results = Vec::with_capacity(external_ids.len());
        for external_id in external_ids {
            results.push(self.get_job_status(external_id, company_config).await);
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        results
    }

    fn validate_config(&self, config: &HashMap<String, String>) -> bool;
}
