//! Mock provider: no credentials, persists leads in a shared in-process store so a
//! later status query can observe the lead it created earlier. Grounded on the
//! original implementation's `MockProvider` (`infrastructure/providers/mock/provider.py`):
//! same `mock_`-prefixed generated external_id, same 20%-per-poll completion chance,
//! same `not_found` status for an external_id the store never saw created.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domains::jobs::Job;

use super::model::{JobStatusResult, LeadResult, ProviderAdapter, ProviderError};

fn generate_external_id() -> String {
    const CHARS: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8).map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char).collect();
    format!("mock_{suffix}")
}

#[derive(Debug, Clone)]
struct MockLead {
    status: &'static str,
    revenue: Option<Decimal>,
}

/// Namespaced per process family: one registry shared by every `MockProvider`
/// handle a process creates, so a later poll sees what an earlier sync created.
pub struct MockProvider {
    leads: Mutex<HashMap<String, MockLead>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            leads: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn create_lead(
        &self,
        _job: &Job,
        _company_config: &HashMap<String, String>,
        _idempotency_key: &str,
    ) -> Result<LeadResult, ProviderError> {
        let external_id = generate_external_id();
        self.leads.lock().unwrap().insert(
            external_id.clone(),
            MockLead {
                status: "pending",
                revenue: None,
            },
        );

        Ok(LeadResult {
            success: true,
            external_id: Some(external_id),
            error_message: None,
        })
    }

    async fn get_job_status(
        &self,
        external_id: &str,
        _company_config: &HashMap<String, String>,
    ) -> Result<JobStatusResult, ProviderError> {
        let mut leads = self.leads.lock().unwrap();
        let Some(lead) = leads.get_mut(external_id) else {
            return Ok(JobStatusResult {
                external_id: external_id.to_string(),
                status: "not_found".to_string(),
                is_completed: false,
                revenue: None,
                completed_at: None,
                error_message: Some("job not found in mock system".to_string()),
            });
        };

        // ~20% chance per poll that a still-pending lead completes.
        if lead.status == "pending" && rand::thread_rng().gen_bool(0.2) {
            let revenue: f64 = rand::thread_rng().gen_range(100.0..500.0);
            lead.status = "completed";
            lead.revenue = Decimal::from_f64_retain(revenue);
        }

        let is_completed = lead.status == "completed";
        Ok(JobStatusResult {
            external_id: external_id.to_string(),
            status: lead.status.to_string(),
            is_completed,
            revenue: if is_completed { lead.revenue } else { None },
            completed_at: if is_completed { Some(Utc::now()) } else { None },
            error_message: None,
        })
    }

    fn validate_config(&self, _config: &HashMap<String, String>) -> bool {
        true
    }
}
