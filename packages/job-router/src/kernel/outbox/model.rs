//! OutboxEvent aggregate (C5): an append-only log entry announcing a domain
//! mutation that must eventually be delivered somewhere else (a sync task, a
//! status-update notification, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::common::OutboxEventId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    JobSync,
    JobStatusUpdate,
    CompanySync,
    ProviderSync,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::JobSync => "job_sync",
            EventType::JobStatusUpdate => "job_status_update",
            EventType::CompanySync => "company_sync",
            EventType::ProviderSync => "provider_sync",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        Ok(match s {
            "job_sync" => EventType::JobSync,
            "job_status_update" => EventType::JobStatusUpdate,
            "company_sync" => EventType::CompanySync,
            "provider_sync" => EventType::ProviderSync,
            other => anyhow::bail!("unknown event_type: {other}"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Processing => "processing",
            EventStatus::Completed => "completed",
            EventStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        Ok(match s {
            "pending" => EventStatus::Pending,
            "processing" => EventStatus::Processing,
            "completed" => EventStatus::Completed,
            "failed" => EventStatus::Failed,
            other => anyhow::bail!("unknown outbox status: {other}"),
        })
    }
}

pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// `failed_events_for_retry` eligibility: `now - processed_at >= base * 3^retry_count`.
pub const RETRY_BASE_MINUTES: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct OutboxEvent {
    #[builder(default = OutboxEventId::new())]
    pub id: OutboxEventId,
    pub event_type: EventType,
    pub aggregate_id: String,
    #[builder(default)]
    pub event_data: serde_json::Value,
    #[builder(default = EventStatus::Pending)]
    pub status: EventStatus,
    #[builder(default = 0)]
    pub retry_count: u32,
    #[builder(default = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,
    #[builder(default, setter(strip_option))]
    pub created_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub processed_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub error_message: Option<String>,
}

impl OutboxEvent {
    /// `retry_count < max_retries AND now - processed_at >= base(5m) * 3^retry_count`.
    pub fn eligible_for_retry(&self, now: DateTime<Utc>) -> bool {
        if self.status != EventStatus::Failed || self.retry_count >= self.max_retries {
            return false;
        }
        let Some(processed_at) = self.processed_at else {
            return true;
        };
        let backoff_minutes = RETRY_BASE_MINUTES * 3i64.pow(self.retry_count);
        now - processed_at >= chrono::Duration::minutes(backoff_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> OutboxEvent {
        OutboxEvent::builder()
            .event_type(EventType::JobSync)
            .aggregate_id("routing-1".to_string())
            .build()
    }

    #[test]
    fn pending_event_is_not_retry_eligible() {
        assert!(!event().eligible_for_retry(Utc::now()));
    }

    #[test]
    fn failed_event_before_backoff_window_is_not_eligible() {
        let mut e = event();
        e.status = EventStatus::Failed;
        e.retry_count = 1;
        e.processed_at = Some(Utc::now());
        assert!(!e.eligible_for_retry(Utc::now()));
    }

    #[test]
    fn failed_event_past_backoff_window_is_eligible() {
        let mut e = event();
        e.status = EventStatus::Failed;
        e.retry_count = 1;
        e.processed_at = Some(Utc::now() - chrono::Duration::minutes(16));
        assert!(e.eligible_for_retry(Utc::now()));
    }

    #[test]
    fn exhausted_retries_are_never_eligible() {
        let mut e = event();
        e.status = EventStatus::Failed;
        e.retry_count = e.max_retries;
        e.processed_at = Some(Utc::now() - chrono::Duration::days(1));
        assert!(!e.eligible_for_retry(Utc::now()));
    }
}
