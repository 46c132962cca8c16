//! JobRouting aggregate: a job's routing to one specific receiving company.
//!
//! This is where the sync-job state machine (C9 in the routing design) lives.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::common::{CompanyId, JobId, JobRoutingId};

/// A routing's stuck threshold: past this age in `processing`, it is reclaimable.
pub const STUCK_THRESHOLD: Duration = Duration::minutes(10);

/// Minimum spacing between polls of the same synced routing (§6 `sync_interval_minutes`).
pub const DEFAULT_POLL_INTERVAL_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Processing,
    Synced,
    Failed,
    Completed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Processing => "processing",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
            SyncStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        Ok(match s {
            "pending" => SyncStatus::Pending,
            "processing" => SyncStatus::Processing,
            "synced" => SyncStatus::Synced,
            "failed" => SyncStatus::Failed,
            "completed" => SyncStatus::Completed,
            other => anyhow::bail!("unknown sync_status: {other}"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct JobRouting {
    #[builder(default = JobRoutingId::new())]
    pub id: JobRoutingId,
    pub job_id: JobId,
    pub company_id_received: CompanyId,
    #[builder(default, setter(strip_option))]
    pub external_id: Option<String>,
    #[builder(default = SyncStatus::Pending)]
    pub sync_status: SyncStatus,
    #[builder(default = 0)]
    pub retry_count: u32,
    #[builder(default = 0)]
    pub total_sync_attempts: u32,
    #[builder(default, setter(strip_option))]
    pub next_retry_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub claimed_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub error_message: Option<String>,
    #[builder(default, setter(strip_option))]
    pub revenue: Option<Decimal>,
    #[builder(default, setter(strip_option))]
    pub created_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub updated_at: Option<DateTime<Utc>>,
}

impl JobRouting {
    /// Whether this routing may legally enter `processing` right now.
    ///
    /// True for `pending`, for `failed` with retries remaining once its backoff
    /// deadline has passed, and for `processing` routings stuck past the reclaim
    /// threshold (§4.7's resolved stuck-routing reclaim decision — see SPEC_FULL.md).
    pub fn can_sync(&self, max_retry_attempts: u32, now: DateTime<Utc>) -> bool {
        match self.sync_status {
            SyncStatus::Pending => true,
            SyncStatus::Failed => {
                self.retry_count < max_retry_attempts
                    && self.next_retry_at.is_none_or(|at| now >= at)
            }
            SyncStatus::Processing => self.is_stuck(now),
            SyncStatus::Synced | SyncStatus::Completed => false,
        }
    }

    pub fn is_stuck(&self, now: DateTime<Utc>) -> bool {
        self.sync_status == SyncStatus::Processing
            && self
                .claimed_at
                .is_some_and(|claimed| now - claimed > STUCK_THRESHOLD)
    }

    /// `next_retry_at` per the transition rule: `now + min(20m, 5m * 2^(retry_count-1))`.
    pub fn next_retry_delay(retry_count_after_failure: u32) -> Duration {
        let minutes = 5i64
            .checked_shl(retry_count_after_failure.saturating_sub(1))
            .unwrap_or(i64::MAX)
            .min(20);
        Duration::minutes(minutes)
    }

    pub fn should_poll(&self, poll_interval_minutes: i64, now: DateTime<Utc>) -> bool {
        self.sync_status == SyncStatus::Synced
            && self.last_synced_at.is_none_or(|last| {
                now - last >= Duration::minutes(poll_interval_minutes)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routing() -> JobRouting {
        JobRouting::builder()
            .job_id(JobId::new())
            .company_id_received(CompanyId::new())
            .build()
    }

    #[test]
    fn pending_can_always_sync() {
        assert!(routing().can_sync(3, Utc::now()));
    }

    #[test]
    fn failed_with_retries_and_elapsed_backoff_can_sync() {
        let mut r = routing();
        r.sync_status = SyncStatus::Failed;
        r.retry_count = 1;
        r.next_retry_at = Some(Utc::now() - Duration::minutes(1));
        assert!(r.can_sync(3, Utc::now()));
    }

    #[test]
    fn failed_with_future_backoff_cannot_sync() {
        let mut r = routing();
        r.sync_status = SyncStatus::Failed;
        r.retry_count = 1;
        r.next_retry_at = Some(Utc::now() + Duration::minutes(5));
        assert!(!r.can_sync(3, Utc::now()));
    }

    #[test]
    fn failed_at_max_retries_cannot_sync() {
        let mut r = routing();
        r.sync_status = SyncStatus::Failed;
        r.retry_count = 3;
        assert!(!r.can_sync(3, Utc::now()));
    }

    #[test]
    fn processing_not_yet_stuck_cannot_sync() {
        let mut r = routing();
        r.sync_status = SyncStatus::Processing;
        r.claimed_at = Some(Utc::now());
        assert!(!r.can_sync(3, Utc::now()));
    }

    #[test]
    fn processing_stuck_past_threshold_can_sync() {
        let mut r = routing();
        r.sync_status = SyncStatus::Processing;
        r.claimed_at = Some(Utc::now() - Duration::minutes(11));
        assert!(r.can_sync(3, Utc::now()));
    }

    #[test]
    fn terminal_states_cannot_sync() {
        let mut r = routing();
        r.sync_status = SyncStatus::Synced;
        assert!(!r.can_sync(3, Utc::now()));
        r.sync_status = SyncStatus::Completed;
        assert!(!r.can_sync(3, Utc::now()));
    }

    #[test]
    fn retry_delay_caps_at_twenty_minutes() {
        assert_eq!(JobRouting::next_retry_delay(1), Duration::minutes(5));
        assert_eq!(JobRouting::next_retry_delay(2), Duration::minutes(10));
        assert_eq!(JobRouting::next_retry_delay(3), Duration::minutes(20));
        assert_eq!(JobRouting::next_retry_delay(4), Duration::minutes(20));
    }

    #[test]
    fn should_poll_respects_interval() {
        let mut r = routing();
        r.sync_status = SyncStatus::Synced;
        r.last_synced_at = Some(Utc::now() - Duration::minutes(5));
        assert!(!r.should_poll(30, Utc::now()));
        r.last_synced_at = Some(Utc::now() - Duration::minutes(31));
        assert!(r.should_poll(30, Utc::now()));
    }
}
