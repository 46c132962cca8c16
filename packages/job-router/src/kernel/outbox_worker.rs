//! Outbox worker (C11): long-running loop draining pending/retryable outbox
//! events and dispatching each to its handler — for `job_sync`, a sync task.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;

use crate::common::JobRoutingId;
use crate::config::Config;
use crate::domains::providers::ProviderRegistry;
use crate::domains::routings::{RoutingRepository, STUCK_THRESHOLD};
use crate::domains::use_cases::sync_job;
use crate::kernel::outbox::{EventType, OutboxRepository};
use crate::kernel::rate_limit::RateLimiter;
use crate::kernel::service::{Service, ServiceHealth};

/// How long a routing_id is remembered after being enqueued, to de-duplicate
/// redundant sync dispatches for the same routing within one drain cycle.
const DEDUP_WINDOW_MINUTES: i64 = 5;

struct Dedup {
    seen: Mutex<HashMap<String, chrono::DateTime<Utc>>>,
}

impl Dedup {
    fn new() -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if `key` was already enqueued within the window (and
    /// should be skipped); otherwise records it and returns `false`.
    fn already_enqueued(&self, key: &str) -> bool {
        let mut seen = self.seen.lock().unwrap();
        let now = Utc::now();
        seen.retain(|_, at| now - *at < chrono::Duration::minutes(DEDUP_WINDOW_MINUTES));
        if seen.contains_key(key) {
            true
        } else {
            seen.insert(key.to_string(), now);
            false
        }
    }
}

pub struct OutboxWorker {
    db: sqlx::PgPool,
    config: Arc<Config>,
    providers: Arc<ProviderRegistry>,
    rate_limiter: Arc<RateLimiter>,
    dedup: Dedup,
    healthy: std::sync::atomic::AtomicBool,
}

impl OutboxWorker {
    pub fn new(
        db: sqlx::PgPool,
        config: Arc<Config>,
        providers: Arc<ProviderRegistry>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            db,
            config,
            providers,
            rate_limiter,
            dedup: Dedup::new(),
            healthy: std::sync::atomic::AtomicBool::new(true),
        }
    }

    async fn drain_once(&self) {
        let outbox = OutboxRepository::new(&self.db);

        let retry_limit = (self.config.batch_size as f64 * 0.25).ceil() as i64;
        let pending = match outbox.pending_events(None, self.config.batch_size).await {
            Ok(events) => events,
            Err(err) => {
                tracing::error!(error = %err, "failed to fetch pending outbox events");
                self.healthy.store(false, std::sync::atomic::Ordering::SeqCst);
                return;
            }
        };
        let retries = match outbox.failed_events_for_retry(retry_limit).await {
            Ok(events) => events,
            Err(err) => {
                tracing::error!(error = %err, "failed to fetch retryable outbox events");
                Vec::new()
            }
        };

        self.healthy.store(true, std::sync::atomic::Ordering::SeqCst);

        for event in pending.into_iter().chain(retries) {
            let is_retry = event.status == crate::kernel::outbox::EventStatus::Failed;
            if is_retry {
                match outbox.reset_for_retry(event.id).await {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(err) => {
                        tracing::error!(event_id = %event.id, error = %err, "failed to reset event for retry");
                        continue;
                    }
                }
            }

            match outbox.claim_event(event.id).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    tracing::error!(event_id = %event.id, error = %err, "failed to claim outbox event");
                    continue;
                }
            }

            let dispatch_result = self.dispatch(event.event_type, &event.event_data).await;
            match dispatch_result {
                Ok(()) => {
                    if let Err(err) = outbox.mark_completed(event.id).await {
                        tracing::error!(event_id = %event.id, error = %err, "failed to mark event completed");
                    }
                }
                Err(err) => {
                    tracing::warn!(event_id = %event.id, error = %err, "outbox dispatch failed");
                    if let Err(err) = outbox.mark_failed(event.id, &err).await {
                        tracing::error!(event_id = %event.id, error = %err, "failed to mark event failed");
                    }
                }
            }
        }
    }

    /// Periodic backup sweep (§6 `sync_pending_jobs_interval_seconds`): re-enqueue
    /// a sync outbox event for any routing that is claimable but whose original
    /// outbox event may have been lost or never created (e.g. a stuck `processing`
    /// routing past the reclaim threshold). This guarantees reclaim doesn't depend
    /// solely on an inbound `POST /jobs/{id}/sync` call.
    async fn backup_sweep(&self) {
        let routings = RoutingRepository::new(&self.db);
        let outbox = OutboxRepository::new(&self.db);

        let backlog = match routings
            .claimable_backlog(
                self.config.max_retry_attempts,
                STUCK_THRESHOLD.num_minutes(),
                self.config.batch_size,
            )
            .await
        {
            Ok(backlog) => backlog,
            Err(err) => {
                tracing::error!(error = %err, "failed to fetch claimable backlog");
                return;
            }
        };

        for routing in backlog {
            let routing_id = routing.id.to_string();
            if self.dedup.already_enqueued(&format!("backup:{routing_id}")) {
                continue;
            }
            let event_data = serde_json::json!({
                "routing_id": routing_id,
                "job_id": routing.job_id.to_string(),
                "company_id": routing.company_id_received.to_string(),
            });
            if let Err(err) = outbox
                .create_event(EventType::JobSync, &routing_id, event_data, self.config.max_retry_attempts)
                .await
            {
                tracing::error!(routing_id = %routing_id, error = %err, "failed to enqueue backup sync event");
            }
        }
    }

    async fn dispatch(&self, event_type: EventType, event_data: &serde_json::Value) -> Result<(), String> {
        match event_type {
            EventType::JobSync => {
                let routing_id = event_data
                    .get("routing_id")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "event_data missing routing_id".to_string())?;
                let routing_id = JobRoutingId::parse(routing_id).map_err(|e| e.to_string())?;

                if self.dedup.already_enqueued(&routing_id.to_string()) {
                    return Ok(());
                }

                sync_job(
                    &self.db,
                    &self.providers,
                    &self.rate_limiter,
                    routing_id,
                    self.config.max_retry_attempts,
                )
                .await
                .map_err(|e| e.to_string())?;
                Ok(())
            }
            // The remaining event types are reserved for future fan-out (company
            // resync, provider-wide resync) outside this system's current scope.
            EventType::JobStatusUpdate | EventType::CompanySync | EventType::ProviderSync => Ok(()),
        }
    }
}

#[async_trait]
impl Service for OutboxWorker {
    fn name(&self) -> &'static str {
        "outbox_worker"
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut drain_ticker = tokio::time::interval(self.config.outbox_interval);
        let mut backup_ticker = tokio::time::interval(self.config.sync_pending_jobs_interval);
        loop {
            tokio::select! {
                _ = drain_ticker.tick() => {
                    self.drain_once().await;
                }
                _ = backup_ticker.tick() => {
                    self.backup_sweep().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("outbox worker shutting down");
                        tokio::time::sleep(StdDuration::from_millis(0)).await;
                        break;
                    }
                }
            }
        }
    }

    fn health(&self) -> ServiceHealth {
        if self.healthy.load(std::sync::atomic::Ordering::SeqCst) {
            ServiceHealth::Running
        } else {
            ServiceHealth::Unhealthy
        }
    }
}
