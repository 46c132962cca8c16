//! Poll worker (C13): invokes poll-updates on an interval, wrapped with the
//! rate limiter (one key globally) and the retry executor
//! (`operation_key = poll_job_updates`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::config::Config;
use crate::domains::providers::ProviderRegistry;
use crate::domains::use_cases::poll_updates;
use crate::kernel::rate_limit::RateLimiter;
use crate::kernel::retry::RetryExecutor;
use crate::kernel::service::{Service, ServiceHealth};

const RATE_LIMIT_KEY: &str = "poll_job_updates";
const RATE_LIMIT_MAX: u32 = 1;
const OPERATION_KEY: &str = "poll_job_updates";

pub struct PollWorker {
    db: sqlx::PgPool,
    config: Arc<Config>,
    providers: Arc<ProviderRegistry>,
    rate_limiter: Arc<RateLimiter>,
    retry_executor: Arc<RetryExecutor>,
    healthy: AtomicBool,
}

impl PollWorker {
    pub fn new(
        db: sqlx::PgPool,
        config: Arc<Config>,
        providers: Arc<ProviderRegistry>,
        rate_limiter: Arc<RateLimiter>,
        retry_executor: Arc<RetryExecutor>,
    ) -> Self {
        Self {
            db,
            config,
            providers,
            rate_limiter,
            retry_executor,
            healthy: AtomicBool::new(true),
        }
    }

    async fn tick(&self) {
        let window = chrono::Duration::from_std(self.config.poll_interval)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        if !self
            .rate_limiter
            .check_rate_limit(RATE_LIMIT_KEY, RATE_LIMIT_MAX, window)
        {
            tracing::debug!("poll_job_updates rate limited, skipping tick");
            return;
        }
        self.rate_limiter.increment(RATE_LIMIT_KEY, window);

        let result = self
            .retry_executor
            .execute_with_retry(OPERATION_KEY, 3, std::time::Duration::from_secs(1), || async {
                poll_updates(&self.db, &self.providers, self.config.polling_batch_size)
                    .await
                    .map_err(|e| e.to_string())
            })
            .await;

        match result {
            Ok(report) => {
                self.healthy.store(true, Ordering::SeqCst);
                if !report.errors.is_empty() {
                    tracing::warn!(errors = ?report.errors, "poll-updates completed with errors");
                }
                tracing::info!(
                    total_polled = report.total_polled,
                    updated = report.updated,
                    completed = report.completed,
                    "poll-updates tick finished"
                );
            }
            Err(err) => {
                tracing::error!(error = %err, "poll-updates tick failed");
                self.healthy.store(false, Ordering::SeqCst);
            }
        }
    }
}

#[async_trait]
impl Service for PollWorker {
    fn name(&self) -> &'static str {
        "poll_worker"
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("poll worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    fn health(&self) -> ServiceHealth {
        if self.healthy.load(Ordering::SeqCst) {
            ServiceHealth::Running
        } else {
            ServiceHealth::Unhealthy
        }
    }
}
