use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
///
/// Loaded once in `main`, then wrapped in `Arc` and threaded through the kernel.
/// No global mutable config singleton.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_pool_size: u32,
    pub database_pool_overflow: u32,

    pub server_host: String,
    pub server_port: u16,

    pub log_level: String,

    pub outbox_interval: Duration,
    pub poll_interval: Duration,
    pub sync_pending_jobs_interval: Duration,
    pub retry_failed_jobs_interval: Duration,
    pub sync_interval_minutes: i64,

    pub max_retry_attempts: u32,
    pub retry_backoff_factor: u32,
    pub batch_size: i64,
    pub polling_batch_size: i64,

    pub task_time_limit: Duration,
    pub task_soft_time_limit: Duration,

    pub shutdown_grace_period: Duration,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .with_context(|| format!("{key} must be a valid value")),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables, applying the defaults
    /// named throughout the spec's configuration table.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_pool_size: env_parse_or("DATABASE_POOL_SIZE", 10)?,
            database_pool_overflow: env_parse_or("DATABASE_POOL_OVERFLOW", 20)?,

            server_host: env_or("SERVER_HOST", "0.0.0.0"),
            server_port: env_parse_or("SERVER_PORT", 8080)?,

            log_level: env_or("LOG_LEVEL", "info"),

            outbox_interval: Duration::from_secs(env_parse_or("OUTBOX_INTERVAL_SECONDS", 30)?),
            poll_interval: Duration::from_secs(env_parse_or("POLL_INTERVAL_SECONDS", 60)?),
            sync_pending_jobs_interval: Duration::from_secs(env_parse_or(
                "SYNC_PENDING_JOBS_INTERVAL_SECONDS",
                120,
            )?),
            retry_failed_jobs_interval: Duration::from_secs(env_parse_or(
                "RETRY_FAILED_JOBS_INTERVAL_SECONDS",
                600,
            )?),
            sync_interval_minutes: env_parse_or("SYNC_INTERVAL_MINUTES", 30)?,

            max_retry_attempts: env_parse_or("MAX_RETRY_ATTEMPTS", 3)?,
            retry_backoff_factor: env_parse_or("RETRY_BACKOFF_FACTOR", 2)?,
            batch_size: env_parse_or("BATCH_SIZE", 50)?,
            polling_batch_size: env_parse_or("POLLING_BATCH_SIZE", 100)?,

            task_time_limit: Duration::from_secs(env_parse_or("TASK_TIME_LIMIT_SECONDS", 600)?),
            task_soft_time_limit: Duration::from_secs(env_parse_or(
                "TASK_SOFT_TIME_LIMIT_SECONDS",
                480,
            )?),

            shutdown_grace_period: Duration::from_secs(env_parse_or(
                "SHUTDOWN_GRACE_PERIOD_SECONDS",
                30,
            )?),
        })
    }
}
