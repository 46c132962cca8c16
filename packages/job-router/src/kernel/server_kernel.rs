// ServerKernel - core infrastructure with all dependencies
//
// The ServerKernel holds all server dependencies (database, providers, shared
// worker state) and provides access to the HTTP layer and the background
// workers. Business logic never lives here.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;
use crate::domains::providers::ProviderRegistry;
use crate::kernel::rate_limit::RateLimiter;
use crate::kernel::retry::RetryExecutor;

/// ServerKernel holds all server dependencies
pub struct ServerKernel {
    pub config: Arc<Config>,
    pub db: PgPool,
    pub providers: Arc<ProviderRegistry>,
    pub rate_limiter: Arc<RateLimiter>,
    pub retry_executor: Arc<RetryExecutor>,
}

impl ServerKernel {
    pub async fn new(config: Config) -> Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.database_pool_size + config.database_pool_overflow)
            .connect(&config.database_url)
            .await
            .context("failed to connect to database")?;

        Ok(Self {
            config: Arc::new(config),
            db,
            providers: Arc::new(ProviderRegistry::new()),
            rate_limiter: Arc::new(RateLimiter::new()),
            retry_executor: Arc::new(RetryExecutor::new()),
        })
    }
}
