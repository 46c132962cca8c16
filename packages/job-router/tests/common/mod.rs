//! Shared test infrastructure: one Postgres container, reused across tests,
//! with migrations run once. Grounded on the teacher's
//! `tests/common/harness.rs` shared-container pattern, minus Redis (this
//! system has no cache dependency) and seesaw wiring (this system has no
//! effect engine).

use anyhow::{Context, Result};
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct SharedInfra {
    db_url: String,
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedInfra> = OnceCell::const_new();

impl SharedInfra {
    async fn init() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default().start().await.context("failed to start postgres container")?;
        let host = postgres.get_host().await?;
        let port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

        let pool = PgPool::connect(&db_url).await.context("failed to connect for migrations")?;
        sqlx::migrate!("./migrations").run(&pool).await.context("failed to run migrations")?;
        pool.close().await;

        Ok(Self { db_url, _postgres: postgres })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA.get_or_init(|| async { Self::init().await.expect("failed to init shared test infra") }).await
    }
}

/// A fresh connection pool against the shared (already-migrated) database.
pub async fn test_pool() -> PgPool {
    let infra = SharedInfra::get().await;
    PgPool::connect(&infra.db_url).await.expect("failed to connect to test database")
}
