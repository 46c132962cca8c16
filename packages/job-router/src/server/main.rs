// Main entry point for the job-router server

use std::sync::Arc;

use anyhow::{Context, Result};
use job_router_core::kernel::{OutboxWorker, PollWorker, ServerKernel, WorkerSupervisor};
use job_router_core::server::app::build_app;
use job_router_core::Config;
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},job_router_core=debug,sqlx=warn", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting job router");

    let kernel = Arc::new(ServerKernel::new(config).await.context("failed to build server kernel")?);
    tracing::info!("database connected");

    tracing::info!("running database migrations");
    sqlx::migrate!("./migrations")
        .run(&kernel.db)
        .await
        .context("failed to run migrations")?;
    tracing::info!("migrations complete");

    let outbox_worker = Arc::new(OutboxWorker::new(
        kernel.db.clone(),
        kernel.config.clone(),
        kernel.providers.clone(),
        kernel.rate_limiter.clone(),
    ));
    let poll_worker = Arc::new(PollWorker::new(
        kernel.db.clone(),
        kernel.config.clone(),
        kernel.providers.clone(),
        kernel.rate_limiter.clone(),
        kernel.retry_executor.clone(),
    ));

    let mut supervisor = WorkerSupervisor::new();
    supervisor.register(outbox_worker);
    supervisor.register(poll_worker);
    supervisor.start_all();
    let supervisor = Arc::new(Mutex::new(supervisor));

    let app = build_app(kernel.clone(), supervisor.clone());

    let addr = format!("{}:{}", kernel.config.server_host, kernel.config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await.context("failed to bind to address")?;
    tracing::info!(addr = %addr, "listening");

    let grace_period = kernel.config.shutdown_grace_period;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shutting down workers");
    supervisor.lock().await.stop_all(grace_period).await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
