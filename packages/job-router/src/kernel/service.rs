//! Minimal contract for a long-running background loop (C11/C13), managed by
//! the worker supervisor (C14). Modeled after the teacher's `Base*Service`
//! traits (`kernel/traits.rs`): a small `Send + Sync` async trait, one
//! responsibility per implementor.

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceHealth {
    Running,
    Stopped,
    Unhealthy,
}

#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run the service loop until `shutdown` resolves. Implementors must observe
    /// the signal promptly, finish in-flight work within the configured grace
    /// period, and return rather than abort mid-write.
    async fn run(&self, shutdown: tokio::sync::watch::Receiver<bool>);

    fn health(&self) -> ServiceHealth;
}
