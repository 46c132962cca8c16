// Kernel - core infrastructure with dependency injection
//
// The ServerKernel holds all server dependencies (database, provider registry,
// rate limiter, retry executor) and is threaded through the HTTP layer and the
// background workers.
//
// IMPORTANT: Kernel is for INFRASTRUCTURE only, not business logic.
// Business logic belongs in domain layers (src/domains).

pub mod outbox;
pub mod outbox_worker;
pub mod poll_worker;
pub mod rate_limit;
pub mod record;
pub mod retry;
pub mod server_kernel;
pub mod service;
pub mod supervisor;

pub use outbox_worker::OutboxWorker;
pub use poll_worker::PollWorker;
pub use record::Record;
pub use server_kernel::ServerKernel;
pub use service::{Service, ServiceHealth};
pub use supervisor::WorkerSupervisor;
