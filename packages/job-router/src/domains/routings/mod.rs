pub mod model;
pub mod repository;

pub use model::{JobRouting, SyncStatus, DEFAULT_POLL_INTERVAL_MINUTES, STUCK_THRESHOLD};
pub use repository::RoutingRepository;
