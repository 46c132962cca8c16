pub mod model;
pub mod repository;

pub use model::{EventStatus, EventType, OutboxEvent, DEFAULT_MAX_RETRIES};
pub use repository::OutboxRepository;
