pub mod create_job;
pub mod poll_updates;
pub mod sync_job;

pub use create_job::{create_job, CreateJobError, CreateJobInput, CreateJobOutput};
pub use poll_updates::{poll_updates, PollUpdatesReport};
pub use sync_job::sync_job;
