pub mod model;
pub mod repository;

pub use model::{Address, Homeowner, Job, JobStatus};
pub use repository::JobRepository;
