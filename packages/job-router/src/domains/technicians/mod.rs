pub mod model;
pub mod repository;

pub use model::Technician;
pub use repository::TechnicianRepository;
