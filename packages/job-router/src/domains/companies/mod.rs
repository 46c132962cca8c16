pub mod model;
pub mod repository;

pub use model::{Company, CompanySkill, ProviderType, SkillLevel};
pub use repository::CompanyRepository;
