pub mod model;

pub use model::{find_matching_companies, find_matching_company, CompanyMatch, JobRequirements};
