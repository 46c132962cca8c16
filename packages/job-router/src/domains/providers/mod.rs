pub mod housecallpro;
pub mod mock;
pub mod model;
pub mod registry;
pub mod servicetitan;

pub use model::{JobStatusResult, LeadResult, ProviderAdapter, ProviderError};
pub use registry::ProviderRegistry;
