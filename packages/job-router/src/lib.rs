// Job Router — integration core
//
// Accepts newly created service jobs, matches each to the best downstream
// company by skill, and reliably syncs it to that company's external
// provider (ServiceTitan, HousecallPro, or a mock), retrying on failure and
// polling for completion and revenue.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::Config;
