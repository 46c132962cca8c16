// HTTP routes
pub mod admin;
pub mod health;
pub mod jobs;
pub mod webhooks;
