//! Typed ID definitions for all domain entities.
//!
//! This module defines type aliases for each domain entity, providing
//! compile-time type safety for ID usage throughout the application.
//!
//! # Example
//!
//! ```rust
//! use crate::common::{CompanyId, JobId};
//!
//! // These are incompatible types - compiler prevents mixing them up
//! let company_id: CompanyId = CompanyId::new();
//! let job_id: JobId = JobId::new();
//!
//! // This would be a compile error:
//! // let wrong: JobId = company_id;
//! ```

// Re-export the core Id type and version markers
pub use super::id::{Id, V4, V7};

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Company entities (downstream companies that receive jobs).
pub struct Company;

/// Marker type for Technician entities.
pub struct Technician;

/// Marker type for Job entities.
pub struct Job;

/// Marker type for JobRouting entities (a job's routing to one company).
pub struct JobRouting;

/// Marker type for OutboxEvent entities.
pub struct OutboxEvent;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for Company entities.
pub type CompanyId = Id<Company>;

/// Typed ID for Technician entities.
pub type TechnicianId = Id<Technician>;

/// Typed ID for Job entities.
pub type JobId = Id<Job>;

/// Typed ID for JobRouting entities.
pub type JobRoutingId = Id<JobRouting>;

/// Typed ID for OutboxEvent entities.
pub type OutboxEventId = Id<OutboxEvent>;
