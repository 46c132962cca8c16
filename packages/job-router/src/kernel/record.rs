//! Minimal trait for database-backed entities with standard CRUD operations.

use anyhow::Result;
use async_trait::async_trait;

/// Trait for database records with standard operations.
///
/// Repositories implement this per entity rather than going through a generic
/// query builder — each implementation hand-writes its SQL against the logical
/// schema in the routing spec's external-interfaces section.
#[async_trait]
pub trait Record: Sized + Send + Sync {
    /// The table name for this record type.
    const TABLE: &'static str;

    /// The ID type for this record.
    type Id;

    /// Find a record by its ID.
    async fn find_by_id(id: Self::Id, db: &sqlx::PgPool) -> Result<Self>;

    /// Insert a new record, returning the row as persisted.
    async fn insert(&self, db: &sqlx::PgPool) -> Result<Self>;

    /// Update an existing record, returning the row as persisted.
    async fn update(&self, db: &sqlx::PgPool) -> Result<Self>;

    /// Delete a record.
    async fn delete(&self, db: &sqlx::PgPool) -> Result<()>;
}
