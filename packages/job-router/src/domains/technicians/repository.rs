//! Persistence for technicians.

use anyhow::Result;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::{CompanyId, TechnicianId};

use super::model::Technician;

#[derive(sqlx::FromRow)]
struct TechnicianRow {
    id: Uuid,
    name: String,
    phone: Option<String>,
    email: Option<String>,
    company_id: Uuid,
}

impl From<TechnicianRow> for Technician {
    fn from(row: TechnicianRow) -> Self {
        Technician {
            id: TechnicianId::from_uuid(row.id),
            name: row.name,
            phone: row.phone,
            email: row.email,
            company_id: CompanyId::from_uuid(row.company_id),
        }
    }
}

pub struct TechnicianRepository<'a> {
    db: &'a PgPool,
}

impl<'a> TechnicianRepository<'a> {
    pub fn new(db: &'a PgPool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: TechnicianId) -> Result<Option<Technician>> {
        let row = sqlx::query_as::<_, TechnicianRow>(
            "SELECT id, name, phone, email, company_id FROM technicians WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn insert(&self, technician: &Technician) -> Result<Technician> {
        let row = sqlx::query_as::<_, TechnicianRow>(
            r#"
            INSERT INTO technicians (id, name, phone, email, company_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, phone, email, company_id
            "#,
        )
        .bind(technician.id.as_uuid())
        .bind(&technician.name)
        .bind(&technician.phone)
        .bind(&technician.email)
        .bind(technician.company_id.as_uuid())
        .fetch_one(self.db)
        .await?;
        Ok(row.into())
    }

    /// Transaction-scoped twin of [`Self::find_by_id`].
    pub async fn find_by_id_tx(tx: &mut Transaction<'_, Postgres>, id: TechnicianId) -> Result<Option<Technician>> {
        let row = sqlx::query_as::<_, TechnicianRow>(
            "SELECT id, name, phone, email, company_id FROM technicians WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(Into::into))
    }
}
