//! Persistence for companies and their skills.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::CompanyId;

use super::model::{Company, CompanySkill, ProviderType, SkillLevel};

#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    name: String,
    provider_type: String,
    provider_config: serde_json::Value,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CompanySkillRow {
    company_id: Uuid,
    skill_name: String,
    skill_level: String,
    is_primary: bool,
}

impl CompanyRow {
    fn into_company(self, skills: Vec<CompanySkill>) -> Result<Company> {
        Ok(Company {
            id: CompanyId::from_uuid(self.id),
            name: self.name,
            provider_type: parse_provider_type(&self.provider_type)?,
            provider_config: serde_json::from_value(self.provider_config)?,
            is_active: self.is_active,
            skills,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        })
    }
}

impl CompanySkillRow {
    fn into_skill(self) -> Result<CompanySkill> {
        Ok(CompanySkill {
            company_id: CompanyId::from_uuid(self.company_id),
            skill_name: self.skill_name,
            level: parse_skill_level(&self.skill_level)?,
            is_primary: self.is_primary,
        })
    }
}

pub struct CompanyRepository<'a> {
    db: &'a PgPool,
}

impl<'a> CompanyRepository<'a> {
    pub fn new(db: &'a PgPool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: CompanyId) -> Result<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(
            r#"
            SELECT id, name, provider_type, provider_config, is_active, created_at, updated_at
            FROM companies WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let skills = self.skills_for(id).await?;
        Ok(Some(row.into_company(skills)?))
    }

    pub async fn skills_for(&self, company_id: CompanyId) -> Result<Vec<CompanySkill>> {
        let rows = sqlx::query_as::<_, CompanySkillRow>(
            r#"
            SELECT company_id, skill_name, skill_level, is_primary
            FROM company_skills WHERE company_id = $1
            "#,
        )
        .bind(company_id.as_uuid())
        .fetch_all(self.db)
        .await?;

        rows.into_iter().map(CompanySkillRow::into_skill).collect()
    }

    /// All companies eligible to receive jobs: active, with skills and provider type loaded.
    pub async fn active_with_skills(&self) -> Result<Vec<Company>> {
        let rows = sqlx::query_as::<_, CompanyRow>(
            r#"
            SELECT id, name, provider_type, provider_config, is_active, created_at, updated_at
            FROM companies WHERE is_active = true
            "#,
        )
        .fetch_all(self.db)
        .await?;

        let mut companies = Vec::with_capacity(rows.len());
        for row in rows {
            let id = CompanyId::from_uuid(row.id);
            let skills = self.skills_for(id).await?;
            companies.push(row.into_company(skills)?);
        }
        Ok(companies)
    }

    pub async fn insert(&self, company: &Company) -> Result<Company> {
        let provider_config = serde_json::to_value(&company.provider_config)?;
        let row = sqlx::query_as::<_, CompanyRow>(
            r#"
            INSERT INTO companies (id, name, provider_type, provider_config, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, provider_type, provider_config, is_active, created_at, updated_at
            "#,
        )
        .bind(company.id.as_uuid())
        .bind(&company.name)
        .bind(company.provider_type.as_str())
        .bind(provider_config)
        .bind(company.is_active)
        .fetch_one(self.db)
        .await?;

        for skill in &company.skills {
            sqlx::query(
                r#"
                INSERT INTO company_skills (company_id, skill_name, skill_level, is_primary)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(company.id.as_uuid())
            .bind(&skill.skill_name)
            .bind(skill_level_str(skill.level))
            .bind(skill.is_primary)
            .execute(self.db)
            .await?;
        }

        row.into_company(company.skills.clone())
    }

    /// Transaction-scoped twin of [`Self::find_by_id`], for callers (e.g.
    /// `create_job`) that must read a company as part of a larger atomic
    /// unit of work rather than on its own connection.
    pub async fn find_by_id_tx(tx: &mut Transaction<'_, Postgres>, id: CompanyId) -> Result<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(
            r#"
            SELECT id, name, provider_type, provider_config, is_active, created_at, updated_at
            FROM companies WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let skills = Self::skills_for_tx(tx, id).await?;
        Ok(Some(row.into_company(skills)?))
    }

    /// Transaction-scoped twin of [`Self::skills_for`].
    pub async fn skills_for_tx(tx: &mut Transaction<'_, Postgres>, company_id: CompanyId) -> Result<Vec<CompanySkill>> {
        let rows = sqlx::query_as::<_, CompanySkillRow>(
            r#"
            SELECT company_id, skill_name, skill_level, is_primary
            FROM company_skills WHERE company_id = $1
            "#,
        )
        .bind(company_id.as_uuid())
        .fetch_all(&mut **tx)
        .await?;

        rows.into_iter().map(CompanySkillRow::into_skill).collect()
    }

    /// Transaction-scoped twin of [`Self::active_with_skills`].
    pub async fn active_with_skills_tx(tx: &mut Transaction<'_, Postgres>) -> Result<Vec<Company>> {
        let rows = sqlx::query_as::<_, CompanyRow>(
            r#"
            SELECT id, name, provider_type, provider_config, is_active, created_at, updated_at
            FROM companies WHERE is_active = true
            "#,
        )
        .fetch_all(&mut **tx)
        .await?;

        let mut companies = Vec::with_capacity(rows.len());
        for row in rows {
            let id = CompanyId::from_uuid(row.id);
            let skills = Self::skills_for_tx(tx, id).await?;
            companies.push(row.into_company(skills)?);
        }
        Ok(companies)
    }
}

fn parse_provider_type(s: &str) -> Result<ProviderType> {
    Ok(match s {
        "servicetitan" => ProviderType::Servicetitan,
        "housecallpro" => ProviderType::Housecallpro,
        "mock" => ProviderType::Mock,
        other => anyhow::bail!("unknown provider_type: {other}"),
    })
}

fn parse_skill_level(s: &str) -> Result<SkillLevel> {
    Ok(match s {
        "basic" => SkillLevel::Basic,
        "intermediate" => SkillLevel::Intermediate,
        "expert" => SkillLevel::Expert,
        other => anyhow::bail!("unknown skill_level: {other}"),
    })
}

fn skill_level_str(level: SkillLevel) -> &'static str {
    match level {
        SkillLevel::Basic => "basic",
        SkillLevel::Intermediate => "intermediate",
        SkillLevel::Expert => "expert",
    }
}
