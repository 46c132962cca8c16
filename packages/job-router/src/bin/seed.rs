// Seed the database with a handful of companies, technicians, and skills for
// local development and manual exercising of the HTTP surface.

use anyhow::{Context, Result};
use job_router_core::domains::companies::{Company, CompanyRepository, CompanySkill, ProviderType, SkillLevel};
use job_router_core::domains::technicians::{Technician, TechnicianRepository};
use job_router_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let companies = CompanyRepository::new(&pool);
    let technicians = TechnicianRepository::new(&pool);

    let requester = companies
        .insert(
            &Company::builder()
                .name("Origin Home Services".to_string())
                .provider_type(ProviderType::Mock)
                .build(),
        )
        .await
        .context("failed to seed requesting company")?;

    let requester_tech = technicians
        .insert(
            &Technician::builder()
                .name("Alex Rivera".to_string())
                .company_id(requester.id)
                .build(),
        )
        .await
        .context("failed to seed requesting technician")?;

    tracing::info!(company_id = %requester.id, technician_id = %requester_tech.id, "seeded requesting company");

    let receivers = [
        ("Acme Plumbing Co", "plumbing", SkillLevel::Expert, true),
        ("Bolt HVAC", "hvac", SkillLevel::Expert, true),
        ("Sparkline Electric", "electrical", SkillLevel::Intermediate, true),
        ("Handy Multi-Trade", "plumbing", SkillLevel::Basic, false),
    ];

    for (name, skill, level, is_primary) in receivers {
        let company = companies
            .insert(
                &Company::builder()
                    .name(name.to_string())
                    .provider_type(ProviderType::Mock)
                    .skills(vec![CompanySkill {
                        company_id: Default::default(),
                        skill_name: skill.to_string(),
                        level,
                        is_primary,
                    }])
                    .build(),
            )
            .await
            .with_context(|| format!("failed to seed company {name}"))?;
        tracing::info!(company_id = %company.id, name, skill, "seeded receiving company");
    }

    tracing::info!("seed complete");
    Ok(())
}
