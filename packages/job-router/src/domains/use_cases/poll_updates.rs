//! Poll-updates use case (C10): batches SYNCED routings by (provider, company),
//! asks the provider for their current status, and transitions completions.

use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;

use crate::common::CompanyId;
use crate::domains::companies::CompanyRepository;
use crate::domains::jobs::JobRepository;
use crate::domains::providers::ProviderRegistry;
use crate::domains::routings::{RoutingRepository, DEFAULT_POLL_INTERVAL_MINUTES};

#[derive(Debug, Default)]
pub struct PollUpdatesReport {
    pub total_polled: usize,
    pub updated: usize,
    pub completed: usize,
    pub errors: Vec<String>,
}

pub async fn poll_updates(
    db: &PgPool,
    providers: &ProviderRegistry,
    batch_size: i64,
) -> Result<PollUpdatesReport> {
    let routing_repo = RoutingRepository::new(db);
    let companies = CompanyRepository::new(db);
    let jobs = JobRepository::new(db);

    let due = routing_repo
        .synced_due_for_poll(DEFAULT_POLL_INTERVAL_MINUTES, batch_size)
        .await?;

    let mut report = PollUpdatesReport {
        total_polled: due.len(),
        ..Default::default()
    };

    // Group by receiving company (which pins provider_type via the company record).
    let mut groups: HashMap<CompanyId, Vec<_>> = HashMap::new();
    for routing in due {
        groups.entry(routing.company_id_received).or_default().push(routing);
    }

    for (company_id, routings) in groups {
        let Some(company) = companies.find_by_id(company_id).await? else {
            report.errors.push(format!("company {company_id} not found"));
            continue;
        };
        let adapter = providers.resolve(company.provider_type);

        let external_ids: Vec<String> = routings
            .iter()
            .filter_map(|r| r.external_id.clone())
            .collect();
        let statuses = adapter
            .batch_get_job_status(&external_ids, &company.provider_config)
            .await;

        let mut by_external_id = HashMap::new();
        for (external_id, result) in external_ids.iter().zip(statuses) {
            by_external_id.insert(external_id.clone(), result);
        }

        // Sequential within the group — never parallel per company (§5).
        for routing in routings {
            let Some(external_id) = &routing.external_id else {
                report.errors.push(format!("routing {} has no external_id", routing.id));
                continue;
            };
            let Some(status_result) = by_external_id.remove(external_id) else {
                report.errors.push(format!("no status response for routing {}", routing.id));
                continue;
            };

            let status = match status_result {
                Ok(status) => status,
                Err(err) => {
                    report.errors.push(format!("routing {}: {err}", routing.id));
                    continue;
                }
            };
            if let Some(error_message) = &status.error_message {
                report.errors.push(format!("routing {}: {error_message}", routing.id));
                continue;
            }

            let now = Utc::now();
            if status.is_completed {
                routing_repo
                    .mark_completed(routing.id, status.revenue, now)
                    .await?;
                if status.revenue.is_some() {
                    jobs.mark_completed(routing.job_id, status.completed_at.unwrap_or(now)).await?;
                }
                report.completed += 1;
                report.updated += 1;
            } else {
                routing_repo.touch_last_synced(routing.id, now).await?;
                report.updated += 1;
            }
        }
    }

    Ok(report)
}
