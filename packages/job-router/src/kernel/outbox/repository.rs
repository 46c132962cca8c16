//! Persistence and claim logic for outbox events (C5).

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::OutboxEventId;

use super::model::{EventStatus, EventType, OutboxEvent};

#[derive(sqlx::FromRow)]
struct OutboxRow {
    id: Uuid,
    event_type: String,
    aggregate_id: String,
    event_data: serde_json::Value,
    status: String,
    retry_count: i32,
    max_retries: i32,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl OutboxRow {
    fn into_event(self) -> Result<OutboxEvent> {
        Ok(OutboxEvent {
            id: OutboxEventId::from_uuid(self.id),
            event_type: EventType::from_str(&self.event_type)?,
            aggregate_id: self.aggregate_id,
            event_data: self.event_data,
            status: EventStatus::from_str(&self.status)?,
            retry_count: self.retry_count as u32,
            max_retries: self.max_retries as u32,
            created_at: Some(self.created_at),
            processed_at: self.processed_at,
            error_message: self.error_message,
        })
    }
}

pub struct OutboxRepository<'a> {
    db: &'a PgPool,
}

impl<'a> OutboxRepository<'a> {
    pub fn new(db: &'a PgPool) -> Self {
        Self { db }
    }

    pub async fn create_event(
        &self,
        event_type: EventType,
        aggregate_id: &str,
        event_data: serde_json::Value,
        max_retries: u32,
    ) -> Result<OutboxEvent> {
        let row = sqlx::query_as::<_, OutboxRow>(
            r#"
            INSERT INTO outbox_events (id, event_type, aggregate_id, event_data, status, max_retries)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(event_type.as_str())
        .bind(aggregate_id)
        .bind(event_data)
        .bind(max_retries as i32)
        .fetch_one(self.db)
        .await?;
        row.into_event()
    }

    /// Transaction-scoped twin of [`Self::create_event`], for callers that
    /// must enqueue an outbox event atomically alongside the business row it
    /// describes.
    pub async fn create_event_tx(
        tx: &mut Transaction<'_, Postgres>,
        event_type: EventType,
        aggregate_id: &str,
        event_data: serde_json::Value,
        max_retries: u32,
    ) -> Result<OutboxEvent> {
        let row = sqlx::query_as::<_, OutboxRow>(
            r#"
            INSERT INTO outbox_events (id, event_type, aggregate_id, event_data, status, max_retries)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(event_type.as_str())
        .bind(aggregate_id)
        .bind(event_data)
        .bind(max_retries as i32)
        .fetch_one(&mut **tx)
        .await?;
        row.into_event()
    }

    /// Atomically transition pending→processing. Returns `true` iff this caller
    /// claimed it — the only legal transition out of pending.
    pub async fn claim_event(&self, id: OutboxEventId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE outbox_events SET status = 'processing' WHERE id = $1 AND status = 'pending'",
        )
        .bind(id.as_uuid())
        .execute(self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn mark_completed(&self, id: OutboxEventId) -> Result<()> {
        sqlx::query(
            "UPDATE outbox_events SET status = 'completed', processed_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .execute(self.db)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: OutboxEventId, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE outbox_events
            SET status = 'failed', retry_count = retry_count + 1, processed_at = NOW(), error_message = $2
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(error)
        .execute(self.db)
        .await?;
        Ok(())
    }

    /// failed→pending, only if retry-eligible (gated again in SQL against a race
    /// between the read that decided eligibility and this write).
    pub async fn reset_for_retry(&self, id: OutboxEventId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET status = 'pending'
            WHERE id = $1
              AND status = 'failed'
              AND retry_count < max_retries
              AND (
                processed_at IS NULL
                OR NOW() - processed_at >= (5 * POWER(3, retry_count) || ' minutes')::interval
              )
            "#,
        )
        .bind(id.as_uuid())
        .execute(self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn pending_events(
        &self,
        event_type: Option<EventType>,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>> {
        let rows = match event_type {
            Some(t) => {
                sqlx::query_as::<_, OutboxRow>(
                    "SELECT * FROM outbox_events WHERE status = 'pending' AND event_type = $1 ORDER BY created_at LIMIT $2",
                )
                .bind(t.as_str())
                .bind(limit)
                .fetch_all(self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, OutboxRow>(
                    "SELECT * FROM outbox_events WHERE status = 'pending' ORDER BY created_at LIMIT $1",
                )
                .bind(limit)
                .fetch_all(self.db)
                .await?
            }
        };
        rows.into_iter().map(OutboxRow::into_event).collect()
    }

    /// `retry_count < max_retries AND now - processed_at >= 5min * 3^retry_count`.
    pub async fn failed_events_for_retry(&self, limit: i64) -> Result<Vec<OutboxEvent>> {
        let rows = sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT * FROM outbox_events
            WHERE status = 'failed'
              AND retry_count < max_retries
              AND (
                processed_at IS NULL
                OR NOW() - processed_at >= (5 * POWER(3, retry_count) || ' minutes')::interval
              )
            ORDER BY processed_at NULLS FIRST
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.db)
        .await?;
        rows.into_iter().map(OutboxRow::into_event).collect()
    }

    pub async fn cleanup_completed(&self, older_than_days: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM outbox_events
            WHERE status = 'completed'
              AND processed_at <= NOW() - ($1 || ' days')::interval
            "#,
        )
        .bind(older_than_days.to_string())
        .execute(self.db)
        .await?;
        Ok(result.rows_affected())
    }
}
