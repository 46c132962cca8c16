//! Inbound provider webhooks (§6): stub ingestion only.
//!
//! The non-goal "no webhook ingestion" means this system doesn't act on
//! provider push notifications — it still polls (C10/C13) for completion and
//! revenue. This endpoint exists so providers configured to push webhooks have
//! somewhere to send them without erroring, and so the payload is visible in
//! logs for diagnosing provider-side behavior. It does not update any routing.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::Json;

pub async fn webhook_handler(
    Path(provider_type): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> StatusCode {
    tracing::info!(provider_type = %provider_type, payload = %payload, "received webhook (not processed)");
    StatusCode::ACCEPTED
}
