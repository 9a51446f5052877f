use axum::{body::Bytes, extract::State, http::HeaderMap};
use chrono::Utc;

use crate::{
    AppState,
    error::{ApiResponse, AppError, AppResult},
    webhooks::{self, CONTACT_FORM, InboundWebhook, SIGNATURE_HEADER, WebhookAck},
};

/// receive_automation_webhook
///
/// [Public Route] Callback from the automation service. With a secret
/// configured the `x-webhook-signature` header must match the raw body;
/// without one the check is skipped. Events are logged, nothing is stored.
#[utoipa::path(
    post,
    path = "/api/webhooks/automation",
    request_body(content_type = "application/json", description = "{type, data}"),
    responses(
        (status = 200, description = "Accepted", body = WebhookAck),
        (status = 400, description = "Malformed payload"),
        (status = 401, description = "Missing or invalid signature")
    )
)]
pub async fn receive_automation_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<ApiResponse<WebhookAck>> {
    match state.config.webhook_secret.as_deref() {
        Some(secret) => {
            let signature = headers
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| AppError::Unauthorized("Missing webhook signature".to_string()))?;
            webhooks::verify(&body, signature, secret).map_err(|e| {
                tracing::warn!(error = %e, "rejected inbound webhook");
                AppError::Unauthorized("Invalid webhook signature".to_string())
            })?;
        }
        None => tracing::warn!("WEBHOOK_SECRET not set, accepting webhook without verification"),
    }

    let payload: InboundWebhook = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid webhook payload: {e}")))?;

    let kind = payload.kind.as_deref().unwrap_or("unknown");
    match kind {
        CONTACT_FORM => tracing::info!(kind, "automation processed contact form"),
        "project_created" | "project_updated" | "project_deleted" => {
            tracing::info!(kind, "automation reported project event")
        }
        "blog_published" => tracing::info!(kind, "automation reported blog publication"),
        other => tracing::info!(kind = other, has_data = payload.data.is_some(), "unhandled webhook type"),
    }

    Ok(ApiResponse::ok(WebhookAck {
        received: true,
        kind: payload.kind,
        timestamp: Utc::now(),
    }))
}
