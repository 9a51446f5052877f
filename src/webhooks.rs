//! Signed JSON webhooks.
//!
//! Outbound events are wrapped as `{type, timestamp, data}` and signed with
//! HMAC-SHA256 over the exact body bytes; the lowercase hex digest travels in the
//! `x-webhook-signature` header. Inbound verification recomputes the digest and
//! compares in constant time.

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{ContactMessage, FileAttachment};

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

pub const CONTACT_FORM: &str = "contact_form";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid HMAC key")]
    InvalidKey,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("failed to encode webhook payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Hex-encoded HMAC-SHA256 of `body`.
pub fn sign(body: &[u8], secret: &str) -> Result<String, WebhookError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::InvalidKey)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify(body: &[u8], signature: &str, secret: &str) -> Result<(), WebhookError> {
    let expected = sign(body, secret)?;
    let provided = signature.trim().to_ascii_lowercase();

    if bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEnvelope<T> {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub data: T,
}

/// A serialized event ready for delivery.
#[derive(Debug, Clone)]
pub struct SignedWebhook {
    pub event: String,
    pub body: Bytes,
    /// Absent when no secret is configured.
    pub signature: Option<String>,
}

pub fn build_signed<T: Serialize>(
    kind: &str,
    data: &T,
    secret: Option<&str>,
) -> Result<SignedWebhook, WebhookError> {
    let envelope = WebhookEnvelope {
        kind: kind.to_string(),
        timestamp: Utc::now(),
        data,
    };
    let body = serde_json::to_vec(&envelope)?;
    let signature = secret.map(|s| sign(&body, s)).transpose()?;

    Ok(SignedWebhook {
        event: kind.to_string(),
        body: Bytes::from(body),
        signature,
    })
}

/// Data block of the `contact_form` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmittedData {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
    pub project_budget: Option<String>,
    pub file: Option<FileAttachment>,
    pub created_at: DateTime<Utc>,
}

impl From<&ContactMessage> for ContactSubmittedData {
    fn from(msg: &ContactMessage) -> Self {
        Self {
            id: msg.id,
            name: msg.name.clone(),
            email: msg.email.clone(),
            message: msg.message.clone(),
            project_budget: msg.project_budget.clone(),
            file: msg.file.clone(),
            created_at: msg.created_at,
        }
    }
}

/// Shape accepted on `POST /api/webhooks/automation`. Only `type` is inspected.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundWebhook {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub timestamp: DateTime<Utc>,
}
