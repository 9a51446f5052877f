use std::borrow::Cow;

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use uuid::Uuid;
use validator::{Validate, ValidateUrl, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::{AppError, AppResult};

/// Normalize
///
/// Canonicalisation applied to a payload before it is validated (trimming,
/// lowercasing slugs and emails, dropping empty optionals).
pub trait Normalize: Sized {
    fn normalized(self) -> Self {
        self
    }
}

/// ValidJson
///
/// `Json<T>` that also normalizes and validates the payload. Malformed bodies and
/// schema violations both surface as `AppError::Validation`.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate + Normalize,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        let value = value.normalized();
        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// Query-string counterpart of [`ValidJson`].
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate + Normalize,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        let value = value.normalized();
        value.validate()?;
        Ok(ValidQuery(value))
    }
}

/// Validates a payload outside of an extractor (multipart forms).
pub fn validate_normalized<T: Validate + Normalize>(value: T) -> AppResult<T> {
    let value = value.normalized();
    value.validate()?;
    Ok(value)
}

/// first_error_message
///
/// Flattens validator output into the single message returned to clients. Fields
/// are visited in name order so the result is stable.
pub fn first_error_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    return err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"));
                }
            }
            ValidationErrorsKind::Struct(inner) => return first_error_message(inner),
            ValidationErrorsKind::List(items) => {
                if let Some(inner) = items.values().next() {
                    return first_error_message(inner);
                }
            }
        }
    }

    "Invalid input".to_string()
}

/// Ids in paths are opaque: anything that isn't a UUID simply doesn't exist.
pub fn parse_id(raw: &str, entity: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("{entity} not found")))
}

pub fn lower_trim(value: &str) -> String {
    value.trim().to_lowercase()
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("required", "Field is required"));
    }
    Ok(())
}

/// Slugs are non-empty, lowercase alphanumerics and hyphens.
pub fn validate_slug(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(error("required", "Slug is required"));
    }
    let valid = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(error(
            "slug",
            "Slug must contain only lowercase letters, numbers, and hyphens",
        ));
    }
    Ok(())
}

/// Accepts an absolute URL or the empty string.
pub fn optional_url(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.validate_url() {
        return Ok(());
    }
    Err(error("url", "Invalid URL"))
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM[:SS]` (taken as UTC) and
/// plain dates (midnight UTC). `null` and `""` mean "not set".
pub fn deserialize_flexible_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };

    parse_flexible_datetime(&raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw}")))
}

pub fn parse_flexible_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
