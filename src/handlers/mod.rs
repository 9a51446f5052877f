//! HTTP handlers, one module per resource.
//!
//! Handlers resolve identity through the `AuthUser`/`AdminUser` extractors,
//! validate through `ValidJson`/`ValidQuery`, and return `AppResult<ApiResponse<T>>`
//! so every outcome goes through the shared envelope.

use std::collections::HashMap;

use axum::extract::{Multipart, multipart::MultipartError};
use axum::http::StatusCode;

use crate::error::{AppError, AppResult};
use crate::storage::UploadFile;

pub mod about;
pub mod admin;
pub mod auth;
pub mod blog;
pub mod contact;
pub mod cv;
pub mod projects;
pub mod webhooks;

/// Text fields and the (optional) file of a multipart form.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadFile>,
}

impl MultipartForm {
    pub fn take(&mut self, name: &str) -> String {
        self.fields.remove(name).unwrap_or_default()
    }

    pub fn take_optional(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::Validation("File size exceeds upload limit".to_string());
    }
    AppError::Validation(err.body_text())
}

/// read_multipart
///
/// Buffers a multipart body. The part named `file_field` becomes the upload;
/// an empty file part (an untouched file input) counts as no file.
pub async fn read_multipart(mut multipart: Multipart, file_field: &str) -> AppResult<MultipartForm> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?;
            if !bytes.is_empty() {
                form.file = Some(UploadFile::new(file_name, content_type.as_deref(), bytes));
            }
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
