use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
};

use crate::{
    AppState,
    auth::AdminUser,
    error::{ApiResponse, AppError, AppResult},
    mailer::EmailMessage,
    models::{
        ContactMessage, ContactMessageList, ContactQuery, ContactReceipt, ContactSubmission,
        FileAttachment, NewContactMessage, SetProcessedRequest,
    },
    notifier::Job,
    rate_limit::client_key,
    storage::{UploadPolicy, store_upload},
    validation::{ValidJson, ValidQuery, parse_id, validate_normalized},
    webhooks::{self, CONTACT_FORM, ContactSubmittedData},
};

const ATTACHMENT_FOLDER: &str = "contacts";

/// submit_contact
///
/// [Public Route] Contact form pipeline: rate limit, parse, validate, honeypot,
/// store the attachment, persist, then queue the webhook and owner e-mail.
/// Side effects after persistence never fail the request.
#[utoipa::path(
    post,
    path = "/api/contact",
    request_body(content_type = "multipart/form-data", description = "name, email, message, projectBudget?, website?, file?"),
    responses(
        (status = 201, description = "Message stored", body = ContactReceipt),
        (status = 200, description = "Silently dropped", body = ContactReceipt),
        (status = 400, description = "Validation failed"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn submit_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> AppResult<ApiResponse<ContactReceipt>> {
    // 1. Rate limit per client
    let client = client_key(&headers);
    let decision = state.rate_limiter.check(&client);
    if !decision.allowed {
        tracing::warn!(%client, reset_in_ms = decision.reset_in.as_millis() as u64, "contact rate limit exceeded");
        return Err(AppError::RateLimited(
            "Too many requests. Please try again later.".to_string(),
        ));
    }

    // 2. Parse and validate
    let mut form = super::read_multipart(multipart, "file").await?;
    let submission = validate_normalized(ContactSubmission {
        name: form.take("name"),
        email: form.take("email"),
        message: form.take("message"),
        project_budget: form.take_optional("projectBudget"),
        website: form.take_optional("website"),
    })?;

    // 3. Honeypot
    if submission.is_bot() {
        tracing::info!(%client, "honeypot triggered, dropping contact submission");
        return Ok(ApiResponse::ok(ContactReceipt {
            message: "Message received".to_string(),
            id: None,
        }));
    }

    // 4. Attachment
    let file = match form.file {
        Some(upload) => {
            let name = upload.file_name.clone();
            let stored = store_upload(
                state.storage.as_ref(),
                UploadPolicy::ATTACHMENT,
                ATTACHMENT_FOLDER,
                upload,
            )
            .await?;
            Some(FileAttachment {
                url: stored.url,
                name,
            })
        }
        None => None,
    };

    // 5. Persist
    let message = state
        .repo
        .create_contact_message(NewContactMessage {
            name: submission.name,
            email: submission.email,
            message: submission.message,
            project_budget: submission.project_budget,
            file,
        })
        .await?;
    tracing::info!(message = %message.id, "contact message stored");

    // 6. Side effects
    notify(&state, &message);

    Ok(ApiResponse::created(ContactReceipt {
        message: "Message sent successfully".to_string(),
        id: Some(message.id),
    }))
}

fn notify(state: &AppState, message: &ContactMessage) {
    if state.config.webhook_url.is_some() {
        match webhooks::build_signed(
            CONTACT_FORM,
            &ContactSubmittedData::from(message),
            state.config.webhook_secret.as_deref(),
        ) {
            Ok(hook) => state.notifier.dispatch(Job::Webhook(hook)),
            Err(e) => tracing::error!(error = %e, "could not build contact webhook"),
        }
    }

    if let Some(owner) = &state.config.contact_notify_email {
        state
            .notifier
            .dispatch(Job::Email(notification_email(owner, message)));
    }
}

fn notification_email(to: &str, message: &ContactMessage) -> EmailMessage {
    let mut text = format!(
        "New contact message from {} <{}>\n\n{}\n",
        message.name, message.email, message.message
    );
    if let Some(budget) = &message.project_budget {
        text.push_str(&format!("\nProject budget: {budget}\n"));
    }
    if let Some(file) = &message.file {
        text.push_str(&format!("\nAttachment: {} ({})\n", file.name, file.url));
    }

    EmailMessage {
        to: to.to_string(),
        subject: format!("New contact message from {}", message.name),
        text,
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/contact",
    params(ContactQuery),
    responses((status = 200, description = "Messages", body = ContactMessageList))
)]
pub async fn admin_list_contact(
    _admin: AdminUser,
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ContactQuery>,
) -> AppResult<ApiResponse<ContactMessageList>> {
    let messages = state.repo.list_contact_messages(query.processed).await?;
    let total = messages.len();
    Ok(ApiResponse::ok(ContactMessageList { messages, total }))
}

/// set_contact_processed
///
/// [Admin Route] Sets the processed flag to the given value; repeating the call
/// leaves the message unchanged.
#[utoipa::path(
    patch,
    path = "/api/admin/contact/{id}",
    request_body = SetProcessedRequest,
    params(("id" = String, Path, description = "Message id")),
    responses(
        (status = 200, description = "Updated", body = ContactMessage),
        (status = 404, description = "Not Found")
    )
)]
pub async fn set_contact_processed(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<SetProcessedRequest>,
) -> AppResult<ApiResponse<ContactMessage>> {
    let id = parse_id(&id, "Message")?;
    let message = state
        .repo
        .set_contact_processed(id, payload.processed)
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;
    Ok(ApiResponse::ok(message))
}
