use axum::{
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    AppState,
    auth::{
        self, AuthUser, SessionResponse, SessionUser, VERIFICATION_TOKEN_TTL_HOURS,
        clear_session_cookie, generate_verification_token, hash_token, session_cookie,
    },
    error::{ApiResponse, AppError, AppResult},
    mailer::EmailMessage,
    models::MessageResponse,
    rate_limit::client_key,
    validation::{Normalize, ValidJson, ValidQuery, lower_trim, not_blank},
};

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignInRequest {
    #[validate(email(message = "Invalid email address"))]
    #[serde(default)]
    pub email: String,
    /// Relative path to land on after signing in.
    pub callback_url: Option<String>,
}

impl Normalize for SignInRequest {
    fn normalized(mut self) -> Self {
        self.email = lower_trim(&self.email);
        self
    }
}

#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EmailCallbackQuery {
    #[validate(custom(function = "not_blank", message = "Missing sign-in token"))]
    #[serde(default)]
    pub token: String,
    #[validate(email(message = "Invalid email address"))]
    #[serde(default)]
    pub email: String,
    pub callback_url: Option<String>,
}

impl Normalize for EmailCallbackQuery {
    fn normalized(mut self) -> Self {
        self.email = lower_trim(&self.email);
        self.token = self.token.trim().to_string();
        self
    }
}

// Only same-site paths; "//host" would leave the site.
fn safe_callback(callback: Option<&str>) -> Option<&str> {
    callback.filter(|c| c.starts_with('/') && !c.starts_with("//"))
}

fn sign_in_link(app_url: &str, token: &str, email: &str, callback: Option<&str>) -> String {
    let mut params = vec![("token", token), ("email", email)];
    if let Some(callback) = callback {
        params.push(("callbackUrl", callback));
    }
    let base = format!("{app_url}/api/auth/callback/email");
    match reqwest::Url::parse_with_params(&base, &params) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{base}?token={token}"),
    }
}

/// request_sign_in
///
/// [Public Route] Emails a single-use sign-in link valid for 24 hours. Answers
/// 200 whether or not the address belongs to a user, and whether or not the
/// mail could be sent.
#[utoipa::path(
    post,
    path = "/api/auth/signin/email",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Link sent if the address can sign in", body = MessageResponse),
        (status = 400, description = "Invalid email"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn request_sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(payload): ValidJson<SignInRequest>,
) -> AppResult<ApiResponse<MessageResponse>> {
    // Separate bucket from the contact form.
    let client = client_key(&headers);
    let decision = state.rate_limiter.check(&format!("signin:{client}"));
    if !decision.allowed {
        tracing::warn!(%client, reset_in_ms = decision.reset_in.as_millis() as u64, "sign-in rate limit exceeded");
        return Err(AppError::RateLimited(
            "Too many sign-in requests. Please try again later.".to_string(),
        ));
    }

    let token = generate_verification_token();
    let expires_at = Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS);
    state
        .repo
        .store_verification_token(&payload.email, &hash_token(&token), expires_at)
        .await?;

    let link = sign_in_link(
        &state.config.app_url,
        &token,
        &payload.email,
        safe_callback(payload.callback_url.as_deref()),
    );
    let mail = EmailMessage {
        to: payload.email.clone(),
        subject: "Sign in to your portfolio".to_string(),
        text: format!(
            "Use the link below to sign in. It expires in {VERIFICATION_TOKEN_TTL_HOURS} hours and can be used once.\n\n{link}\n"
        ),
    };
    if let Err(e) = state.mailer.send(&mail).await {
        tracing::error!(error = %e, "failed to send sign-in email");
    }

    Ok(ApiResponse::ok(MessageResponse::new(
        "Check your email for a sign-in link",
    )))
}

/// email_callback
///
/// [Public Route] Consumes a sign-in token and starts a session. The first
/// sign-in creates the user as a viewer named after the address's local part.
/// With a same-site `callbackUrl` the browser is redirected there; otherwise
/// the session is returned as JSON. Either way the session cookie is set.
#[utoipa::path(
    get,
    path = "/api/auth/callback/email",
    params(EmailCallbackQuery),
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 303, description = "Signed in, redirected to callbackUrl"),
        (status = 401, description = "Invalid or expired link")
    )
)]
pub async fn email_callback(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<EmailCallbackQuery>,
) -> AppResult<Response> {
    let valid = state
        .repo
        .consume_verification_token(&query.email, &hash_token(&query.token))
        .await?;
    if !valid {
        return Err(AppError::Unauthorized(
            "Invalid or expired sign-in link".to_string(),
        ));
    }

    let name = query.email.split('@').next().unwrap_or_default().to_string();
    let user = state.repo.upsert_user_on_sign_in(&query.email, &name).await?;
    let session = auth::issue_session(&state.config, &user)?;
    let cookie = session_cookie(&state.config, &session.token);
    tracing::info!(user = %user.id, role = %user.role, "user signed in");

    let response = match safe_callback(query.callback_url.as_deref()) {
        Some(target) => ([(header::SET_COOKIE, cookie)], Redirect::to(target)).into_response(),
        None => (
            [(header::SET_COOKIE, cookie)],
            ApiResponse::ok(SessionResponse::new(&user, session)),
        )
            .into_response(),
    };
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Current session", body = SessionUser),
        (status = 401, description = "No session")
    )
)]
pub async fn get_session(user: AuthUser) -> AppResult<ApiResponse<SessionUser>> {
    Ok(ApiResponse::ok(SessionUser {
        id: user.id,
        email: user.email,
        name: None,
        role: user.role,
    }))
}

/// refresh_session
///
/// [Authenticated Route] Issues a new token carrying the role currently stored
/// for the user, so a promotion applies without signing out.
#[utoipa::path(
    post,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Refreshed session", body = SessionResponse),
        (status = 401, description = "No session, or the user no longer exists")
    )
)]
pub async fn refresh_session(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let (user, session) = auth::refresh_session(&state.repo, &state.config, &user).await?;
    let cookie = session_cookie(&state.config, &session.token);
    Ok((
        [(header::SET_COOKIE, cookie)],
        ApiResponse::ok(SessionResponse::new(&user, session)),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/auth/signout",
    responses((status = 200, description = "Signed out", body = MessageResponse))
)]
pub async fn sign_out() -> Response {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        ApiResponse::ok(MessageResponse::new("Signed out")),
    )
        .into_response()
}
