use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AppResult},
    models::{Role, User},
    repository::RepositoryState,
};

pub const SESSION_COOKIE: &str = "session_token";

/// Magic-link tokens are valid for a day.
pub const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;

const VERIFICATION_TOKEN_LEN: usize = 48;

/// Claims
///
/// Payload of a session token. `role` is a snapshot taken at issue time and is
/// re-read from the user store whenever the session is refreshed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// AuthUser
///
/// Resolved identity of an authenticated request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// A freshly signed session token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub fn issue_session(config: &AppConfig, user: &User) -> AppResult<IssuedSession> {
    let now = Utc::now();
    let ttl = ChronoDuration::from_std(config.session_ttl)
        .map_err(|e| AppError::Internal(format!("invalid session ttl: {e}")))?;
    let expires_at = now + ttl;

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.auth_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign session: {e}")))?;

    Ok(IssuedSession { token, expires_at })
}

/// Verifies signature and expiry. Any failure is an invalid session.
pub fn decode_session(config: &AppConfig, token: &str) -> AppResult<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.auth_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "rejected session token");
        AppError::Unauthorized("Invalid or expired session".to_string())
    })
}

/// Session token from `Authorization: Bearer` or, failing that, the session cookie.
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn resolve_session(headers: &HeaderMap, config: &AppConfig) -> Option<Claims> {
    let token = session_token_from_headers(headers)?;
    decode_session(config, &token).ok()
}

/// refresh_session
///
/// Re-reads the user behind a session and signs a new token carrying the
/// current role. Looks up by id first, then by email for sessions issued before
/// a re-import. A user that no longer exists ends the session.
pub async fn refresh_session(
    repo: &RepositoryState,
    config: &AppConfig,
    current: &AuthUser,
) -> AppResult<(User, IssuedSession)> {
    let user = match repo.get_user(current.id).await? {
        Some(user) => Some(user),
        None => repo.get_user_by_email(&current.email).await?,
    };
    let user =
        user.ok_or_else(|| AppError::Unauthorized("Session user no longer exists".to_string()))?;

    let session = issue_session(config, &user)?;
    Ok((user, session))
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(config: &AppConfig, token: &str) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        config.session_ttl.as_secs()
    );
    if config.env == Env::Production {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

/// Random alphanumeric magic-link token. Only its hash is stored.
pub fn generate_verification_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(VERIFICATION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Public part of a session as returned by the session endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionResponse {
    pub token: String,
    pub user: SessionUser,
    pub expires_at: DateTime<Utc>,
}

impl SessionResponse {
    pub fn new(user: &User, session: IssuedSession) -> Self {
        Self {
            token: session.token,
            user: SessionUser {
                id: user.id,
                email: user.email.clone(),
                name: Some(user.name.clone()),
                role: user.role,
            },
            expires_at: session.expires_at,
        }
    }
}

/// AuthUser extractor
///
/// Decodes the session token (Bearer header or cookie). Rejects with
/// 401 "Authentication required" when absent or invalid.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        resolve_session(&parts.headers, &config)
            .map(AuthUser::from)
            .ok_or_else(AppError::unauthenticated)
    }
}

/// An authenticated user holding the admin role. 403 otherwise.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::admin_required());
        }
        Ok(AdminUser(user))
    }
}

/// Optional identity for public routes whose output depends on the caller.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        Ok(MaybeAuthUser(
            resolve_session(&parts.headers, &config).map(AuthUser::from),
        ))
    }
}
