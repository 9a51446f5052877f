use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{auth::resolve_session, config::AppConfig, error::AppError, models::Role};

/// Protected areas. Page areas redirect, API areas answer with JSON errors.
const PAGE_PREFIXES: &[&str] = &["/admin", "/dashboard"];
const API_PREFIXES: &[&str] = &["/api/admin"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedArea {
    Page,
    Api,
}

fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub fn classify(path: &str) -> Option<ProtectedArea> {
    if API_PREFIXES.iter().any(|p| under(path, p)) {
        Some(ProtectedArea::Api)
    } else if PAGE_PREFIXES.iter().any(|p| under(path, p)) {
        Some(ProtectedArea::Page)
    } else {
        None
    }
}

/// `/auth/signin?callbackUrl=<path>`, with the path query-encoded.
pub fn sign_in_location(callback: &str) -> String {
    match reqwest::Url::parse_with_params(
        "http://localhost/auth/signin",
        &[("callbackUrl", callback)],
    ) {
        Ok(url) => format!("{}?{}", url.path(), url.query().unwrap_or_default()),
        Err(_) => "/auth/signin".to_string(),
    }
}

/// admin_gate
///
/// Runs before routing for every request. Paths outside the protected areas
/// pass untouched. Inside them, a caller without a session is sent to sign-in
/// (pages) or gets 401 (API); a signed-in non-admin is sent home (pages) or gets
/// 403 (API).
pub async fn admin_gate(State(config): State<AppConfig>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let Some(area) = classify(&path) else {
        return next.run(request).await;
    };

    match resolve_session(request.headers(), &config) {
        None => {
            tracing::debug!(%path, "unauthenticated request to protected area");
            match area {
                ProtectedArea::Api => AppError::unauthenticated().into_response(),
                ProtectedArea::Page => Redirect::temporary(&sign_in_location(&path)).into_response(),
            }
        }
        Some(claims) if claims.role != Role::Admin => {
            tracing::warn!(%path, user = %claims.sub, role = %claims.role, "non-admin request to protected area");
            match area {
                ProtectedArea::Api => AppError::admin_required().into_response(),
                ProtectedArea::Page => Redirect::temporary("/").into_response(),
            }
        }
        Some(_) => next.run(request).await,
    }
}
