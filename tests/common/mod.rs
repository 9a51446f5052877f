#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use portfolio_cms::{
    AppConfig, AppState, InMemoryRepository, MockStorageService, auth, create_router,
    mailer::{MailerState, RecordingMailer},
    models::{Role, User},
    notifier::{NotifierState, RecordingNotifier},
    repository::RepositoryState,
    storage::StorageState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "----portfolio-test-boundary";

/// Router over in-memory collaborators, with handles kept for assertions.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryRepository>,
    pub storage: Arc<MockStorageService>,
    pub notifier: Arc<RecordingNotifier>,
    pub mailer: Arc<RecordingMailer>,
    pub config: AppConfig,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(AppConfig::default(), MockStorageService::new())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with(config, MockStorageService::new())
    }

    pub fn with(config: AppConfig, storage: MockStorageService) -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let storage = Arc::new(storage);
        let notifier = Arc::new(RecordingNotifier::new());
        let mailer = Arc::new(RecordingMailer::new());

        let state = AppState::new(
            repo.clone() as RepositoryState,
            storage.clone() as StorageState,
            notifier.clone() as NotifierState,
            mailer.clone() as MailerState,
            config.clone(),
        );

        Self {
            router: create_router(state),
            repo,
            storage,
            notifier,
            mailer,
            config,
        }
    }

    /// Seeds a user and returns a valid bearer token for it.
    pub async fn login(&self, email: &str, role: Role) -> (User, String) {
        let user = self.repo.insert_user(email, role).await;
        let session = auth::issue_session(&self.config, &user).expect("session should be issued");
        (user, session.token)
    }

    pub async fn admin_token(&self) -> String {
        self.login("admin@example.com", Role::Admin).await.1
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let (status, headers, bytes) = self.send_raw(request).await;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Like [`TestApp::send`] but keeps the body as bytes.
    pub async fn send_raw(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should not fail");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        (status, headers, bytes)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request("GET", uri, token, None)).await
    }

    pub async fn json(&self, method: &str, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(request(method, uri, token, Some(body))).await
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// A file part for [`multipart_body`].
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

pub fn multipart_body(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.field, file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str, token: Option<&str>, client_ip: &str, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("x-forwarded-for", client_ip);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn project_payload(slug: &str) -> Value {
    serde_json::json!({
        "title": "Realtime Dashboard",
        "slug": slug,
        "shortDescription": "Streaming metrics for a logistics team",
        "problem": "Reports were a day late",
        "solution": "Event pipeline with live charts",
        "role": "Lead engineer",
        "techStack": ["rust", "postgres"],
        "keyDecisions": ["Push over poll"],
        "screenshots": [{"url": "https://example.com/shot.png", "alt": "Overview"}],
        "liveLink": "https://example.com",
        "githubLink": "",
        "featured": true
    })
}

pub fn post_payload(slug: &str, published_at: Option<&str>) -> Value {
    serde_json::json!({
        "title": "Shipping a CMS",
        "slug": slug,
        "excerpt": "What went into it",
        "contentMarkdown": "# Hello",
        "tags": ["rust"],
        "publishedAt": published_at
    })
}
