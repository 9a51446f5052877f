mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::TestApp;
use portfolio_cms::{
    AppConfig,
    webhooks::{self, SIGNATURE_HEADER, WebhookError},
};
use serde_json::{Value, json};

const SECRET: &str = "automation-secret";

fn inbound(body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/webhooks/automation")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn app_with_secret() -> TestApp {
    TestApp::with_config(AppConfig {
        webhook_secret: Some(SECRET.to_string()),
        ..AppConfig::default()
    })
}

// --- Signing ---

#[test]
fn test_sign_and_verify() {
    let body = br#"{"type":"contact_form"}"#;
    let signature = webhooks::sign(body, SECRET).unwrap();
    assert_eq!(signature.len(), 64);
    assert!(webhooks::verify(body, &signature, SECRET).is_ok());
    // Header values may arrive uppercased.
    assert!(webhooks::verify(body, &signature.to_uppercase(), SECRET).is_ok());
}

#[test]
fn test_tampering_is_detected() {
    let signature = webhooks::sign(b"original", SECRET).unwrap();
    assert!(matches!(
        webhooks::verify(b"modified", &signature, SECRET),
        Err(WebhookError::SignatureMismatch)
    ));
    assert!(webhooks::verify(b"original", &signature, "other-secret").is_err());
    assert!(webhooks::verify(b"original", "", SECRET).is_err());
}

#[test]
fn test_build_signed_envelope() {
    let hook = webhooks::build_signed("project_created", &json!({"slug": "x"}), Some(SECRET)).unwrap();
    let envelope: Value = serde_json::from_slice(&hook.body).unwrap();
    assert_eq!(envelope["type"], "project_created");
    assert_eq!(envelope["data"]["slug"], "x");
    assert!(envelope["timestamp"].is_string());
    assert!(webhooks::verify(&hook.body, hook.signature.as_deref().unwrap(), SECRET).is_ok());

    let unsigned = webhooks::build_signed("project_created", &json!({}), None).unwrap();
    assert!(unsigned.signature.is_none());
}

// --- Inbound endpoint ---

#[tokio::test]
async fn test_inbound_with_valid_signature() {
    let app = app_with_secret();
    let body = r#"{"type":"blog_published","data":{"slug":"hello"}}"#;
    let signature = webhooks::sign(body.as_bytes(), SECRET).unwrap();

    let response = app.send(inbound(body, Some(&signature))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["received"], true);
    assert_eq!(response.body["data"]["type"], "blog_published");
}

#[tokio::test]
async fn test_inbound_signature_required_when_secret_set() {
    let app = app_with_secret();
    let body = r#"{"type":"contact_form"}"#;

    let missing = app.send(inbound(body, None)).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["error"], "Missing webhook signature");

    let wrong = app.send(inbound(body, Some("deadbeef"))).await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["error"], "Invalid webhook signature");
}

#[tokio::test]
async fn test_inbound_without_secret_skips_verification() {
    let app = TestApp::new();
    let response = app.send(inbound(r#"{"type":"something_new"}"#, None)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["type"], "something_new");
}

#[tokio::test]
async fn test_inbound_malformed_payload() {
    let app = TestApp::new();
    let response = app.send(inbound("not json", None)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
}
