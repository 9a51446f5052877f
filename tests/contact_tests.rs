mod common;

use axum::http::StatusCode;
use common::{FilePart, TestApp, multipart_body, multipart_request};
use portfolio_cms::{
    AppConfig,
    notifier::Job,
    webhooks::{self, CONTACT_FORM},
};
use serde_json::{Value, json};

fn valid_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("name", "Ada Lovelace"),
        ("email", "Ada@Example.com "),
        ("message", "I would like a website."),
        ("projectBudget", "5k-10k"),
    ]
}

#[tokio::test]
async fn test_contact_submission_is_stored() {
    let app = TestApp::new();

    let response = app
        .send(multipart_request(
            "/api/contact",
            None,
            "10.0.0.1",
            multipart_body(&valid_fields(), None),
        ))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["data"]["message"], "Message sent successfully");
    assert!(response.body["data"]["id"].is_string());

    let token = app.admin_token().await;
    let inbox = app.get("/api/admin/contact", Some(&token)).await;
    assert_eq!(inbox.body["data"]["total"], 1);
    let stored = &inbox.body["data"]["messages"][0];
    assert_eq!(stored["email"], "ada@example.com");
    assert_eq!(stored["projectBudget"], "5k-10k");
    assert_eq!(stored["processed"], false);
    assert_eq!(stored["file"], Value::Null);
}

#[tokio::test]
async fn test_contact_validation_failure() {
    let app = TestApp::new();

    let response = app
        .send(multipart_request(
            "/api/contact",
            None,
            "10.0.0.2",
            multipart_body(&[("name", "Ada"), ("email", "not-an-email"), ("message", "Hi")], None),
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["error"], "Invalid email address");

    let response = app
        .send(multipart_request(
            "/api/contact",
            None,
            "10.0.0.2",
            multipart_body(&[("name", "Ada"), ("email", "ada@example.com")], None),
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Message is required");
}

#[tokio::test]
async fn test_honeypot_is_silently_dropped() {
    let app = TestApp::with_config(AppConfig {
        webhook_url: Some("http://automation.local/hook".to_string()),
        contact_notify_email: Some("owner@example.com".to_string()),
        ..AppConfig::default()
    });

    let mut fields = valid_fields();
    fields.push(("website", "http://spam.example"));
    let response = app
        .send(multipart_request(
            "/api/contact",
            None,
            "10.0.0.3",
            multipart_body(&fields, None),
        ))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["message"], "Message received");
    assert!(response.body["data"].get("id").is_none());

    let token = app.admin_token().await;
    let inbox = app.get("/api/admin/contact", Some(&token)).await;
    assert_eq!(inbox.body["data"]["total"], 0);
    assert!(app.notifier.jobs().is_empty());
}

#[tokio::test]
async fn test_contact_rate_limit() {
    let app = TestApp::new();

    for _ in 0..5 {
        let response = app
            .send(multipart_request(
                "/api/contact",
                None,
                "203.0.113.9",
                multipart_body(&valid_fields(), None),
            ))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let limited = app
        .send(multipart_request(
            "/api/contact",
            None,
            "203.0.113.9",
            multipart_body(&valid_fields(), None),
        ))
        .await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.body["error"], "Too many requests. Please try again later.");

    // Other clients are unaffected.
    let other = app
        .send(multipart_request(
            "/api/contact",
            None,
            "203.0.113.10",
            multipart_body(&valid_fields(), None),
        ))
        .await;
    assert_eq!(other.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_contact_attachment_is_stored() {
    let app = TestApp::new();

    let response = app
        .send(multipart_request(
            "/api/contact",
            None,
            "10.0.0.4",
            multipart_body(
                &valid_fields(),
                Some(FilePart {
                    field: "file",
                    file_name: "brief.pdf",
                    content_type: "application/pdf",
                    bytes: b"%PDF-1.4 brief",
                }),
            ),
        ))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let stored = app.storage.stored();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].0, "contacts");
    assert_eq!(stored[0].1.file_name, "brief.pdf");

    let token = app.admin_token().await;
    let inbox = app.get("/api/admin/contact", Some(&token)).await;
    let file = &inbox.body["data"]["messages"][0]["file"];
    assert_eq!(file["name"], "brief.pdf");
    assert_eq!(file["url"], "http://localhost:9000/mock-bucket/contacts/brief.pdf");
}

#[tokio::test]
async fn test_contact_attachment_rules() {
    let app = TestApp::new();

    let wrong_type = app
        .send(multipart_request(
            "/api/contact",
            None,
            "10.0.0.5",
            multipart_body(
                &valid_fields(),
                Some(FilePart {
                    field: "file",
                    file_name: "notes.txt",
                    content_type: "text/plain",
                    bytes: b"plain text",
                }),
            ),
        ))
        .await;
    assert_eq!(wrong_type.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        wrong_type.body["error"],
        "Invalid file type. Only images and PDFs are allowed."
    );

    let oversized = vec![0u8; 5 * 1024 * 1024 + 1];
    let too_large = app
        .send(multipart_request(
            "/api/contact",
            None,
            "10.0.0.6",
            multipart_body(
                &valid_fields(),
                Some(FilePart {
                    field: "file",
                    file_name: "big.png",
                    content_type: "image/png",
                    bytes: &oversized,
                }),
            ),
        ))
        .await;
    assert_eq!(too_large.status, StatusCode::BAD_REQUEST);
    assert_eq!(too_large.body["error"], "File size exceeds 5MB limit");

    assert!(app.storage.stored().is_empty());
    let token = app.admin_token().await;
    let inbox = app.get("/api/admin/contact", Some(&token)).await;
    assert_eq!(inbox.body["data"]["total"], 0);
}

#[tokio::test]
async fn test_contact_queues_signed_webhook_and_owner_email() {
    let app = TestApp::with_config(AppConfig {
        webhook_url: Some("http://automation.local/hook".to_string()),
        webhook_secret: Some("shared-secret".to_string()),
        contact_notify_email: Some("owner@example.com".to_string()),
        ..AppConfig::default()
    });

    let response = app
        .send(multipart_request(
            "/api/contact",
            None,
            "10.0.0.7",
            multipart_body(&valid_fields(), None),
        ))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let jobs = app.notifier.jobs();
    assert_eq!(jobs.len(), 2);

    let Job::Webhook(hook) = &jobs[0] else {
        panic!("expected a webhook job first, got {:?}", jobs[0]);
    };
    assert_eq!(hook.event, CONTACT_FORM);
    let signature = hook.signature.as_deref().expect("signed with the shared secret");
    assert!(webhooks::verify(&hook.body, signature, "shared-secret").is_ok());

    let payload: Value = serde_json::from_slice(&hook.body).unwrap();
    assert_eq!(payload["type"], "contact_form");
    assert_eq!(payload["data"]["email"], "ada@example.com");
    assert_eq!(payload["data"]["id"], response.body["data"]["id"]);

    let Job::Email(mail) = &jobs[1] else {
        panic!("expected an email job second, got {:?}", jobs[1]);
    };
    assert_eq!(mail.to, "owner@example.com");
    assert!(mail.subject.contains("Ada Lovelace"));
    assert!(mail.text.contains("5k-10k"));
}

#[tokio::test]
async fn test_no_webhook_without_url() {
    let app = TestApp::new();
    app.send(multipart_request(
        "/api/contact",
        None,
        "10.0.0.8",
        multipart_body(&valid_fields(), None),
    ))
    .await;
    assert!(app.notifier.jobs().is_empty());
}

#[tokio::test]
async fn test_processed_flag_is_idempotent() {
    let app = TestApp::new();
    let created = app
        .send(multipart_request(
            "/api/contact",
            None,
            "10.0.0.9",
            multipart_body(&valid_fields(), None),
        ))
        .await;
    let id = created.body["data"]["id"].as_str().unwrap().to_string();
    let token = app.admin_token().await;

    for _ in 0..2 {
        let response = app
            .json(
                "PATCH",
                &format!("/api/admin/contact/{id}"),
                Some(&token),
                json!({"processed": true}),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["data"]["processed"], true);
    }

    let unread = app.get("/api/admin/contact?processed=false", Some(&token)).await;
    assert_eq!(unread.body["data"]["total"], 0);
    let done = app.get("/api/admin/contact?processed=true", Some(&token)).await;
    assert_eq!(done.body["data"]["total"], 1);

    let stats = app.get("/api/admin/stats", Some(&token)).await;
    assert_eq!(stats.body["data"]["counts"]["messages"], 1);
    assert_eq!(stats.body["data"]["counts"]["unread"], 0);
    assert_eq!(stats.body["data"]["recentActivity"][0]["title"], "Message from Ada Lovelace");

    let missing = app
        .json(
            "PATCH",
            &format!("/api/admin/contact/{}", uuid::Uuid::new_v4()),
            Some(&token),
            json!({"processed": true}),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["error"], "Message not found");
}
