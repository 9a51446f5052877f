mod common;

use axum::http::{StatusCode, header};
use chrono::{Duration, Utc};
use common::{TestApp, post_payload, project_payload};
use portfolio_cms::models::Role;
use serde_json::json;

// --- Envelope & health ---

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let response = app
        .send(common::request("GET", "/health", None, None))
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_success_and_error_envelopes() {
    let app = TestApp::new();

    let ok = app.get("/api/projects", None).await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.body["success"], true);
    assert_eq!(ok.body["data"]["projects"], json!([]));
    assert_eq!(ok.body["data"]["total"], 0);
    assert_eq!(ok.body["data"]["limit"], 20);
    assert_eq!(ok.body["data"]["skip"], 0);

    let missing = app.get("/api/projects/nope", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["success"], false);
    assert_eq!(missing.body["error"], "Project not found");
}

#[tokio::test]
async fn test_invalid_pagination_is_rejected() {
    let app = TestApp::new();

    let response = app.get("/api/projects?limit=0", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "limit must be between 1 and 100");

    let response = app.get("/api/blog?skip=-1", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "skip cannot be negative");
}

// --- Admin gate ---

#[tokio::test]
async fn test_admin_api_requires_session() {
    let app = TestApp::new();
    let response = app.get("/api/admin/stats", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Authentication required");
}

#[tokio::test]
async fn test_admin_api_rejects_non_admin() {
    let app = TestApp::new();
    let (_, token) = app.login("viewer@example.com", Role::Viewer).await;

    let response = app.get("/api/admin/stats", Some(&token)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["error"], "Forbidden: Admin access required");

    // Editors are not admins either.
    let (_, token) = app.login("editor@example.com", Role::Editor).await;
    let response = app.get("/api/admin/projects", Some(&token)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_api_rejects_unknown_admin_route_without_session() {
    let app = TestApp::new();
    // The gate runs before routing, so even unmatched paths are protected.
    let response = app.get("/api/admin/does-not-exist", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_pages_redirect() {
    let app = TestApp::new();

    let anonymous = app.get("/admin/projects", None).await;
    assert_eq!(anonymous.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        anonymous.headers[header::LOCATION],
        "/auth/signin?callbackUrl=%2Fadmin%2Fprojects"
    );

    let (_, token) = app.login("viewer@example.com", Role::Viewer).await;
    let viewer = app.get("/dashboard", Some(&token)).await;
    assert_eq!(viewer.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(viewer.headers[header::LOCATION], "/");
}

#[tokio::test]
async fn test_gate_matches_whole_segments() {
    let app = TestApp::new();
    // "/administrator" is not under "/admin".
    let response = app.get("/administrator", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_cookie_is_accepted() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let request = axum::http::Request::builder()
        .uri("/api/admin/stats")
        .header(header::COOKIE, format!("theme=dark; session_token={token}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::OK);
}

// --- Projects ---

#[tokio::test]
async fn test_project_lifecycle() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let created = app
        .json("POST", "/api/admin/projects", Some(&token), project_payload("realtime-dashboard"))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created.body["data"]["githubLink"], json!(null));
    assert_eq!(created.body["data"]["featured"], true);

    let public = app.get("/api/projects/realtime-dashboard", None).await;
    assert_eq!(public.status, StatusCode::OK);
    assert_eq!(public.body["data"]["title"], "Realtime Dashboard");

    let updated = app
        .json(
            "PATCH",
            &format!("/api/admin/projects/{id}"),
            Some(&token),
            json!({"title": "Live Dashboard", "liveLink": ""}),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["data"]["title"], "Live Dashboard");
    assert_eq!(updated.body["data"]["liveLink"], json!(null));
    // Untouched fields keep their value.
    assert_eq!(updated.body["data"]["role"], "Lead engineer");

    let deleted = app
        .json("DELETE", &format!("/api/admin/projects/{id}"), Some(&token), json!({}))
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["data"]["message"], "Project deleted successfully");

    let gone = app.get("/api/projects/realtime-dashboard", None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_project_slug_conflicts_without_mutation() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    app.json("POST", "/api/admin/projects", Some(&token), project_payload("one"))
        .await;
    let second = app
        .json("POST", "/api/admin/projects", Some(&token), project_payload("two"))
        .await;
    let second_id = second.body["data"]["id"].as_str().unwrap().to_string();

    let duplicate = app
        .json("POST", "/api/admin/projects", Some(&token), project_payload("one"))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["error"], "A project with this slug already exists");

    let rename = app
        .json(
            "PUT",
            &format!("/api/admin/projects/{second_id}"),
            Some(&token),
            json!({"slug": "one", "title": "Renamed"}),
        )
        .await;
    assert_eq!(rename.status, StatusCode::CONFLICT);

    let unchanged = app.get("/api/projects/two", None).await;
    assert_eq!(unchanged.body["data"]["title"], "Realtime Dashboard");

    let list = app.get("/api/projects", None).await;
    assert_eq!(list.body["data"]["total"], 2);
}

#[tokio::test]
async fn test_project_validation_messages() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let mut payload = project_payload("Bad Slug");
    let response = app
        .json("POST", "/api/admin/projects", Some(&token), payload.clone())
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["error"],
        "Slug must contain only lowercase letters, numbers, and hyphens"
    );

    payload["slug"] = json!("fine-slug");
    payload["title"] = json!("   ");
    let response = app
        .json("POST", "/api/admin/projects", Some(&token), payload)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Title is required");
}

#[tokio::test]
async fn test_missing_required_fields_use_field_messages() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let mut payload = project_payload("no-title");
    payload.as_object_mut().unwrap().remove("title");
    let response = app
        .json("POST", "/api/admin/projects", Some(&token), payload)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Title is required");

    let mut post = post_payload("no-content", None);
    post.as_object_mut().unwrap().remove("contentMarkdown");
    let response = app.json("POST", "/api/admin/blog", Some(&token), post).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Content is required");

    let about = app
        .json("POST", "/api/about", Some(&token), json!({"title": "Hi"}))
        .await;
    assert_eq!(about.status, StatusCode::BAD_REQUEST);
    assert_eq!(about.body["error"], "Title and bio are required");
}

#[tokio::test]
async fn test_uppercase_slug_is_normalized() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let response = app
        .json("POST", "/api/admin/projects", Some(&token), project_payload("  My-Project "))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["data"]["slug"], "my-project");
}

#[tokio::test]
async fn test_featured_filter_and_pagination() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    for (slug, featured) in [("a", true), ("b", false), ("c", true)] {
        let mut payload = project_payload(slug);
        payload["featured"] = json!(featured);
        app.json("POST", "/api/admin/projects", Some(&token), payload)
            .await;
    }

    let featured = app.get("/api/projects?featured=true", None).await;
    assert_eq!(featured.body["data"]["total"], 2);

    let page = app.get("/api/projects?limit=1&skip=1", None).await;
    assert_eq!(page.body["data"]["total"], 3);
    assert_eq!(page.body["data"]["projects"].as_array().unwrap().len(), 1);
    // Newest first: c, b, a.
    assert_eq!(page.body["data"]["projects"][0]["slug"], "b");
}

#[tokio::test]
async fn test_invalid_uuid_is_not_found() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let response = app
        .json("PUT", "/api/admin/projects/not-a-uuid", Some(&token), json!({"title": "x"}))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Project not found");

    let response = app
        .json("DELETE", "/api/admin/blog/123", Some(&token), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// --- Blog ---

#[tokio::test]
async fn test_drafts_are_hidden_from_public() {
    let app = TestApp::new();
    app.repo
        .insert_post("live", Some(Utc::now() - Duration::days(1)))
        .await;
    app.repo.insert_post("draft", None).await;
    app.repo
        .insert_post("scheduled", Some(Utc::now() + Duration::days(7)))
        .await;

    let list = app.get("/api/blog", None).await;
    assert_eq!(list.body["data"]["total"], 1);
    assert_eq!(list.body["data"]["posts"][0]["slug"], "live");

    // A non-admin cannot opt into drafts.
    let (_, viewer) = app.login("viewer@example.com", Role::Viewer).await;
    let list = app.get("/api/blog?published=false", Some(&viewer)).await;
    assert_eq!(list.body["data"]["total"], 1);

    let draft = app.get("/api/blog/draft", None).await;
    assert_eq!(draft.status, StatusCode::NOT_FOUND);
    let scheduled = app.get("/api/blog/scheduled", Some(&viewer)).await;
    assert_eq!(scheduled.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_sees_drafts() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    app.repo
        .insert_post("live", Some(Utc::now() - Duration::days(1)))
        .await;
    app.repo.insert_post("draft", None).await;

    let public_list = app.get("/api/blog?published=false", Some(&token)).await;
    assert_eq!(public_list.body["data"]["total"], 2);

    let admin_list = app.get("/api/admin/blog", Some(&token)).await;
    assert_eq!(admin_list.body["data"]["total"], 2);

    let published_only = app.get("/api/admin/blog?published=true", Some(&token)).await;
    assert_eq!(published_only.body["data"]["total"], 1);

    let draft = app.get("/api/blog/draft", Some(&token)).await;
    assert_eq!(draft.status, StatusCode::OK);
}

#[tokio::test]
async fn test_blog_lifecycle_with_date_only_publication() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let created = app
        .json("POST", "/api/admin/blog", Some(&token), post_payload("hello", Some("2024-01-15")))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["data"]["publishedAt"], "2024-01-15T00:00:00Z");
    let id = created.body["data"]["id"].as_str().unwrap().to_string();

    let tagged = app.get("/api/blog?tag=rust", None).await;
    assert_eq!(tagged.body["data"]["total"], 1);
    let other_tag = app.get("/api/blog?tag=go", None).await;
    assert_eq!(other_tag.body["data"]["total"], 0);

    let duplicate = app
        .json("POST", "/api/admin/blog", Some(&token), post_payload("hello", None))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["error"], "A blog post with this slug already exists");

    let deleted = app
        .json("DELETE", &format!("/api/admin/blog/{id}"), Some(&token), json!({}))
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
}

// --- About ---

#[tokio::test]
async fn test_about_upsert_and_read() {
    let app = TestApp::new();

    let missing = app.get("/api/about", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let payload = json!({"title": "Hi", "bio": "I build things", "skills": ["rust"]});
    let anonymous = app.json("POST", "/api/about", None, payload.clone()).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let (_, viewer) = app.login("viewer@example.com", Role::Viewer).await;
    let forbidden = app.json("POST", "/api/about", Some(&viewer), payload.clone()).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let token = app.admin_token().await;
    let invalid = app
        .json("POST", "/api/about", Some(&token), json!({"title": "Hi", "bio": ""}))
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.body["error"], "Title and bio are required");

    let first = app.json("POST", "/api/about", Some(&token), payload).await;
    assert_eq!(first.status, StatusCode::CREATED);
    let second = app
        .json("POST", "/api/about", Some(&token), json!({"title": "Hello", "bio": "Still building"}))
        .await;
    assert_eq!(second.body["data"]["id"], first.body["data"]["id"]);

    let read = app.get("/api/about", None).await;
    assert_eq!(read.body["data"]["title"], "Hello");
    assert_eq!(read.body["data"]["skills"], json!([]));
}

// --- Stats ---

#[tokio::test]
async fn test_admin_stats_counts_and_recent_activity() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    for slug in ["p1", "p2", "p3", "p4"] {
        app.json("POST", "/api/admin/projects", Some(&token), project_payload(slug))
            .await;
    }
    app.json("POST", "/api/admin/blog", Some(&token), post_payload("b1", None))
        .await;

    let stats = app.get("/api/admin/stats", Some(&token)).await;
    assert_eq!(stats.status, StatusCode::OK);
    let data = &stats.body["data"];
    assert_eq!(data["counts"]["projects"], 4);
    assert_eq!(data["counts"]["posts"], 1);
    assert_eq!(data["counts"]["messages"], 0);
    assert_eq!(data["counts"]["unread"], 0);

    let recent = data["recentActivity"].as_array().unwrap();
    // At most three per collection: 3 projects + 1 post.
    assert_eq!(recent.len(), 4);
    assert_eq!(recent[0]["type"], "post");
    assert_eq!(recent[0]["id"], "b1");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::new();
    let response = app.get("/api-docs/openapi.json", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["paths"]["/api/admin/projects"].is_object());
}
