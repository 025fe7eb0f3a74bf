mod common;

use axum::http::StatusCode;
use common::{body_text, location, set_cookie, spawn_app};
use serde_json::Value;

#[tokio::test]
async fn test_published_post_is_listed_first() {
    let app = spawn_app().await;
    let session = app.login_as("alice", "secret1").await;

    let response = app
        .post_form("/", &[("title", "First"), ("body", "Older")], Some(&session))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = app
        .post_form("/", &[("title", "Hi"), ("body", "Hello")], Some(&session))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    let newest = html.find("<h2>Hi</h2>").unwrap();
    let older = html.find("<h2>First</h2>").unwrap();
    assert!(newest < older);
    assert!(html.contains("by alice on "));
    // Anonymous visitors see posts but no form
    assert!(!html.contains(r#"<form method="post" action="/">"#));
}

#[tokio::test]
async fn test_api_lists_posts_with_authors() {
    let app = spawn_app().await;

    let response = app.get("/api/posts", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json, serde_json::json!([]));

    let session = app.login_as("alice", "secret1").await;
    app.post_form("/", &[("title", "Hi"), ("body", "Hello")], Some(&session))
        .await;

    let response = app.get("/api/posts", None).await;
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    let posts = json.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], "Hi");
    assert_eq!(posts[0]["body"], "Hello");
    assert_eq!(posts[0]["author"], "alice");
}

#[tokio::test]
async fn test_anonymous_post_is_redirected_to_login() {
    let app = spawn_app().await;

    let response = app
        .post_form("/", &[("title", "Hi"), ("body", "Hello")], None)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/auth/login"));
    assert!(set_cookie(&response, "flash").is_some());

    let response = app.get("/api/posts", None).await;
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn test_invalid_post_rerenders_form() {
    let app = spawn_app().await;
    let session = app.login_as("alice", "secret1").await;

    let long_title = "x".repeat(141);
    let response = app
        .post_form(
            "/",
            &[("title", long_title.as_str()), ("body", "Hello")],
            Some(&session),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Title must be between 1 and 140 characters."));

    let response = app
        .post_form("/", &[("title", "Hi"), ("body", "   ")], Some(&session))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("This field is required."));

    let response = app.get("/api/posts", None).await;
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn test_post_content_is_escaped() {
    let app = spawn_app().await;
    let session = app.login_as("alice", "secret1").await;

    app.post_form(
        "/",
        &[("title", "<script>x</script>"), ("body", "a & b")],
        Some(&session),
    )
    .await;

    let html = body_text(app.get("/", None).await).await;
    assert!(html.contains("&lt;script&gt;x&lt;/script&gt;"));
    assert!(html.contains("a &amp; b"));
    assert!(!html.contains("<script>x</script>"));
}

#[tokio::test]
async fn test_unknown_route_renders_not_found_page() {
    let app = spawn_app().await;

    let response = app.get("/definitely/not/here", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let html = body_text(response).await;
    assert!(html.contains("The page you are looking for does not exist."));
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], "connected");
    assert_eq!(json["uploads"], "available");
}

#[tokio::test]
async fn test_health_reports_missing_upload_folder() {
    let app = spawn_app().await;
    std::fs::remove_dir_all(&app.config.upload_folder).unwrap();

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["database"], "connected");
    assert_eq!(json["uploads"], "missing");
}
