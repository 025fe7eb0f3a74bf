#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use rust_blog_backend::config::AppConfig;
use rust_blog_backend::infrastructure::{database, storage};
use rust_blog_backend::{AppState, create_app};
use tempfile::TempDir;
use tower::ServiceExt;

/// Any 32 character value works: the cookie and the form just have to agree
pub const CSRF: &str = "TestCsrfToken0123456789abcdefXYZ";

pub struct TestApp {
    pub app: Router,
    pub config: AppConfig,
    pub dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::development(dir.path());

    let db = database::setup_database(&config.database_url).await.unwrap();
    let uploads = storage::setup_storage(&config.upload_folder, config.max_content_length)
        .await
        .unwrap();

    let app = create_app(AppState::new(db, uploads, config.clone()));
    TestApp { app, config, dir }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<axum::body::Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> Response<axum::body::Body> {
        let request = Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookies(session))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Submits a urlencoded form carrying a valid CSRF token
    pub async fn post_form(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        session: Option<&str>,
    ) -> Response<axum::body::Body> {
        let mut fields = fields.to_vec();
        fields.push(("csrf_token", CSRF));
        let body = serde_urlencoded::to_string(&fields).unwrap();

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::COOKIE, cookies(session))
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn register(&self, username: &str, password: &str) -> Response<axum::body::Body> {
        self.post_form(
            "/auth/register",
            &[
                ("username", username),
                ("password", password),
                ("password2", password),
            ],
            None,
        )
        .await
    }

    /// Registers and logs in, returning the session cookie value
    pub async fn login_as(&self, username: &str, password: &str) -> String {
        let response = self.register(username, password).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = self
            .post_form(
                "/auth/login",
                &[("username", username), ("password", password)],
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        set_cookie(&response, "session").expect("login sets a session cookie")
    }
}

pub fn cookies(session: Option<&str>) -> String {
    match session {
        Some(token) => format!("csrf_token={}; session={}", CSRF, token),
        None => format!("csrf_token={}", CSRF),
    }
}

/// Value of the named cookie in the response's Set-Cookie headers
pub fn set_cookie<B>(response: &Response<B>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            let pair = v.split(';').next()?.trim();
            pair.strip_prefix(&prefix).map(str::to_string)
        })
}

pub fn location<B>(response: &Response<B>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub async fn body_text(response: Response<axum::body::Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}
