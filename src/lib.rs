pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::api::handlers;
use crate::api::middleware;
use crate::config::AppConfig;
use crate::services::credentials::CredentialStore;
use crate::services::posts::ContentStore;
use crate::services::uploads::UploadStore;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::posts::api_posts,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            services::posts::PostView,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "posts", description = "Blog posts"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

/// Everything a request handler may touch, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub credentials: CredentialStore,
    pub content: ContentStore,
    pub uploads: Arc<UploadStore>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: DatabaseConnection, uploads: Arc<UploadStore>, config: AppConfig) -> Self {
        Self {
            credentials: CredentialStore::new(db.clone()),
            content: ContentStore::new(db.clone()),
            db,
            uploads,
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let login_required = from_fn(middleware::auth::require_login);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route(
            "/",
            get(handlers::posts::index).post(handlers::posts::create_post),
        )
        .route(
            "/auth/login",
            get(handlers::auth::login_page).post(handlers::auth::login),
        )
        .route(
            "/auth/logout",
            get(handlers::auth::logout).route_layer(login_required.clone()),
        )
        .route(
            "/auth/register",
            get(handlers::auth::register_page).post(handlers::auth::register),
        )
        .route(
            "/upload",
            get(handlers::files::upload_page)
                .post(handlers::files::upload_file)
                .route_layer(from_fn_with_state(
                    state.clone(),
                    middleware::upload_limit::payload_too_large_redirect,
                ))
                .route_layer(login_required),
        )
        .route("/uploads/*filename", get(handlers::files::download_file))
        .route("/api/posts", get(handlers::posts::api_posts))
        .route("/health", get(handlers::health::health_check))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(state.config.max_content_length))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::session_middleware,
        ))
        .layer(from_fn(middleware::request_id::request_id_middleware))
        .with_state(state)
}
