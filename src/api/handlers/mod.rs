pub mod auth;
pub mod files;
pub mod health;
pub mod posts;

use crate::api::middleware::auth::Session;
use crate::api::views::{FormErrors, PageContext};
use crate::utils::csrf::ensure_token;
use crate::utils::flash::take_flashes;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use validator::ValidationErrors;

/// Consumes pending flashes and makes sure a CSRF token is issued
pub(crate) fn page_context(jar: CookieJar, session: &Session) -> (CookieJar, PageContext) {
    let (jar, flashes) = take_flashes(jar);
    let (jar, csrf_token) = ensure_token(jar);
    let ctx = PageContext {
        username: session.username().map(str::to_string),
        flashes,
        csrf_token,
    };
    (jar, ctx)
}

pub(crate) fn form_errors(errors: &ValidationErrors) -> FormErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

pub(crate) fn csrf_rejected() -> Response {
    tracing::warn!("Rejected form submission with a missing or invalid CSRF token");
    (
        StatusCode::BAD_REQUEST,
        Html("<h1>400</h1><p>The CSRF token is missing or invalid.</p>"),
    )
        .into_response()
}

/// Fallback for unmatched routes
pub async fn not_found(
    session: Option<axum::Extension<Session>>,
    jar: CookieJar,
) -> impl IntoResponse {
    let session = session.map(|s| s.0).unwrap_or_default();
    let (jar, ctx) = page_context(jar, &session);
    (
        StatusCode::NOT_FOUND,
        jar,
        Html(crate::api::views::not_found_page(Some(&ctx))),
    )
}
