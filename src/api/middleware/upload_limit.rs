use crate::AppState;
use crate::utils::flash::{Flash, push_flash};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

/// Redirect target and message for rejected oversized uploads
pub fn too_large_redirect(jar: CookieJar, max_size: usize) -> Response {
    let message = format!(
        "The file is too large. The limit is {} MB.",
        max_size / 1024 / 1024
    );
    (push_flash(jar, Flash::error(message)), Redirect::to("/upload")).into_response()
}

/// Turns any 413 from the upload route into a redirect back to the upload page
pub async fn payload_too_large_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;

    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!("Rejected oversized upload");
        return too_large_redirect(jar, state.config.max_content_length);
    }

    response
}
