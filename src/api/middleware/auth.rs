use crate::AppState;
use crate::entities::users;
use crate::utils::auth::validate_jwt;
use crate::utils::flash::{Flash, push_flash};
use axum::{
    Extension,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

pub const SESSION_COOKIE: &str = "session";

/// The signed-in user, if any. Inserted into every request's extensions.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<users::Model>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }
}

/// Resolves the session cookie to a user. Bad or expired tokens and deleted
/// users all degrade to an anonymous session.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let user_id = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| validate_jwt(cookie.value(), &state.config.secret_key).ok())
        .and_then(|claims| claims.user_id());

    let user = match user_id {
        Some(id) => state.credentials.find_by_id(id).await.unwrap_or_else(|e| {
            tracing::error!("Failed to load session user {}: {}", id, e);
            None
        }),
        None => None,
    };

    req.extensions_mut().insert(Session { user });
    next.run(req).await
}

/// Sends anonymous visitors to the login page, remembering where they were going
pub async fn require_login(
    Extension(session): Extension<Session>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    if session.is_authenticated() {
        return next.run(req).await;
    }

    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let location = format!(
        "/auth/login?{}",
        serde_urlencoded::to_string([("next", target)]).unwrap_or_default()
    );

    let jar = push_flash(jar, Flash::error("Please log in to access this page."));
    (jar, Redirect::to(&location)).into_response()
}

/// Only same-site absolute paths are followed after login
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}
