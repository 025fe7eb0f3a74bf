use super::{csrf_rejected, form_errors, page_context};
use crate::AppState;
use crate::api::error::AppError;
use crate::api::middleware::auth::{SESSION_COOKIE, Session, safe_next};
use crate::api::views::{self, FormErrors};
use crate::services::credentials::CredentialError;
use crate::utils::auth::create_jwt;
use crate::utils::csrf::verify_token;
use crate::utils::flash::{Flash, push_flash};
use axum::{
    Extension, Form,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
    pub csrf_token: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterForm {
    #[validate(length(
        min = 1,
        max = 80,
        message = "Username must be between 1 and 80 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password must be between 6 and 128 characters."
    ))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords must match."))]
    pub password2: String,
    pub csrf_token: String,
}

pub async fn login_page(
    Extension(session): Extension<Session>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> Response {
    if session.is_authenticated() {
        return Redirect::to("/").into_response();
    }

    let (jar, ctx) = page_context(jar, &session);
    let html = views::login_page(&ctx, "", query.next.as_deref(), &FormErrors::new());
    (jar, Html(html)).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
    Form(mut form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if session.is_authenticated() {
        return Ok(Redirect::to("/").into_response());
    }
    if !verify_token(&jar, &form.csrf_token) {
        return Ok(csrf_rejected());
    }

    form.username = form.username.trim().to_string();
    if let Err(errors) = form.validate() {
        let (jar, ctx) = page_context(jar, &session);
        let html = views::login_page(
            &ctx,
            &form.username,
            query.next.as_deref(),
            &form_errors(&errors),
        );
        return Ok((jar, Html(html)).into_response());
    }

    let Some(user) = state
        .credentials
        .authenticate(&form.username, &form.password)
        .await?
    else {
        tracing::info!("Failed login attempt for '{}'", form.username);
        let (jar, mut ctx) = page_context(jar, &session);
        ctx.flashes.push(Flash::error("Invalid username or password."));
        let html = views::login_page(
            &ctx,
            &form.username,
            query.next.as_deref(),
            &FormErrors::new(),
        );
        return Ok((jar, Html(html)).into_response());
    };

    let token = create_jwt(user.id, &state.config.secret_key)?;
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    tracing::info!("🔑 '{}' logged in", user.username);

    let jar = push_flash(
        jar.add(cookie),
        Flash::info(format!("Welcome, {}!", user.username)),
    );
    let target = safe_next(query.next.as_deref()).to_string();
    Ok((jar, Redirect::to(&target)).into_response())
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    let jar = push_flash(jar, Flash::info("You have been logged out."));
    (jar, Redirect::to("/"))
}

pub async fn register_page(Extension(session): Extension<Session>, jar: CookieJar) -> Response {
    if session.is_authenticated() {
        return Redirect::to("/").into_response();
    }

    let (jar, ctx) = page_context(jar, &session);
    let html = views::register_page(&ctx, "", &FormErrors::new());
    (jar, Html(html)).into_response()
}

pub async fn register(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    Form(mut form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if session.is_authenticated() {
        return Ok(Redirect::to("/").into_response());
    }
    if !verify_token(&jar, &form.csrf_token) {
        return Ok(csrf_rejected());
    }

    form.username = form.username.trim().to_string();
    let mut errors = match form.validate() {
        Ok(()) => FormErrors::new(),
        Err(e) => form_errors(&e),
    };

    if errors.is_empty() {
        match state
            .credentials
            .create_user(&form.username, &form.password)
            .await
        {
            Ok(_) => {
                let jar = push_flash(jar, Flash::info("Account created. You can now log in."));
                return Ok((jar, Redirect::to("/auth/login")).into_response());
            }
            Err(CredentialError::UsernameTaken(_)) => {
                errors
                    .entry("username".to_string())
                    .or_default()
                    .push("Username already exists. Choose another.".to_string());
            }
            Err(e) => return Err(e.into()),
        }
    }

    let (jar, ctx) = page_context(jar, &session);
    let html = views::register_page(&ctx, &form.username, &errors);
    Ok((jar, Html(html)).into_response())
}
