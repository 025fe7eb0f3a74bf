use super::{csrf_rejected, form_errors, page_context};
use crate::AppState;
use crate::api::error::AppError;
use crate::api::middleware::auth::Session;
use crate::api::views::{self, FormErrors};
use crate::services::posts::PostView;
use crate::utils::csrf::verify_token;
use crate::utils::flash::{Flash, push_flash};
use axum::{
    Extension, Form, Json,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PostForm {
    #[validate(length(
        min = 1,
        max = 140,
        message = "Title must be between 1 and 140 characters."
    ))]
    pub title: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub body: String,
    pub csrf_token: String,
}

pub async fn index(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let posts = state.content.list_posts().await?;
    let (jar, ctx) = page_context(jar, &session);
    let html = views::index_page(&ctx, &posts, "", "", &FormErrors::new());
    Ok((jar, Html(html)).into_response())
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    Form(mut form): Form<PostForm>,
) -> Result<Response, AppError> {
    let Some(author) = session.user.as_ref() else {
        let jar = push_flash(jar, Flash::error("Please log in to publish posts."));
        return Ok((jar, Redirect::to("/auth/login?next=%2F")).into_response());
    };
    if !verify_token(&jar, &form.csrf_token) {
        return Ok(csrf_rejected());
    }

    form.title = form.title.trim().to_string();
    if form.body.trim().is_empty() {
        form.body.clear();
    }

    if let Err(errors) = form.validate() {
        let posts = state.content.list_posts().await?;
        let (jar, ctx) = page_context(jar, &session);
        let html = views::index_page(
            &ctx,
            &posts,
            &form.title,
            &form.body,
            &form_errors(&errors),
        );
        return Ok((jar, Html(html)).into_response());
    }

    state
        .content
        .create_post(author, &form.title, &form.body)
        .await?;

    let jar = push_flash(jar, Flash::info("Post published."));
    Ok((jar, Redirect::to("/")).into_response())
}

#[utoipa::path(
    get,
    path = "/api/posts",
    responses(
        (status = 200, description = "All posts, newest first", body = [PostView])
    ),
    tag = "posts"
)]
pub async fn api_posts(State(state): State<AppState>) -> Result<Json<Vec<PostView>>, AppError> {
    let posts = state.content.list_posts().await?;
    Ok(Json(posts))
}
