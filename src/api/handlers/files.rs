use super::{csrf_rejected, page_context};
use crate::AppState;
use crate::api::error::AppError;
use crate::api::middleware::auth::Session;
use crate::api::middleware::upload_limit::too_large_redirect;
use crate::api::views;
use crate::services::uploads::UploadError;
use crate::utils::csrf::verify_token;
use crate::utils::flash::{Flash, push_flash};
use axum::{
    Extension,
    body::Body,
    extract::{
        Multipart, Path, State,
        multipart::{Field, MultipartError},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tokio_util::io::ReaderStream;

pub async fn upload_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let files = state.uploads.list().await?;
    let (jar, ctx) = page_context(jar, &session);
    let html = views::upload_page(&ctx, &files, state.uploads.max_file_size());
    Ok((jar, Html(html)).into_response())
}

pub async fn upload_file(
    State(state): State<AppState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let max_size = state.uploads.max_file_size();
    let mut csrf_token = String::new();
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return multipart_failure(e, jar, max_size),
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "csrf_token" => match field.text().await {
                Ok(text) => csrf_token = text,
                Err(e) => return multipart_failure(e, jar, max_size),
            },
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match read_capped(field, max_size).await {
                    Ok(Some(data)) => upload = Some((filename, data)),
                    Ok(None) => return Ok(too_large_redirect(jar, max_size)),
                    Err(e) => return multipart_failure(e, jar, max_size),
                }
            }
            _ => {}
        }
    }

    if !verify_token(&jar, &csrf_token) {
        return Ok(csrf_rejected());
    }

    let Some((filename, data)) = upload.filter(|(filename, _)| !filename.is_empty()) else {
        let jar = push_flash(jar, Flash::error("No file selected."));
        return Ok((jar, Redirect::to("/upload")).into_response());
    };

    let jar = match state.uploads.save(&filename, &data).await {
        Ok(stored) => push_flash(
            jar,
            Flash::info(format!("File uploaded successfully: {}", stored.name)),
        ),
        Err(UploadError::InvalidName(_)) => push_flash(jar, Flash::error("Invalid file name.")),
        Err(e) => return Err(e.into()),
    };

    Ok((jar, Redirect::to("/upload")).into_response())
}

/// Buffers a file field, giving up with `None` once it exceeds `max_size`
async fn read_capped(
    mut field: Field<'_>,
    max_size: usize,
) -> Result<Option<Vec<u8>>, MultipartError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if data.len() + chunk.len() > max_size {
            return Ok(None);
        }
        data.extend_from_slice(&chunk);
    }
    Ok(Some(data))
}

fn multipart_failure(
    e: MultipartError,
    jar: CookieJar,
    max_size: usize,
) -> Result<Response, AppError> {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return Ok(too_large_redirect(jar, max_size));
    }
    Err(AppError::BadRequest(e.body_text()))
}

pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let (file, len) = state.uploads.open(&filename).await?;

    let body = Body::from_stream(ReaderStream::new(file));

    // Names served here already passed sanitization, so quoting is safe
    let headers = [
        (
            header::CONTENT_TYPE,
            mime::APPLICATION_OCTET_STREAM.to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
        (header::CONTENT_LENGTH, len.to_string()),
    ];

    Ok((headers, body).into_response())
}
