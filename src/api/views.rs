//! Server-rendered HTML pages.

use crate::services::posts::PostView;
use crate::utils::flash::Flash;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Field name -> messages
pub type FormErrors = BTreeMap<String, Vec<String>>;

/// Per-request data every page needs
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub username: Option<String>,
    pub flashes: Vec<Flash>,
    pub csrf_token: String,
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, ctx: Option<&PageContext>, content: &str) -> String {
    let mut nav = String::from(r#"<a href="/">Home</a>"#);
    match ctx.and_then(|c| c.username.as_deref()) {
        Some(username) => {
            let _ = write!(
                nav,
                r#" | <a href="/upload">Files</a> | <span>{}</span> | <a href="/auth/logout">Log out</a>"#,
                escape(username)
            );
        }
        None => nav.push_str(
            r#" | <a href="/auth/login">Log in</a> | <a href="/auth/register">Register</a>"#,
        ),
    }

    let mut flashes = String::new();
    for flash in ctx.map(|c| c.flashes.as_slice()).unwrap_or_default() {
        let _ = write!(
            flashes,
            r#"<div class="flash flash-{}">{}</div>"#,
            flash.category.as_str(),
            escape(&flash.message)
        );
    }

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body>
<nav>{nav}</nav>
<main>
{flashes}
{content}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

fn csrf_field(ctx: &PageContext) -> String {
    format!(
        r#"<input type="hidden" name="csrf_token" value="{}">"#,
        escape(&ctx.csrf_token)
    )
}

fn field_errors(errors: &FormErrors, field: &str) -> String {
    errors
        .get(field)
        .map(|messages| {
            messages
                .iter()
                .map(|m| format!(r#"<span class="error">{}</span>"#, escape(m)))
                .collect()
        })
        .unwrap_or_default()
}

pub fn index_page(
    ctx: &PageContext,
    posts: &[PostView],
    title: &str,
    body: &str,
    errors: &FormErrors,
) -> String {
    let mut content = String::from("<h1>Posts</h1>\n");

    if ctx.username.is_some() {
        let _ = write!(
            content,
            r#"<form method="post" action="/">
{csrf}
<label>Title <input name="title" maxlength="140" value="{title}"></label>{title_errors}
<label>Content <textarea name="body">{body}</textarea></label>{body_errors}
<button type="submit">Publish</button>
</form>
"#,
            csrf = csrf_field(ctx),
            title = escape(title),
            body = escape(body),
            title_errors = field_errors(errors, "title"),
            body_errors = field_errors(errors, "body"),
        );
    }

    if posts.is_empty() {
        content.push_str("<p>No posts yet.</p>\n");
    }
    for post in posts {
        let _ = write!(
            content,
            r#"<article class="post">
<h2>{}</h2>
<p class="meta">by {} on {}</p>
<p>{}</p>
</article>
"#,
            escape(&post.title),
            escape(post.author.as_deref().unwrap_or("unknown")),
            post.timestamp.format("%Y-%m-%d %H:%M"),
            escape(&post.body),
        );
    }

    layout("Home", Some(ctx), &content)
}

pub fn login_page(
    ctx: &PageContext,
    username: &str,
    next: Option<&str>,
    errors: &FormErrors,
) -> String {
    let action = match next {
        Some(next) => format!(
            "/auth/login?{}",
            serde_urlencoded::to_string([("next", next)]).unwrap_or_default()
        ),
        None => "/auth/login".to_string(),
    };

    let content = format!(
        r#"<h1>Log in</h1>
<form method="post" action="{action}">
{csrf}
<label>Username <input name="username" value="{username}"></label>{username_errors}
<label>Password <input type="password" name="password"></label>{password_errors}
<button type="submit">Log in</button>
</form>
"#,
        action = escape(&action),
        csrf = csrf_field(ctx),
        username = escape(username),
        username_errors = field_errors(errors, "username"),
        password_errors = field_errors(errors, "password"),
    );

    layout("Log in", Some(ctx), &content)
}

pub fn register_page(ctx: &PageContext, username: &str, errors: &FormErrors) -> String {
    let content = format!(
        r#"<h1>Register</h1>
<form method="post" action="/auth/register">
{csrf}
<label>Username <input name="username" maxlength="80" value="{username}"></label>{username_errors}
<label>Password <input type="password" name="password"></label>{password_errors}
<label>Repeat password <input type="password" name="password2"></label>{password2_errors}
<button type="submit">Register</button>
</form>
"#,
        csrf = csrf_field(ctx),
        username = escape(username),
        username_errors = field_errors(errors, "username"),
        password_errors = field_errors(errors, "password"),
        password2_errors = field_errors(errors, "password2"),
    );

    layout("Register", Some(ctx), &content)
}

pub fn upload_page(ctx: &PageContext, files: &[String], max_size: usize) -> String {
    let mut content = format!(
        r#"<h1>Files</h1>
<form method="post" action="/upload" enctype="multipart/form-data">
{csrf}
<label>File <input type="file" name="file"></label>
<button type="submit">Upload</button>
<p class="hint">Maximum size: {max_mb} MB</p>
</form>
<ul>
"#,
        csrf = csrf_field(ctx),
        max_mb = max_size / 1024 / 1024,
    );

    for name in files {
        // Stored names are sanitized, so they are already URL-safe
        let _ = writeln!(
            content,
            r#"<li><a href="/uploads/{name}">{name}</a></li>"#,
            name = escape(name)
        );
    }
    content.push_str("</ul>\n");

    layout("Files", Some(ctx), &content)
}

pub fn not_found_page(ctx: Option<&PageContext>) -> String {
    layout(
        "Page not found",
        ctx,
        r#"<h1>404</h1>
<p>The page you are looking for does not exist.</p>
<p><a href="/">Back to home</a></p>
"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x" & 'y')</script>"#),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#x27;y&#x27;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_index_escapes_post_content() {
        let ctx = PageContext::default();
        let posts = vec![PostView {
            id: 1,
            title: "<b>bold</b>".to_string(),
            body: "a & b".to_string(),
            author: Some("alice".to_string()),
            timestamp: Utc::now(),
        }];

        let html = index_page(&ctx, &posts, "", "", &FormErrors::new());
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(html.contains("by alice"));
        // Anonymous visitors get no post form
        assert!(!html.contains(r#"name="title""#));
    }

    #[test]
    fn test_forms_carry_csrf_token() {
        let ctx = PageContext {
            username: Some("alice".to_string()),
            flashes: vec![Flash::error("Nope")],
            csrf_token: "tok123".to_string(),
        };

        let html = index_page(&ctx, &[], "", "", &FormErrors::new());
        assert!(html.contains(r#"name="csrf_token" value="tok123""#));
        assert!(html.contains(r#"<div class="flash flash-error">Nope</div>"#));
        assert!(html.contains("Log out"));

        let html = login_page(&ctx, "", Some("/upload"), &FormErrors::new());
        assert!(html.contains(r#"action="/auth/login?next=%2Fupload""#));
    }
}
