//! One-shot user-facing messages carried in a cookie until the next page render.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashCategory {
    Info,
    Error,
}

impl FlashCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashCategory::Info => "info",
            FlashCategory::Error => "error",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "error" => FlashCategory::Error,
            _ => FlashCategory::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

impl Flash {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Error,
            message: message.into(),
        }
    }
}

pub fn encode_flashes(flashes: &[Flash]) -> String {
    let raw = flashes
        .iter()
        .map(|f| format!("{}:{}", f.category.as_str(), f.message.replace('\n', " ")))
        .collect::<Vec<_>>()
        .join("\n");
    utf8_percent_encode(&raw, NON_ALPHANUMERIC).to_string()
}

pub fn decode_flashes(value: &str) -> Vec<Flash> {
    let raw = percent_decode_str(value).decode_utf8_lossy();
    raw.lines()
        .filter_map(|line| {
            let (category, message) = line.split_once(':')?;
            Some(Flash {
                category: FlashCategory::parse(category),
                message: message.to_string(),
            })
        })
        .collect()
}

/// Queues a message for the next rendered page
pub fn push_flash(jar: CookieJar, flash: Flash) -> CookieJar {
    let mut flashes = jar
        .get(FLASH_COOKIE)
        .map(|c| decode_flashes(c.value()))
        .unwrap_or_default();
    flashes.push(flash);

    let cookie = Cookie::build((FLASH_COOKIE, encode_flashes(&flashes)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    jar.add(cookie)
}

/// Returns pending messages and clears them from the jar
pub fn take_flashes(jar: CookieJar) -> (CookieJar, Vec<Flash>) {
    let flashes = match jar.get(FLASH_COOKIE) {
        Some(cookie) => decode_flashes(cookie.value()),
        None => return (jar, Vec::new()),
    };
    let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
    (jar, flashes)
}
