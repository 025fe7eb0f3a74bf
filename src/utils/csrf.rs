//! Double-submit CSRF tokens: the cookie value must come back in the form.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::{Rng, distributions::Alphanumeric};

pub const CSRF_COOKIE: &str = "csrf_token";
const TOKEN_LEN: usize = 32;

/// Returns the jar's token, issuing a fresh one when absent
pub fn ensure_token(jar: CookieJar) -> (CookieJar, String) {
    if let Some(cookie) = jar.get(CSRF_COOKIE) {
        if cookie.value().len() == TOKEN_LEN {
            let token = cookie.value().to_string();
            return (jar, token);
        }
    }

    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect();

    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (jar.add(cookie), token)
}

pub fn verify_token(jar: &CookieJar, submitted: &str) -> bool {
    let Some(cookie) = jar.get(CSRF_COOKIE) else {
        return false;
    };
    let expected = cookie.value().as_bytes();
    let submitted = submitted.as_bytes();

    expected.len() == TOKEN_LEN
        && expected.len() == submitted.len()
        && expected
            .iter()
            .zip(submitted)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
