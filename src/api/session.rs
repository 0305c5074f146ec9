//! Cookie handling: the anonymous shopping session and the admin token.

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "sid";
const SESSION_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// Opaque per-browser session key, inserted as a request extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionId(pub String);

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn set_cookie(name: &str, value: &str, max_age_secs: u64, same_site: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("{name}={value}; Path=/; HttpOnly; SameSite={same_site}; Max-Age={max_age_secs}")).ok()
}

/// Reuses a well-formed `sid` cookie or issues a fresh one.
pub async fn session_middleware(mut request: Request, next: Next) -> Response {
    let existing = read_cookie(request.headers(), SESSION_COOKIE).filter(|v| Uuid::parse_str(v).is_ok());
    let issued = existing.is_none();
    let session_id = existing.unwrap_or_else(|| Uuid::new_v4().to_string());
    request.extensions_mut().insert(SessionId(session_id.clone()));

    let mut response = next.run(request).await;
    if issued {
        if let Some(cookie) = set_cookie(SESSION_COOKIE, &session_id, SESSION_MAX_AGE_SECS, "Lax") {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
    }
    response
}
