//! Cookie names, parsing and formatting for session state.

use axum::http::header;

/// Cookie name for the access credential (short-lived, 1 day).
pub const ACCESS_COOKIE_NAME: &str = "accessToken";

/// Cookie name for the refresh credential (long-lived, 5 days).
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Cookie name for the signed identity claims (5 days).
pub const CLAIMS_COOKIE_NAME: &str = "currentUser";

/// Access credential lifetime: 1 day.
pub const ACCESS_COOKIE_DURATION_SECS: u64 = 24 * 60 * 60;

/// Refresh credential and claims lifetime: 5 days.
pub const REFRESH_COOKIE_DURATION_SECS: u64 = 5 * 24 * 60 * 60;

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Format a Set-Cookie value for a session piece.
///
/// Always HttpOnly so injected page script can never read credentials;
/// SameSite=Lax so top-level navigations still carry the session.
pub fn set_cookie(name: &str, value: &str, max_age_secs: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        name, value, max_age_secs, secure
    )
}

/// Rebuild the request's Cookie header without the session cookies.
///
/// Unrelated cookies the browser sent alongside the session must stay
/// visible to downstream handlers.
pub fn strip_session_cookies(headers: &mut axum::http::HeaderMap) {
    let Some(cookie_header) = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    else {
        return;
    };

    let kept: Vec<&str> = cookie_header
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter(|part| {
            let name = part
                .split_once('=')
                .map(|(key, _)| key.trim())
                .unwrap_or(part);
            name != ACCESS_COOKIE_NAME && name != REFRESH_COOKIE_NAME && name != CLAIMS_COOKIE_NAME
        })
        .collect();

    match axum::http::HeaderValue::from_str(&kept.join("; ")) {
        Ok(value) if !kept.is_empty() => {
            headers.insert(header::COOKIE, value);
        }
        _ => {
            headers.remove(header::COOKIE);
        }
    }
}

/// Format a Set-Cookie value that expires a session piece.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{}",
        name, secure
    )
}
