//! Access to the authenticated identity for request handlers.
//!
//! Claims are decoded at most once per request: the first extractor caches
//! the result in request extensions and later extractors reuse it. Decode
//! failure is indistinguishable from an absent session here; it never
//! surfaces as an error response.

use std::convert::Infallible;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::jwt::{IdentityClaims, TokenCodec};
use crate::session::{
    ACCESS_COOKIE_NAME, CLAIMS_COOKIE_NAME, HasSessionState, REFRESH_COOKIE_NAME,
    RefreshedSession, get_cookie,
};

/// Claims decoded earlier in this request, cached in extensions.
#[derive(Debug, Clone)]
struct CachedClaims(Option<IdentityClaims>);

/// Extractor for the current identity: decoded claims, or `None` when the
/// claims cookie is absent or does not verify. Never rejects.
pub struct CurrentUser(pub Option<IdentityClaims>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: HasSessionState + Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(cached) = parts.extensions.get::<CachedClaims>() {
            return Ok(CurrentUser(cached.0.clone()));
        }

        let claims = decode_claims(parts, state.codec());
        parts.extensions.insert(CachedClaims(claims.clone()));
        Ok(CurrentUser(claims))
    }
}

/// Decode the claims token, preferring one refreshed earlier in this
/// request over the (possibly stale) request cookie.
fn decode_claims(parts: &Parts, codec: &TokenCodec) -> Option<IdentityClaims> {
    let token = parts
        .extensions
        .get::<RefreshedSession>()
        .map(|s| s.0.claims_token.clone())
        .or_else(|| get_cookie(&parts.headers, CLAIMS_COOKIE_NAME).map(str::to_string))?;

    codec.decode(&token).ok()
}

/// Cheap authentication check: access-credential presence, no decode.
pub fn is_authenticated(headers: &HeaderMap) -> bool {
    get_cookie(headers, ACCESS_COOKIE_NAME).is_some()
}

/// Composite authorization signal for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    #[serde(rename = "isLoggedIn")]
    pub is_logged_in: bool,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

/// Compose refresh-credential presence with the claims' admin flag.
/// Unreadable or absent claims default the admin flag to false.
pub fn authorize(headers: &HeaderMap, codec: &TokenCodec) -> AuthStatus {
    let is_logged_in = get_cookie(headers, REFRESH_COOKIE_NAME).is_some();
    let is_admin = get_cookie(headers, CLAIMS_COOKIE_NAME)
        .and_then(|token| codec.decode(token).ok())
        .map(|claims| claims.is_admin)
        .unwrap_or(false);

    AuthStatus {
        is_logged_in,
        is_admin,
    }
}

/// Extractor for the access credential, for handlers that forward it to
/// the backend. Prefers a same-request refreshed credential; rejects with
/// a JSON 401 when none is available.
pub struct AccessToken(pub String);

/// Rejection for [`AccessToken`]: the request carries no usable session.
#[derive(Debug)]
pub struct NotAuthenticated;

impl IntoResponse for NotAuthenticated {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Not authenticated",
            }),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for AccessToken
where
    S: Send + Sync,
{
    type Rejection = NotAuthenticated;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .extensions
            .get::<RefreshedSession>()
            .map(|s| s.0.access_token.clone())
            .or_else(|| get_cookie(&parts.headers, ACCESS_COOKIE_NAME).map(str::to_string))
            .ok_or(NotAuthenticated)?;

        Ok(AccessToken(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    use crate::backend::UserRecord;

    fn codec() -> TokenCodec {
        TokenCodec::new(b"test-secret-key-for-testing")
    }

    fn admin_claims_token(codec: &TokenCodec) -> String {
        codec
            .encode(&UserRecord {
                id: "u1".to_string(),
                full_name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                avatar: String::new(),
                is_admin: true,
                is_verified: true,
            })
            .unwrap()
    }

    #[test]
    fn test_is_authenticated_checks_access_cookie_only() {
        let mut headers = HeaderMap::new();
        assert!(!is_authenticated(&headers));

        headers.insert(COOKIE, "refreshToken=ref".parse().unwrap());
        assert!(!is_authenticated(&headers));

        headers.insert(COOKIE, "accessToken=acc".parse().unwrap());
        assert!(is_authenticated(&headers));
    }

    #[test]
    fn test_authorize_composes_refresh_and_admin_flag() {
        let codec = codec();
        let token = admin_claims_token(&codec);

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("refreshToken=ref; currentUser={}", token)
                .parse()
                .unwrap(),
        );

        let status = authorize(&headers, &codec);
        assert!(status.is_logged_in);
        assert!(status.is_admin);
    }

    #[test]
    fn test_authorize_defaults_admin_false_on_bad_claims() {
        let codec = codec();

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            "refreshToken=ref; currentUser=tampered".parse().unwrap(),
        );

        let status = authorize(&headers, &codec);
        assert!(status.is_logged_in);
        assert!(!status.is_admin);
    }

    #[test]
    fn test_authorize_logged_out_without_refresh_credential() {
        let codec = codec();
        let token = admin_claims_token(&codec);

        // Claims alone do not make a session.
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, format!("currentUser={}", token).parse().unwrap());

        let status = authorize(&headers, &codec);
        assert!(!status.is_logged_in);
        assert!(status.is_admin);
    }
}
