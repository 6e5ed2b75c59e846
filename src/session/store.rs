//! Reading and writing session state as cookies.
//!
//! A session is three cookies set and cleared as a set: the access
//! credential, the refresh credential and the signed claims. A partial set
//! is treated as no session by the refresh logic, never as an error.

use axum::http::{HeaderMap, HeaderValue, header::SET_COOKIE};

use super::cookie::{
    ACCESS_COOKIE_DURATION_SECS, ACCESS_COOKIE_NAME, CLAIMS_COOKIE_NAME,
    REFRESH_COOKIE_DURATION_SECS, REFRESH_COOKIE_NAME, clear_cookie, get_cookie, set_cookie,
};

/// A complete session as issued after login, verification or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub claims_token: String,
}

/// Whatever subset of session cookies a request carried.
#[derive(Debug, Clone, Default)]
pub struct SessionParts {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub claims_token: Option<String>,
}

impl SessionParts {
    /// Read the session cookies off a request. Absent pieces are `None`.
    pub fn read(headers: &HeaderMap) -> Self {
        Self {
            access_token: get_cookie(headers, ACCESS_COOKIE_NAME).map(str::to_string),
            refresh_token: get_cookie(headers, REFRESH_COOKIE_NAME).map(str::to_string),
            claims_token: get_cookie(headers, CLAIMS_COOKIE_NAME).map(str::to_string),
        }
    }
}

/// Formats the Set-Cookie headers that install or remove a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionStore {
    secure: bool,
}

impl SessionStore {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Set-Cookie values installing a session: access for 1 day, refresh
    /// and claims for 5 days.
    pub fn write(&self, session: &Session) -> [String; 3] {
        [
            set_cookie(
                ACCESS_COOKIE_NAME,
                &session.access_token,
                ACCESS_COOKIE_DURATION_SECS,
                self.secure,
            ),
            set_cookie(
                REFRESH_COOKIE_NAME,
                &session.refresh_token,
                REFRESH_COOKIE_DURATION_SECS,
                self.secure,
            ),
            set_cookie(
                CLAIMS_COOKIE_NAME,
                &session.claims_token,
                REFRESH_COOKIE_DURATION_SECS,
                self.secure,
            ),
        ]
    }

    /// Set-Cookie values removing all three pieces. Expires every piece
    /// whether or not it was present, so clearing twice is safe.
    pub fn clear(&self) -> [String; 3] {
        [
            clear_cookie(ACCESS_COOKIE_NAME, self.secure),
            clear_cookie(REFRESH_COOKIE_NAME, self.secure),
            clear_cookie(CLAIMS_COOKIE_NAME, self.secure),
        ]
    }

    /// Append cookie values to a response's headers.
    pub fn apply(headers: &mut HeaderMap, cookies: &[String; 3]) {
        for cookie in cookies {
            if let Ok(value) = HeaderValue::from_str(cookie) {
                headers.append(SET_COOKIE, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    fn session() -> Session {
        Session {
            access_token: "acc".to_string(),
            refresh_token: "ref".to_string(),
            claims_token: "claims".to_string(),
        }
    }

    #[test]
    fn test_write_sets_three_cookies_with_expiries() {
        let cookies = SessionStore::new(true).write(&session());

        assert!(cookies[0].starts_with("accessToken=acc;"));
        assert!(cookies[0].contains("Max-Age=86400"));
        assert!(cookies[1].starts_with("refreshToken=ref;"));
        assert!(cookies[1].contains("Max-Age=432000"));
        assert!(cookies[2].starts_with("currentUser=claims;"));
        assert!(cookies[2].contains("Max-Age=432000"));

        for cookie in &cookies {
            assert!(cookie.contains("HttpOnly"));
            assert!(cookie.contains("SameSite=Lax"));
            assert!(cookie.contains("Secure"));
        }
    }

    #[test]
    fn test_clear_expires_all_pieces() {
        let cookies = SessionStore::new(false).clear();

        for (cookie, name) in cookies.iter().zip(["accessToken", "refreshToken", "currentUser"]) {
            assert!(cookie.starts_with(&format!("{}=;", name)));
            assert!(cookie.contains("Max-Age=0"));
        }
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = SessionStore::new(false);
        assert_eq!(store.clear(), store.clear());
    }

    #[test]
    fn test_read_returns_present_subset() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            "refreshToken=ref; currentUser=claims".parse().unwrap(),
        );

        let parts = SessionParts::read(&headers);
        assert_eq!(parts.access_token, None);
        assert_eq!(parts.refresh_token.as_deref(), Some("ref"));
        assert_eq!(parts.claims_token.as_deref(), Some("claims"));
    }

    #[test]
    fn test_read_empty_request() {
        let parts = SessionParts::read(&HeaderMap::new());
        assert!(parts.access_token.is_none());
        assert!(parts.refresh_token.is_none());
        assert!(parts.claims_token.is_none());
    }

    #[test]
    fn test_apply_appends_set_cookie_headers() {
        let mut headers = HeaderMap::new();
        SessionStore::apply(&mut headers, &SessionStore::new(false).write(&session()));

        let values: Vec<_> = headers.get_all(SET_COOKIE).iter().collect();
        assert_eq!(values.len(), 3);
    }
}
