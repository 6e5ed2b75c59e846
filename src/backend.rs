//! HTTP client for the user backend.
//!
//! All authentication state originates here: the backend issues access and
//! refresh tokens plus the user record we sign into the claims cookie.
//! Responses use a JSON envelope of `{statusCode, data, message}`.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use url::Url;

use crate::session::cookie::REFRESH_COOKIE_NAME;

/// Bound on every backend request. A timeout is a transport failure, not a
/// rejection, so the caller leaves session state untouched.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    #[serde(rename = "isVerified", default)]
    pub is_verified: bool,
}

/// User record plus a fresh token pair. Returned by login, account
/// verification and token renewal.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    #[serde(flatten)]
    pub user: UserRecord,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// Standard backend response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "statusCode")]
    status_code: Option<u16>,
    data: Option<T>,
    #[serde(default)]
    message: String,
}

/// Request body for creating a new account.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "DOB", skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// Errors from backend calls.
#[derive(Debug)]
pub enum BackendError {
    /// Network failure or timeout. The session must not be cleared on this.
    Unavailable(String),
    /// The backend answered with a non-success status code.
    Rejected { status: u16, message: String },
    /// The backend answered 2xx but the body was not the expected shape.
    Malformed,
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Unavailable(e) => write!(f, "Backend unreachable: {}", e),
            BackendError::Rejected { status, message } => {
                write!(f, "Backend rejected request ({}): {}", status, message)
            }
            BackendError::Malformed => write!(f, "Backend response was malformed"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Typed client over the backend's user endpoints.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: Url,
}

impl BackendClient {
    /// Create a client for the given base URL with a bounded timeout.
    pub fn new(base: Url) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(path)
            .map_err(|e| BackendError::Unavailable(e.to_string()))
    }

    /// Send a request and unwrap the response envelope.
    ///
    /// A transport error maps to `Unavailable`; an HTTP or envelope status
    /// other than `expect` maps to `Rejected` with the backend's message.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        expect: u16,
    ) -> Result<T, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let http_status = response.status().as_u16();
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|_| BackendError::Malformed)?;

        let status = envelope.status_code.unwrap_or(http_status);
        if status != expect {
            return Err(BackendError::Rejected {
                status,
                message: envelope.message,
            });
        }

        envelope.data.ok_or(BackendError::Malformed)
    }

    /// Like `execute`, for endpoints whose success envelope carries no data.
    async fn execute_no_data(
        &self,
        request: reqwest::RequestBuilder,
        expect: u16,
    ) -> Result<(), BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let http_status = response.status().as_u16();
        let envelope: Envelope<serde_json::Value> = response
            .json()
            .await
            .map_err(|_| BackendError::Malformed)?;

        let status = envelope.status_code.unwrap_or(http_status);
        if status != expect {
            return Err(BackendError::Rejected {
                status,
                message: envelope.message,
            });
        }
        Ok(())
    }

    /// `POST user/log-in`
    pub async fn log_in(&self, email: &str, password: &str) -> Result<TokenGrant, BackendError> {
        let url = self.endpoint("user/log-in")?;
        let body = serde_json::json!({ "email": email, "password": password });
        self.execute(self.http.post(url).json(&body), 200).await
    }

    /// `POST user/new` - returns the new user's id for the verification step.
    pub async fn register(&self, user: &NewUser) -> Result<String, BackendError> {
        let url = self.endpoint("user/new")?;
        self.execute(self.http.post(url).json(user), 201).await
    }

    /// `POST user/me/verify/{id}`
    pub async fn verify(&self, user_id: &str, code: u32) -> Result<TokenGrant, BackendError> {
        let url = self.endpoint(&format!("user/me/verify/{}", user_id))?;
        let body = serde_json::json!({ "verifyCode": code });
        self.execute(self.http.post(url).json(&body), 200).await
    }

    /// `GET user/me/resend-otp/{id}` - the envelope carries only a message.
    pub async fn resend_otp(&self, user_id: &str) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("user/me/resend-otp/{}", user_id))?;
        self.execute_no_data(self.http.get(url), 200).await
    }

    /// `POST user/me/forgot-password` - returns the user id for the reset step.
    pub async fn forgot_password(&self, email: &str) -> Result<String, BackendError> {
        let url = self.endpoint("user/me/forgot-password")?;
        let body = serde_json::json!({ "email": email });
        self.execute(self.http.post(url).json(&body), 200).await
    }

    /// `POST user/me/reset-password/{id}`
    pub async fn reset_password(
        &self,
        user_id: &str,
        new_password: &str,
        reset_token: u32,
    ) -> Result<String, BackendError> {
        let url = self.endpoint(&format!("user/me/reset-password/{}", user_id))?;
        let body = serde_json::json!({
            "newPassword": new_password,
            "resetPasswordToken": reset_token,
        });
        self.execute(self.http.post(url).json(&body), 200).await
    }

    /// `POST user/me/change-password` - authorized by the access credential.
    pub async fn change_password(
        &self,
        access_token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<UserRecord, BackendError> {
        let url = self.endpoint("user/me/change-password")?;
        let body = serde_json::json!({
            "oldPassword": old_password,
            "newPassword": new_password,
        });
        let cookie = format!("accessToken={}", access_token);
        self.execute(
            self.http
                .post(url)
                .header(reqwest::header::COOKIE, cookie)
                .json(&body),
            200,
        )
        .await
    }

    /// `GET user/renew-token` - exchange the refresh credential for a new
    /// token pair. The refresh credential travels as a cookie.
    pub async fn renew_token(&self, refresh_token: &str) -> Result<TokenGrant, BackendError> {
        let url = self.endpoint("user/renew-token")?;
        let cookie = format!("{}={}", REFRESH_COOKIE_NAME, refresh_token);
        self.execute(
            self.http.get(url).header(reqwest::header::COOKIE, cookie),
            200,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_grant_parses_renew_response() {
        let body = serde_json::json!({
            "_id": "65a1f0c2d4e5f6a7b8c9d0e1",
            "fullName": "Alice Example",
            "email": "alice@example.com",
            "avatar": "https://cdn.example.com/a.png",
            "isAdmin": true,
            "isVerified": true,
            "accessToken": "acc-token",
            "refreshToken": "ref-token",
        });

        let grant: TokenGrant = serde_json::from_value(body).unwrap();
        assert_eq!(grant.user.id, "65a1f0c2d4e5f6a7b8c9d0e1");
        assert_eq!(grant.user.full_name, "Alice Example");
        assert!(grant.user.is_admin);
        assert_eq!(grant.access_token, "acc-token");
        assert_eq!(grant.refresh_token, "ref-token");
    }

    #[test]
    fn test_user_record_defaults_optional_fields() {
        let body = serde_json::json!({
            "_id": "u1",
            "fullName": "Bob",
            "email": "bob@example.com",
        });

        let user: UserRecord = serde_json::from_value(body).unwrap();
        assert_eq!(user.avatar, "");
        assert!(!user.is_admin);
        assert!(!user.is_verified);
    }

    #[test]
    fn test_new_user_omits_absent_optionals() {
        let user = NewUser {
            full_name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
            dob: None,
            gender: None,
        };

        let body = serde_json::to_value(&user).unwrap();
        assert!(body.get("DOB").is_none());
        assert!(body.get("gender").is_none());
        assert_eq!(body["fullName"], "Bob");
    }
}
