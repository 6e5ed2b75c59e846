//! Authentication API endpoints.
//!
//! - POST `/login` - Exchange credentials for a session
//! - POST `/register` - Create an account pending verification
//! - POST `/verify/{id}` - Confirm the emailed OTP, installs a session
//! - GET `/resend-otp/{id}` - Re-send the verification OTP
//! - POST `/forgot-password` - Start a password reset
//! - POST `/reset-password/{id}` - Complete a password reset
//! - POST `/change-password` - Change password with a live session
//! - GET `/google` - OAuth callback, installs a session and redirects
//! - GET `/logout` - Clear the session and redirect to login
//! - GET `/me` - Session status (logged in, admin) for page chrome
//!
//! Each endpoint validates its payload, proxies to the backend, and
//! manages session cookies on success. The backend's rejection messages
//! pass through to the caller.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{HeaderMap, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Redirect},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, validate_email, validate_password};
use crate::AppState;
use crate::backend::{NewUser, TokenGrant, UserRecord};
use crate::gate::{DEFAULT_LOGIN_REDIRECT, LOGIN_PAGE};
use crate::identity::{AccessToken, AuthStatus, authorize};
use crate::session::{HasSessionState, Session, SessionStore};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/verify/{id}", post(verify))
        .route("/resend-otp/{id}", get(resend_otp))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/{id}", post(reset_password))
        .route("/change-password", post(change_password))
        .route("/google", get(google_callback))
        .route("/logout", get(logout))
        .route("/me", get(session_status))
        .with_state(state)
}

/// Sign the claims and produce the three Set-Cookie values installing the
/// session from a backend token grant.
fn install_session(
    state: &AppState,
    grant: &TokenGrant,
) -> Result<AppendHeaders<[(axum::http::HeaderName, String); 3]>, ApiError> {
    let claims_token = state.codec().encode(&grant.user).map_err(|e| {
        tracing::error!(error = %e, "Failed to sign identity claims");
        ApiError::internal("Failed to establish session")
    })?;

    let [access, refresh, claims] = SessionStore::new(state.secure_cookies()).write(&Session {
        access_token: grant.access_token.clone(),
        refresh_token: grant.refresh_token.clone(),
        claims_token,
    });

    Ok(AppendHeaders([
        (SET_COOKIE, access),
        (SET_COOKIE, refresh),
        (SET_COOKIE, claims),
    ]))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    success: bool,
    message: &'static str,
    #[serde(rename = "isAdmin")]
    is_admin: bool,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_email(&body.email)?;
    validate_password(&body.password)?;

    let grant = state
        .backend
        .log_in(&body.email, &body.password)
        .await
        .map_err(|e| ApiError::from_backend("login", e))?;

    let cookies = install_session(&state, &grant)?;

    Ok((
        cookies,
        Json(LoginResponse {
            success: true,
            message: "Logged in successfully",
            is_admin: grant.user.is_admin,
        }),
    ))
}

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(rename = "fullName")]
    full_name: String,
    email: String,
    password: String,
    #[serde(rename = "DOB", default)]
    dob: Option<String>,
    #[serde(default)]
    gender: Option<String>,
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.full_name.trim().is_empty() {
        return Err(ApiError::bad_request("Full name cannot be empty"));
    }
    validate_email(&body.email)?;
    validate_password(&body.password)?;

    let user_id = state
        .backend
        .register(&NewUser {
            full_name: body.full_name,
            email: body.email,
            password: body.password,
            dob: body.dob,
            gender: body.gender,
        })
        .await
        .map_err(|e| ApiError::from_backend("register", e))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "userId": user_id,
    })))
}

#[derive(Deserialize)]
struct VerifyRequest {
    #[serde(rename = "verifyCode")]
    verify_code: u32,
}

/// Account verification doubles as first login: the backend returns a full
/// token grant, so the session is installed right away.
async fn verify(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let grant = state
        .backend
        .verify(&id, body.verify_code)
        .await
        .map_err(|e| ApiError::from_backend("verify", e))?;

    let cookies = install_session(&state, &grant)?;

    Ok((cookies, Json(serde_json::json!({ "success": true }))))
}

async fn resend_otp(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .backend
        .resend_otp(&id)
        .await
        .map_err(|e| ApiError::from_backend("resend-otp", e))?;

    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_email(&body.email)?;

    let user_id = state
        .backend
        .forgot_password(&body.email)
        .await
        .map_err(|e| ApiError::from_backend("forgot-password", e))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "userId": user_id,
    })))
}

#[derive(Deserialize)]
struct ResetPasswordRequest {
    #[serde(rename = "newPassword")]
    new_password: String,
    #[serde(rename = "resetPasswordToken")]
    reset_password_token: u32,
}

async fn reset_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_password(&body.new_password)?;

    state
        .backend
        .reset_password(&id, &body.new_password, body.reset_password_token)
        .await
        .map_err(|e| ApiError::from_backend("reset-password", e))?;

    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Deserialize)]
struct ChangePasswordRequest {
    #[serde(rename = "oldPassword")]
    old_password: String,
    #[serde(rename = "newPassword")]
    new_password: String,
}

async fn change_password(
    State(state): State<AppState>,
    AccessToken(access_token): AccessToken,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_password(&body.new_password)?;

    state
        .backend
        .change_password(&access_token, &body.old_password, &body.new_password)
        .await
        .map_err(|e| ApiError::from_backend("change-password", e))?;

    Ok(Json(serde_json::json!({ "success": true })))
}

/// OAuth callback parameters. The provider flow terminates at the backend,
/// which redirects here with the user record and token pair.
#[derive(Deserialize)]
struct GoogleCallback {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "fullName")]
    full_name: String,
    email: String,
    #[serde(default)]
    avatar: String,
    #[serde(rename = "isAdmin", default)]
    is_admin: bool,
    #[serde(rename = "isVerified", default)]
    is_verified: bool,
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
}

async fn google_callback(
    State(state): State<AppState>,
    query: Result<Query<GoogleCallback>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query.map_err(|_| ApiError::bad_request("Invalid query parameters"))?;
    validate_email(&params.email)?;

    let grant = TokenGrant {
        user: UserRecord {
            id: params.id,
            full_name: params.full_name,
            email: params.email,
            avatar: params.avatar,
            is_admin: params.is_admin,
            is_verified: params.is_verified,
        },
        access_token: params.access_token,
        refresh_token: params.refresh_token,
    };

    let cookies = install_session(&state, &grant)?;

    Ok((cookies, Redirect::temporary(DEFAULT_LOGIN_REDIRECT)))
}

/// Who the caller is, as far as the cookies say. Runs behind the refresh
/// middleware, so an expired access credential has already been renewed
/// by the time the headers are inspected.
async fn session_status(State(state): State<AppState>, headers: HeaderMap) -> Json<AuthStatus> {
    Json(authorize(&headers, state.codec()))
}

/// Clear all three session cookies and send the user back to login.
/// Clearing pieces that are already absent is fine, so logout is safe to
/// hit twice.
async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let [access, refresh, claims] = SessionStore::new(state.secure_cookies()).clear();

    (
        AppendHeaders([
            (SET_COOKIE, access),
            (SET_COOKIE, refresh),
            (SET_COOKIE, claims),
        ]),
        Redirect::temporary(LOGIN_PAGE),
    )
}
