//! Shared helpers for integration tests.

#![allow(dead_code)]

use axum::{
    Json, Router,
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use edgegate::{ServerConfig, create_app};

pub const TEST_SECRET: &[u8] = b"test-secret-key-for-integration-tests";

pub const TEST_EMAIL: &str = "alice@example.com";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// The user record the stub backend hands out.
pub fn grant_json() -> serde_json::Value {
    json!({
        "_id": "65a1f0c2d4e5f6a7b8c9d0e1",
        "fullName": "Alice Example",
        "email": TEST_EMAIL,
        "avatar": "https://cdn.example.com/a.png",
        "isAdmin": false,
        "isVerified": true,
        "accessToken": "fresh-access-token",
        "refreshToken": "fresh-refresh-token",
    })
}

/// How the stub backend answers token renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewBehavior {
    Grant,
    Reject,
    /// A non-JSON error page, as an intermediary proxy would produce.
    GatewayErrorPage,
    /// A well-formed envelope reporting a 503 backend failure.
    ServerError,
}

async fn renew_grant() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "statusCode": 200, "data": grant_json(), "message": "ok" })),
    )
}

async fn renew_reject() -> impl IntoResponse {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "statusCode": 401, "data": null, "message": "Refresh token expired" })),
    )
}

async fn renew_gateway_error_page() -> impl IntoResponse {
    (
        StatusCode::BAD_GATEWAY,
        axum::response::Html("<html><body><h1>502 Bad Gateway</h1></body></html>"),
    )
}

async fn renew_server_error() -> impl IntoResponse {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "statusCode": 503, "data": null, "message": "Database unavailable" })),
    )
}

async fn log_in(Json(body): Json<serde_json::Value>) -> impl IntoResponse {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    if email == TEST_EMAIL && password == TEST_PASSWORD {
        (
            StatusCode::OK,
            Json(json!({ "statusCode": 200, "data": grant_json(), "message": "ok" })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "statusCode": 401, "data": null, "message": "Wrong email or password" })),
        )
    }
}

/// Spawn a stub backend on an ephemeral port and return its address.
pub async fn spawn_backend(renew: RenewBehavior) -> SocketAddr {
    let renew_route = match renew {
        RenewBehavior::Grant => get(renew_grant),
        RenewBehavior::Reject => get(renew_reject),
        RenewBehavior::GatewayErrorPage => get(renew_gateway_error_page),
        RenewBehavior::ServerError => get(renew_server_error),
    };

    let app = Router::new()
        .route("/user/renew-token", renew_route)
        .route("/user/log-in", post(log_in));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub backend");
    let addr = listener.local_addr().expect("Failed to get stub address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    addr
}

/// Build the application router pointed at the given backend address.
pub fn app_for_backend(addr: SocketAddr) -> Router {
    let config = ServerConfig {
        backend_base: format!("http://{}/", addr).parse().unwrap(),
        token_secret: TEST_SECRET.to_vec(),
        secure_cookies: false,
    };
    create_app(&config)
}

/// Build the application router pointed at a port nothing listens on.
pub fn app_with_unreachable_backend() -> Router {
    let config = ServerConfig {
        backend_base: "http://127.0.0.1:9/".parse().unwrap(),
        token_secret: TEST_SECRET.to_vec(),
        secure_cookies: false,
    };
    create_app(&config)
}

/// Like [`app_with_unreachable_backend`], but with Secure cookies as an
/// https origin would configure them.
pub fn app_with_secure_cookies() -> Router {
    let config = ServerConfig {
        backend_base: "http://127.0.0.1:9/".parse().unwrap(),
        token_secret: TEST_SECRET.to_vec(),
        secure_cookies: true,
    };
    create_app(&config)
}

/// Collect the Set-Cookie values of a response.
pub fn set_cookies(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Find a cookie by name among Set-Cookie values and return its value.
pub fn cookie_value<'a>(cookies: &'a [String], name: &str) -> Option<&'a str> {
    cookies.iter().find_map(|cookie| {
        let (pair, _attrs) = cookie.split_once(';')?;
        let (key, value) = pair.split_once('=')?;
        (key == name).then_some(value)
    })
}

/// Read a response body to bytes.
pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body was not UTF-8")
}
