//! Placeholder page handlers.
//!
//! Rendering lives in a separate front-end layer; these handlers exist so
//! the gate and identity accessor have routes to protect and are kept to
//! skeletal HTML.

use axum::{http::HeaderMap, response::Html};

use crate::identity::{CurrentUser, is_authenticated};

pub async fn home(headers: HeaderMap) -> Html<&'static str> {
    // Public either way; a live access credential only changes the copy.
    if is_authenticated(&headers) {
        Html("<h1>Welcome back</h1>")
    } else {
        Html("<h1>Welcome</h1>")
    }
}

pub async fn dashboard(CurrentUser(user): CurrentUser) -> Html<String> {
    // The gate only admits requests with a refresh credential, but claims
    // can still be absent when the store was partially cleared.
    let greeting = match user {
        Some(claims) => format!("<h1>Dashboard</h1><p>Signed in as {}</p>", claims.full_name),
        None => "<h1>Dashboard</h1><p>Signed in</p>".to_string(),
    };
    Html(greeting)
}

pub async fn login() -> Html<&'static str> {
    Html("<h1>Log in</h1>")
}

pub async fn register() -> Html<&'static str> {
    Html("<h1>Register</h1>")
}

pub async fn account_verification() -> Html<&'static str> {
    Html("<h1>Verify your account</h1>")
}

pub async fn forgot_password() -> Html<&'static str> {
    Html("<h1>Forgot password</h1>")
}

pub async fn generate_new_password() -> Html<&'static str> {
    Html("<h1>Choose a new password</h1>")
}
