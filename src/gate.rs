//! Request gating by route class.
//!
//! Runs before any page handler: classifies the requested path and either
//! passes the request through or redirects based on a cheap logged-in
//! signal. No network calls and no cookie writes happen here; renewing an
//! expired session is the refresh middleware's concern.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::session::{REFRESH_COOKIE_NAME, get_cookie};

/// Routes that need no session.
pub const PUBLIC_ROUTES: &[&str] = &["/"];

/// Routes for authentication flows; a logged-in user is redirected away.
pub const AUTH_ROUTES: &[&str] = &[
    "/auth/login",
    "/auth/register",
    "/auth/account-verification",
    "/auth/forgot-password",
    "/auth/generate-new-password",
];

/// Where a logged-in user lands after authenticating.
pub const DEFAULT_LOGIN_REDIRECT: &str = "/";

/// Where a logged-out user is sent to authenticate.
pub const LOGIN_PAGE: &str = "/auth/login";

/// Classification of the URL space. Total: any path not explicitly public
/// or auth-only is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    AuthOnly,
    Protected,
}

pub fn classify(path: &str) -> RouteClass {
    if PUBLIC_ROUTES.contains(&path) {
        RouteClass::Public
    } else if AUTH_ROUTES.contains(&path) {
        RouteClass::AuthOnly
    } else {
        RouteClass::Protected
    }
}

/// What the gate does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    PassThrough,
    Redirect(&'static str),
}

pub fn decide(class: RouteClass, logged_in: bool) -> GateDecision {
    match class {
        RouteClass::AuthOnly if logged_in => GateDecision::Redirect(DEFAULT_LOGIN_REDIRECT),
        RouteClass::AuthOnly => GateDecision::PassThrough,
        RouteClass::Public => GateDecision::PassThrough,
        RouteClass::Protected if logged_in => GateDecision::PassThrough,
        RouteClass::Protected => GateDecision::Redirect(LOGIN_PAGE),
    }
}

/// Middleware applying the gate to every page request.
///
/// The logged-in signal is refresh-credential presence only: an expired
/// access credential must not bounce the user to login when the refresh
/// middleware could still renew it.
pub async fn edge_gate(request: Request, next: Next) -> Response {
    let logged_in = get_cookie(request.headers(), REFRESH_COOKIE_NAME).is_some();

    match decide(classify(request.uri().path()), logged_in) {
        GateDecision::PassThrough => next.run(request).await,
        GateDecision::Redirect(to) => Redirect::temporary(to).into_response(),
    }
}
