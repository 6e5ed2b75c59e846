//! Per-request session refresh.
//!
//! Decides whether the session a request carried is usable as-is, absent,
//! or due for renewal, and performs the renewal against the backend. The
//! refresh call is the only suspension point and its failure never
//! propagates: the requester degrades to logged-out instead.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::HasSessionState;
use super::cookie::strip_session_cookies;
use super::store::{Session, SessionParts, SessionStore};
use crate::backend::{BackendClient, BackendError};
use crate::jwt::TokenCodec;

/// Outcome of examining one request's session state.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// No refresh credential: logged out, nothing to do.
    NoSession,
    /// Access credential still present: pass through unchanged.
    ValidAccess,
    /// Access credential expired and the backend issued a new session.
    Refreshed(Session),
    /// The backend rejected the refresh credential: clear the session.
    RefreshRejected,
    /// The backend was unreachable: treat as logged out for this request
    /// but leave the cookies alone so a later request can retry.
    BackendUnavailable,
}

/// Exchanges an expired access credential for a fresh session.
#[derive(Clone)]
pub struct RefreshCoordinator {
    codec: Arc<TokenCodec>,
    backend: BackendClient,
}

impl RefreshCoordinator {
    pub fn new(codec: Arc<TokenCodec>, backend: BackendClient) -> Self {
        Self { codec, backend }
    }

    /// Run the per-request state machine over the cookies a request carried.
    ///
    /// The access credential is not signature-checked here: it is an opaque
    /// bearer string the backend validates itself, and presence is the
    /// cheap signal that no renewal is due.
    pub async fn run(&self, parts: &SessionParts) -> RefreshOutcome {
        let Some(refresh_token) = parts.refresh_token.as_deref() else {
            return RefreshOutcome::NoSession;
        };

        if parts.access_token.is_some() {
            return RefreshOutcome::ValidAccess;
        }

        match self.backend.renew_token(refresh_token).await {
            Ok(grant) => match self.codec.encode(&grant.user) {
                Ok(claims_token) => {
                    debug!(user = %grant.user.id, "Session refreshed");
                    RefreshOutcome::Refreshed(Session {
                        access_token: grant.access_token,
                        refresh_token: grant.refresh_token,
                        claims_token,
                    })
                }
                Err(e) => {
                    warn!(error = %e, "Failed to sign claims for refreshed session");
                    RefreshOutcome::RefreshRejected
                }
            },
            Err(BackendError::Unavailable(e)) => {
                warn!(error = %e, "Backend unreachable during session refresh");
                RefreshOutcome::BackendUnavailable
            }
            // A body that is not the envelope (an intermediary's error
            // page, a truncated response) is an infrastructure fault, not
            // a verdict on the refresh credential. Same for 5xx answers.
            Err(BackendError::Malformed) => {
                warn!("Backend sent an unusable renewal response");
                RefreshOutcome::BackendUnavailable
            }
            Err(BackendError::Rejected { status, message }) if status >= 500 => {
                warn!(status, message = %message, "Backend failed during session refresh");
                RefreshOutcome::BackendUnavailable
            }
            Err(e) => {
                debug!(error = %e, "Refresh credential rejected");
                RefreshOutcome::RefreshRejected
            }
        }
    }
}

/// Session refreshed earlier in the current request. Inserted into request
/// extensions so downstream handlers see the new credentials immediately,
/// before the client has received the cookies.
#[derive(Debug, Clone)]
pub struct RefreshedSession(pub Session);

/// Middleware that renews the session when the access credential expired.
///
/// On renewal, the new cookies are attached to the outgoing response and
/// the fresh session is made visible to same-request handlers. On a
/// confirmed rejection the cookies are cleared; on a mere transport
/// failure they are left untouched.
pub async fn refresh_session(
    State(state): State<crate::AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let parts = SessionParts::read(request.headers());
    let store = SessionStore::new(state.secure_cookies());

    match state.refresher.run(&parts).await {
        RefreshOutcome::Refreshed(session) => {
            request
                .extensions_mut()
                .insert(RefreshedSession(session.clone()));
            let mut response = next.run(request).await;
            SessionStore::apply(response.headers_mut(), &store.write(&session));
            response
        }
        RefreshOutcome::RefreshRejected => {
            // Drop the stale session cookies from the request so downstream
            // sees no session at all rather than unusable fragments. Other
            // cookies the browser sent stay.
            strip_session_cookies(request.headers_mut());
            let mut response = next.run(request).await;
            SessionStore::apply(response.headers_mut(), &store.clear());
            response
        }
        RefreshOutcome::NoSession
        | RefreshOutcome::ValidAccess
        | RefreshOutcome::BackendUnavailable => next.run(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> RefreshCoordinator {
        // The backend is never reached in these tests.
        let backend =
            BackendClient::new("http://127.0.0.1:9/api/v1/".parse().unwrap()).unwrap();
        RefreshCoordinator::new(Arc::new(TokenCodec::new(b"test-secret-key")), backend)
    }

    #[tokio::test]
    async fn test_no_refresh_credential_is_no_session() {
        let parts = SessionParts {
            access_token: Some("acc".to_string()),
            refresh_token: None,
            claims_token: Some("claims".to_string()),
        };

        assert!(matches!(
            coordinator().run(&parts).await,
            RefreshOutcome::NoSession
        ));
    }

    #[tokio::test]
    async fn test_present_access_credential_passes_through() {
        let parts = SessionParts {
            access_token: Some("acc".to_string()),
            refresh_token: Some("ref".to_string()),
            claims_token: Some("claims".to_string()),
        };

        // No network call happens: the unreachable backend would error.
        assert!(matches!(
            coordinator().run(&parts).await,
            RefreshOutcome::ValidAccess
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend_leaves_session() {
        let parts = SessionParts {
            access_token: None,
            refresh_token: Some("ref".to_string()),
            claims_token: None,
        };

        // Port 9 (discard) refuses connections, which is a transport
        // failure, not a rejection.
        assert!(matches!(
            coordinator().run(&parts).await,
            RefreshOutcome::BackendUnavailable
        ));
    }
}
