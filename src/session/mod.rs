//! Cookie-held session state and its per-request lifecycle.
//!
//! A session is three client-held pieces: a short-lived access credential,
//! a long-lived refresh credential and a signed identity-claims token. They
//! are installed and removed as a set; the refresh middleware renews the
//! access credential against the backend when it has expired.

pub mod cookie;
pub mod refresh;
pub mod store;

pub use cookie::{ACCESS_COOKIE_NAME, CLAIMS_COOKIE_NAME, REFRESH_COOKIE_NAME, get_cookie};
pub use refresh::{RefreshCoordinator, RefreshOutcome, RefreshedSession, refresh_session};
pub use store::{Session, SessionParts, SessionStore};

use crate::jwt::TokenCodec;

/// Trait for state types that provide session handling to extractors.
pub trait HasSessionState {
    fn codec(&self) -> &TokenCodec;
    fn secure_cookies(&self) -> bool;
}
