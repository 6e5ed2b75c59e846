mod auth;
mod error;

pub use error::ApiError;

use axum::Router;

use crate::AppState;

/// Create the API router.
pub fn create_api_router(state: AppState) -> Router {
    Router::new().nest("/api/v1", auth::router(state))
}
