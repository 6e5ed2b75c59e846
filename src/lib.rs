pub mod api;
pub mod backend;
pub mod cli;
pub mod gate;
pub mod identity;
pub mod jwt;
pub mod pages;
pub mod session;

use axum::{Router, middleware, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use url::Url;

use backend::BackendClient;
use jwt::TokenCodec;
use session::{HasSessionState, RefreshCoordinator, refresh_session};

pub struct ServerConfig {
    /// Base URL of the backend user API
    pub backend_base: Url,
    /// Secret for signing identity-claims tokens
    pub token_secret: Vec<u8>,
    /// Whether to set Secure flag on cookies (true in production with HTTPS)
    pub secure_cookies: bool,
}

/// Process-wide state, immutable after startup, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub backend: BackendClient,
    pub refresher: RefreshCoordinator,
    pub secure_cookies: bool,
}

impl HasSessionState for AppState {
    fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let codec = Arc::new(TokenCodec::new(&config.token_secret));
    let backend = BackendClient::new(config.backend_base.clone())
        .expect("Failed to initialize backend client");
    let refresher = RefreshCoordinator::new(codec.clone(), backend.clone());

    let state = AppState {
        codec,
        backend,
        refresher,
        secure_cookies: config.secure_cookies,
    };

    // API routes get session refresh (so an expired access credential
    // still works) but not the page gate: they answer with JSON errors,
    // never redirects.
    let api_routes = api::create_api_router(state.clone()).layer(
        middleware::from_fn_with_state(state.clone(), refresh_session),
    );

    // Page routes run the gate first, then session refresh for admitted
    // requests. Layers apply bottom-up, so the gate is added last.
    let page_routes = Router::new()
        .route("/", get(pages::home))
        .route("/dashboard", get(pages::dashboard))
        .route("/auth/login", get(pages::login))
        .route("/auth/register", get(pages::register))
        .route(
            "/auth/account-verification",
            get(pages::account_verification),
        )
        .route("/auth/forgot-password", get(pages::forgot_password))
        .route(
            "/auth/generate-new-password",
            get(pages::generate_new_password),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            refresh_session,
        ))
        .layer(middleware::from_fn(gate::edge_gate))
        .with_state(state);

    Router::new().merge(api_routes).merge(page_routes)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    axum::serve(listener, app).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}
