//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use clap::Parser;
use tracing::error;
use url::Url;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "Edgegate", about = "Edge session gateway for the user backend")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    pub port: u16,

    /// Base URL of the backend user API
    #[arg(long, env = "BACKEND_URI", default_value = "http://localhost:8000/api/v1/")]
    pub backend_uri: String,

    /// Public origin this gateway is served from (e.g., "https://app.example.com").
    /// Cookies get the Secure flag when this is HTTPS
    #[arg(long, default_value = "http://localhost:3000")]
    pub origin: String,

    /// Path to file containing the claims-signing secret. Prefer using the
    /// JWT_TOKEN_KEY env var instead
    #[arg(long)]
    pub token_secret_file: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the claims-signing secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_token_secret(token_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_TOKEN_KEY") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_TOKEN_KEY") };
        secret
    } else if let Some(path) = token_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read token secret file");
                return None;
            }
        }
    } else {
        error!(
            "Claims-signing secret is required. Set JWT_TOKEN_KEY environment variable (recommended) or use --token-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_TOKEN_SECRET_LENGTH {
        error!(
            "Token secret is shorter than {} characters. Use a longer secret",
            MIN_TOKEN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Parse and validate the backend base URL. A trailing slash is required
/// for relative endpoint paths to join correctly.
pub fn validate_backend_uri(backend_uri: &str) -> Option<Url> {
    let normalized = if backend_uri.ends_with('/') {
        backend_uri.to_string()
    } else {
        format!("{}/", backend_uri)
    };

    match Url::parse(&normalized) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Some(url),
        Ok(url) => {
            error!(uri = %url, "Backend URI must be http or https");
            None
        }
        Err(e) => {
            error!(uri = %backend_uri, error = %e, "Invalid backend URI");
            None
        }
    }
}

/// Parse and validate the public origin URL.
/// Returns None and logs an error if validation fails.
pub fn validate_origin(origin: &str) -> Option<Url> {
    let url = match Url::parse(origin) {
        Ok(url) => url,
        Err(e) => {
            error!(origin = %origin, error = %e, "Invalid origin URL");
            return None;
        }
    };

    let is_https = url.scheme() == "https";
    let is_localhost = url.host_str() == Some("localhost");

    if !is_https && !is_localhost {
        error!("Origin must use HTTPS for non-localhost deployments");
        return None;
    }

    Some(url)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(backend_base: Url, origin: &Url, token_secret: String) -> ServerConfig {
    let secure_cookies = origin.scheme() == "https";

    ServerConfig {
        backend_base,
        token_secret: token_secret.into_bytes(),
        secure_cookies,
    }
}
