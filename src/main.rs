use clap::Parser;
use edgegate::cli::{
    Args, build_config, init_logging, load_token_secret, validate_backend_uri, validate_origin,
};
use edgegate::run_server;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(token_secret) = load_token_secret(args.token_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(backend_base) = validate_backend_uri(&args.backend_uri) else {
        std::process::exit(1);
    };

    let Some(origin) = validate_origin(&args.origin) else {
        std::process::exit(1);
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().expect("Failed to get local address");
    let config = build_config(backend_base, &origin, token_secret);

    info!(address = %local_addr, backend = %config.backend_base, "Listening");

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
