mod error;
mod routes;
mod state;
mod ytdlp;

use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use chorus_core::{ChorusConfig, CoreError};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    init_tracing();

    // Load config; a first run writes the template and proceeds on defaults
    let config = match ChorusConfig::load_or_create() {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                "Created config template at {}; running with defaults",
                path.display()
            );
            ChorusConfig::default()
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize server state: {e}");
            std::process::exit(1);
        }
    };

    let cors = build_cors(&state.config.server.client_origins);
    let app = routes::router(state.clone())
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Graceful shutdown on Ctrl+C
    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            signal_token.cancel();
        }
    });

    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };

    info!("Chorus server is running on {addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(cancel_token.cancelled_owned())
        .await
    {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Allow the configured web-client origins to call the API.
fn build_cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
        .allow_headers(Any)
}
