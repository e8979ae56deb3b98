use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use imagecraft_core::pipeline::Decoder;
use imagecraft_core::preview::decode_preview;
use imagecraft_replicate::config::ReplicateConfig;
use imagecraft_replicate::model::ReplicateModel;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imagecraft_api::config::ServerConfig;
use imagecraft_api::router::build_app_router;
use imagecraft_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    // LOG_FORMAT=json switches to one JSON object per line.
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "imagecraft_api=debug,imagecraft_core=debug,imagecraft_replicate=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let replicate_config = ReplicateConfig::from_env();
    tracing::info!(
        api_base = %replicate_config.api_base,
        model = %replicate_config.model,
        "Loaded Replicate configuration",
    );
    if config.generation_timeout <= replicate_config.poll_timeout {
        tracing::warn!(
            generation_timeout_secs = config.generation_timeout.as_secs(),
            poll_timeout_secs = replicate_config.poll_timeout.as_secs(),
            "GENERATION_TIMEOUT_SECS does not exceed REPLICATE_POLL_TIMEOUT_SECS; slow predictions will be cut short",
        );
    }

    // --- Model ---
    let model = ReplicateModel::from_config(replicate_config).expect("Invalid REPLICATE_MODEL");

    // --- App state ---
    let decoder: Decoder = Arc::new(decode_preview);
    let state = AppState {
        config: Arc::new(config.clone()),
        model: Arc::new(model),
        preview_decoder: decoder,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    // In-flight generations may be waiting on the model; bound the drain.
    tokio::select! {
        result = server => result.expect("Server error"),
        () = drain_deadline(drain) => {
            tracing::warn!(
                seconds = drain.as_secs(),
                "Shutdown drain timed out, dropping remaining connections",
            );
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Resolves `drain` after a shutdown signal arrives, never before.
async fn drain_deadline(drain: Duration) {
    shutdown_signal().await;
    tokio::time::sleep(drain).await;
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
