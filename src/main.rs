use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;

use wa_bulk_sender::config::Settings;
use wa_bulk_sender::server::{create_app, AppState};
use wa_bulk_sender::shutdown::{GracefulShutdown, ShutdownConfig};
use wa_bulk_sender::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing; the guard flushes spans on drop
    let _telemetry = init_telemetry(&settings.otel, &settings.log)?;
    tracing::info!("Configuration loaded");

    if !settings.has_default_gateway() {
        tracing::warn!("No default gateway configured; sessions must supply their own credentials");
    }

    // Create application state
    let state = AppState::new(settings.clone());
    let registry = state.registry.clone();
    tracing::info!("Application state initialized");

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Sessions are cancelled before connections drain so progress streams close
    let shutdown = GracefulShutdown::with_config(
        registry,
        ShutdownConfig {
            drain_timeout: settings.dispatch.shutdown_timeout(),
        },
    );

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal_handler().await;
            shutdown.execute("server shutting down").await;
        })
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
