//! dealdrop server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dealdrop_api::{AppState, app};
use dealdrop_common::Config;
use dealdrop_common::config::LogFormat;
use dealdrop_core::{DatabaseRecordStore, EventProcessor, FcmGateway, NotificationService};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dealdrop=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;
    init_tracing(config.logging.format);

    info!("Starting dealdrop server...");

    // Connect to database
    let db = dealdrop_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    dealdrop_db::migrate(&db).await?;
    info!("Migrations completed");

    // Push gateway, simulated when no credentials are configured
    let gateway = FcmGateway::new(config.push.clone())?;

    // Dispatch pipeline
    let store = Arc::new(DatabaseRecordStore::new(Arc::new(db)));
    let service = NotificationService::new(
        store,
        Arc::new(gateway),
        config.dispatch.fanout_failure_policy,
    );
    let processor = EventProcessor::new(service);

    if config.webhook.secret.is_empty() {
        warn!("Webhook secret is empty, every webhook call will be rejected");
    }
    let state = AppState::new(processor, config.webhook.secret.as_str());

    let app = app(
        state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
