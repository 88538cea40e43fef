use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use intake_server::config::Config;
use intake_server::store::FileRecordStore;
use intake_server::{build_router, get_service_version, AppState, IntakeService};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting application intake server {}", get_service_version());

    let config = Config::from_env().context("Failed to load configuration from environment")?;

    let store = FileRecordStore::new(&config.data_dir)
        .await
        .context("Failed to initialize data directory")?;
    match store.check_writable().await {
        Ok(()) => info!("Data directory is writable"),
        Err(e) => error!(
            "Data directory {} is not writable, submissions will fail: {}",
            store.data_dir().display(),
            e
        ),
    }

    if !config.static_dir.join("index.html").is_file() {
        warn!(
            "No index.html in {}, the frontend will not be served",
            config.static_dir.display()
        );
    }
    if config.strict_grades {
        info!("Strict grade validation enabled");
    }

    let service = IntakeService::new(Arc::new(store)).with_strict_grades(config.strict_grades);
    let app_state = Arc::new(AppState {
        service,
        static_dir: config.static_dir.clone(),
    });
    let app = build_router(app_state);

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
