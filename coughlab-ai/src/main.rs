//! coughlab-ai - Cough Analysis Microservice
//!
//! **Module Identity:**
//! - Name: coughlab-ai
//! - Default port: 5080
//!
//! Accepts cough recordings over HTTP, extracts acoustic features and
//! returns a disease prediction. Predictions are cached by content hash so
//! re-uploading the same file returns the same answer.

use anyhow::{Context, Result};
use clap::Parser;
use coughlab_common::config::{self, CacheBackend, RootFolder, ROOT_FOLDER_ENV};
use coughlab_common::DiseaseTable;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coughlab_ai::cache::open_store;
use coughlab_ai::classifier::MockClassifier;
use coughlab_ai::services::UploadHandler;
use coughlab_ai::AppState;

/// Command-line arguments for coughlab-ai
#[derive(Parser, Debug)]
#[command(name = "coughlab-ai")]
#[command(about = "Cough analysis microservice")]
#[command(version)]
struct Args {
    /// Root folder for recordings and the prediction cache
    #[arg(short, long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "COUGHLAB_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Configuration file (defaults to the platform config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prediction cache backend: json or sqlite
    #[arg(long)]
    cache_backend: Option<CacheBackend>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = match &args.config {
        Some(path) => config::load_toml_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => config::load_default_config().context("Failed to load configuration")?,
    };

    // Initialize tracing
    let level = toml_config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("coughlab_ai={},tower_http={}", level, level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting coughlab-ai (Cough Analysis) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve and create root folder
    let root_path = config::resolve_root_folder(
        args.root_folder.as_deref(),
        ROOT_FOLDER_ENV,
        &toml_config,
    );
    let root = RootFolder::new(root_path);
    root.ensure_directories()
        .with_context(|| format!("Failed to initialize root folder {}", root.path().display()))?;
    info!("Root folder: {}", root.path().display());

    // Step 2: Open prediction cache
    let backend = args.cache_backend.unwrap_or(toml_config.cache_backend);
    let store = open_store(backend, &root)
        .await
        .context("Failed to open prediction cache")?;
    let cached = store.len().await.unwrap_or_else(|e| {
        warn!(error = %e, "Could not count cached predictions");
        0
    });
    info!(backend = store.backend(), cached, "Prediction cache ready");

    // Step 3: Wire the upload pipeline
    let diseases = Arc::new(DiseaseTable::standard());
    let classifier = Arc::new(MockClassifier::new());
    let handler = UploadHandler::new(root.recordings_dir(), store, classifier, diseases)
        .with_max_upload_bytes(toml_config.max_upload_bytes);
    info!(
        classifier = handler.classifier_name(),
        max_upload_bytes = handler.max_upload_bytes(),
        "Upload handler initialized"
    );

    let state = AppState::new(handler);
    let app = coughlab_ai::build_router(state);

    // Step 4: Serve
    let host = args.host.unwrap_or(toml_config.host);
    let port = args.port.unwrap_or(toml_config.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
///
/// If a handler cannot be installed that branch never fires; the other still
/// does.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
