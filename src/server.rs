/// Server setup and initialization
///
/// Wires together storage, the remote client, the sync orchestrator and HTTP
/// routes, starts the background sync task and handles graceful shutdown.

use crate::{
    api::workflows::{create_workflow_routes, AppState},
    config::Config,
    remote::client::UniversalLoaderClient,
    sync::{orchestrator::SyncOrchestrator, reconcile::ReconciliationEngine},
    workflow::storage::WorkflowStorage,
};
use anyhow::{Context, Result};
use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::watch, task::JoinHandle};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

/// Build the HTTP router around an existing application state
///
/// Workflow endpoints are mounted under `/api`; `/healthz` sits at the root.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check endpoint
        .route("/healthz", get(health_check))
        // Workflow API routes
        .nest("/api", create_workflow_routes())
        .with_state(state)
        .layer(cors)
}

/// Create the application and start the background sync task
///
/// The task runs until `shutdown_rx` observes `true`.
pub async fn create_app(
    config: Config,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<(Router, JoinHandle<()>)> {
    config.validate().context("Invalid configuration")?;

    tracing::info!("📋 Initializing workflow storage");
    let storage = WorkflowStorage::connect(&config.database.url)
        .await
        .context("Failed to open workflow database")?;
    storage
        .init_schema()
        .await
        .context("Failed to initialize workflow schema")?;
    let repository = Arc::new(storage);

    tracing::info!("🌐 Initializing remote workflow client for {}", config.remote.base_url);
    let client = Arc::new(
        UniversalLoaderClient::new(&config.remote).context("Failed to build remote client")?,
    );

    tracing::info!("⚙️ Initializing sync orchestrator");
    let engine = ReconciliationEngine::new(repository.clone());
    let orchestrator = Arc::new(SyncOrchestrator::new(
        client.clone(),
        engine,
        config.remote.timeout(),
    ));

    tracing::info!(
        "⏰ Starting background sync every {}s",
        config.sync.interval_secs
    );
    let sync_task = orchestrator.spawn_background_loop(config.sync.interval(), shutdown_rx);

    let state = AppState {
        repository,
        client,
        orchestrator,
    };

    tracing::info!("📡 Creating HTTP router with all endpoints");
    let app = build_router(state, &config.server.cors_origins);

    tracing::info!("✅ Application initialized successfully");
    Ok((app, sync_task))
}

/// Start the HTTP server with the given configuration
///
/// Serves until Ctrl+C, then stops the background sync task and waits for it.
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting IceSync server...");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (app, sync_task) = create_app(config.clone(), shutdown_rx).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("🛑 Shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sync_task.await {
        tracing::error!("❌ Background sync task ended abnormally: {}", e);
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
