/// IceSync server entry point
///
/// Loads configuration from the environment and starts the HTTP server together
/// with the background workflow sync task.

use icesync::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Workflow API at /api/workflows, /api/workflows/{id}/run, /api/workflows/sync
/// - Health check at /healthz
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (defaults to 0.0.0.0:5000 and data/icesync.db)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
