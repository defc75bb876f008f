/// Workflow REST API endpoints
///
/// Thin handlers over the repository, the remote client and the sync
/// orchestrator. Every failure is caught here, logged, and mapped to a status
/// code with a `{ "message": ... }` body.

use crate::{
    error::SyncError,
    remote::client::RemoteWorkflowClient,
    sync::orchestrator::{SyncOrchestrator, SyncResult},
    workflow::{storage::WorkflowRepository, types::WorkflowRecord},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Local workflow table
    pub repository: Arc<dyn WorkflowRepository>,
    /// Remote workflow API
    pub client: Arc<dyn RemoteWorkflowClient>,
    /// Shared with the background loop so manual syncs respect the same guard
    pub orchestrator: Arc<SyncOrchestrator>,
}

/// Body for every non-list response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body for a successful manual sync
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: String,
    #[serde(flatten)]
    pub counts: SyncResult,
}

type ApiError = (StatusCode, Json<MessageResponse>);

fn reply(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    )
}

fn internal_error() -> ApiError {
    reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Create workflow routes
///
/// Paths are relative; the server mounts them under `/api`.
pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/workflows", get(list_workflows))
        .route("/workflows/sync", post(sync_workflows))
        .route("/workflows/{id}/run", post(run_workflow))
}

/// List all locally stored workflows
///
/// GET /workflows
/// Returns: [{ "workflowId": 1, "workflowName": "...", "isActive": true, "multiExecBehavior": "..." }]
async fn list_workflows(
    State(state): State<AppState>,
) -> Result<Json<Vec<WorkflowRecord>>, ApiError> {
    match state.repository.list_all().await {
        Ok(workflows) => Ok(Json(workflows)),
        Err(e) => {
            tracing::error!("❌ Error retrieving workflows from database: {}", e);
            Err(internal_error())
        }
    }
}

/// Ask the remote API to run a workflow
///
/// POST /workflows/:id/run
/// The id is forwarded as-is, including zero and negative values.
async fn run_workflow(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    match state.client.trigger_workflow(&id.to_string()).await {
        Ok(true) => {
            tracing::info!("🚀 Successfully triggered workflow {}", id);
            Ok(Json(MessageResponse {
                message: "Workflow triggered successfully".into(),
            }))
        }
        Ok(false) => {
            tracing::warn!("⚠️ Failed to trigger workflow {}", id);
            Err(reply(StatusCode::BAD_REQUEST, "Failed to trigger workflow"))
        }
        Err(e) => {
            tracing::error!("❌ Error running workflow {}: {}", id, e);
            Err(internal_error())
        }
    }
}

/// Run a reconciliation pass now
///
/// POST /workflows/sync
/// Returns: { "message": "...", "inserted": 0, "deleted": 0, "updated": 0 }
/// Responds 409 while another pass is running.
async fn sync_workflows(
    State(state): State<AppState>,
) -> Result<Json<SyncResponse>, ApiError> {
    match state.orchestrator.try_sync_once().await {
        Ok(counts) => Ok(Json(SyncResponse {
            message: "Synchronization completed successfully".into(),
            counts,
        })),
        Err(SyncError::SyncInProgress) => Err(reply(
            StatusCode::CONFLICT,
            "Synchronization already in progress",
        )),
        Err(e) => {
            tracing::error!("❌ Error synchronizing workflows: {}", e);
            Err(internal_error())
        }
    }
}
