/// HTTP API Layer
///
/// REST endpoints over the local workflow table and the sync core:
/// - List locally stored workflows
/// - Trigger a remote run for a workflow
/// - Run a reconciliation pass on demand

// Workflow endpoints (GET list, POST run, POST sync)
pub mod workflows;

// Re-export router builder
pub use workflows::{create_workflow_routes, AppState};
