/// Workflow Synchronization
///
/// Keeps the local workflow table consistent with the remote API:
/// - Pure diff of remote vs local records and a transactional apply step
/// - Single-flight orchestration shared by the background loop and manual syncs

// Diff computation and transactional apply
pub mod reconcile;

// Background loop, manual trigger and the single-flight guard
pub mod orchestrator;

pub use orchestrator::{SyncOrchestrator, SyncResult, SyncState};
pub use reconcile::{diff, ReconciliationEngine, WorkflowChanges};
