/// Workflow Data Layer
///
/// This module holds the workflow record types and the local table they live in:
/// - Type definitions (WorkflowRecord, RemoteWorkflowRecord)
/// - SQLite persistence with sqlx behind the WorkflowRepository trait

// Local and remote workflow record definitions
pub mod types;

// SQLite persistence layer for the workflow table
pub mod storage;

// Re-export commonly used types
pub use storage::{WorkflowRepository, WorkflowStorage};
pub use types::{RemoteWorkflowRecord, WorkflowRecord};
