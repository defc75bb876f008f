/// IceSync: keeps a local workflow table in step with a remote workflow API
///
/// This library provides the reconciliation core (diff + transactional apply),
/// the single-flight sync orchestrator, the remote API client and the thin REST
/// surface that exposes them.

// Core configuration and setup
pub mod config;

// Error taxonomy shared by every layer
pub mod error;

// Workflow records and the local SQLite table
pub mod workflow;

// Remote workflow API client with bearer token caching
pub mod remote;

// Reconciliation engine and sync orchestrator
pub mod sync;

// HTTP API layer - list, run and sync-now endpoints
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{Result, SyncError};
pub use remote::{RemoteWorkflowClient, UniversalLoaderClient};
pub use server::start_server;
pub use sync::{ReconciliationEngine, SyncOrchestrator, SyncResult};
pub use workflow::{RemoteWorkflowRecord, WorkflowRecord, WorkflowRepository, WorkflowStorage};
