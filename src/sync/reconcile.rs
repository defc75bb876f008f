/// Reconciliation engine
///
/// Computes the inserts, deletes and updates that make the local workflow table
/// match a remote snapshot, and commits them through the repository in one
/// transaction. The remote snapshot always wins.

use crate::{
    error::Result,
    workflow::{
        storage::WorkflowRepository,
        types::{RemoteWorkflowRecord, WorkflowRecord},
    },
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

/// Changes needed to converge local storage onto the remote snapshot
///
/// Every local and remote id lands in exactly one of the three lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowChanges {
    /// Remote workflows with no local row, copied 1:1
    pub to_insert: Vec<WorkflowRecord>,
    /// Local rows the remote no longer reports
    pub to_delete: Vec<WorkflowRecord>,
    /// Local rows present remotely, already overwritten with the remote fields
    pub to_update: Vec<WorkflowRecord>,
}

impl WorkflowChanges {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_delete.is_empty() && self.to_update.is_empty()
    }
}

/// Classify every workflow id into insert, delete or update
///
/// Pure computation, never touches storage. `local` is consumed because update
/// targets are returned with their fields already overwritten. If the remote
/// snapshot repeats an id, the first occurrence wins and only one insert is
/// produced for it.
pub fn diff(remote: &[RemoteWorkflowRecord], local: Vec<WorkflowRecord>) -> WorkflowChanges {
    let mut remote_by_id: HashMap<i64, &RemoteWorkflowRecord> = HashMap::with_capacity(remote.len());
    for record in remote {
        remote_by_id.entry(record.id).or_insert(record);
    }

    let local_ids: HashSet<i64> = local.iter().map(|w| w.id).collect();

    let mut inserted_ids = HashSet::new();
    let to_insert = remote
        .iter()
        .filter(|r| !local_ids.contains(&r.id) && inserted_ids.insert(r.id))
        .map(WorkflowRecord::from_remote)
        .collect();

    let (mut to_update, to_delete): (Vec<_>, Vec<_>) = local
        .into_iter()
        .partition(|w| remote_by_id.contains_key(&w.id));

    for workflow in &mut to_update {
        if let Some(remote) = remote_by_id.get(&workflow.id) {
            workflow.overwrite_from(remote);
        }
    }

    WorkflowChanges {
        to_insert,
        to_delete,
        to_update,
    }
}

/// Applies computed changes to local storage
#[derive(Clone)]
pub struct ReconciliationEngine {
    repository: Arc<dyn WorkflowRepository>,
}

impl ReconciliationEngine {
    pub fn new(repository: Arc<dyn WorkflowRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<dyn WorkflowRepository> {
        &self.repository
    }

    /// Convenience wrapper over [`diff`]
    pub fn diff(&self, remote: &[RemoteWorkflowRecord], local: Vec<WorkflowRecord>) -> WorkflowChanges {
        diff(remote, local)
    }

    /// Commit the changes in a single transaction
    ///
    /// An empty change set makes no repository call at all and returns 0.
    /// Otherwise returns the number of rows storage reports as affected.
    /// Errors are logged and returned unchanged; nothing is partially committed.
    pub async fn apply(&self, changes: &WorkflowChanges) -> Result<u64> {
        if changes.is_empty() {
            tracing::debug!("📭 No workflow changes to apply");
            return Ok(0);
        }

        if !changes.to_insert.is_empty() {
            tracing::info!("➕ Inserting {} new workflows", changes.to_insert.len());
        }
        if !changes.to_delete.is_empty() {
            tracing::info!("🗑️ Deleting {} workflows", changes.to_delete.len());
        }
        if !changes.to_update.is_empty() {
            tracing::info!("✏️ Updating {} workflows", changes.to_update.len());
        }

        match self
            .repository
            .persist_batch(&changes.to_insert, &changes.to_delete, &changes.to_update)
            .await
        {
            Ok(affected) => {
                tracing::debug!("💾 Committed workflow changes, {} rows affected", affected);
                Ok(affected)
            }
            Err(e) => {
                tracing::error!("❌ Failed to commit workflow changes: {}", e);
                Err(e)
            }
        }
    }
}
