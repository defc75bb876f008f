/// Sync orchestration: background loop and on-demand passes
///
/// Wraps the reconciliation engine with the two triggers the service needs, a
/// fixed-delay background loop and manual requests from the REST surface. Both
/// go through one guard, so at most one pass reads and writes the workflow table
/// at a time.
///
/// Guard policy:
/// - The background loop waits for an in-flight pass to finish, then runs.
///   [`SyncOrchestrator::sync_once`] does the same for other callers.
/// - [`SyncOrchestrator::try_sync_once`] refuses with [`SyncError::SyncInProgress`]
///   while another pass holds the guard. The REST surface uses this.

use crate::{
    error::{Result, SyncError},
    remote::client::RemoteWorkflowClient,
    sync::reconcile::ReconciliationEngine,
    workflow::types::RemoteWorkflowRecord,
};
use serde::Serialize;
use std::{collections::HashSet, sync::Arc, time::Duration};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tracing::Instrument;

/// Counts reported for one completed pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub inserted: usize,
    pub deleted: usize,
    pub updated: usize,
}

/// Phase of the current pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Fetching,
    Diffing,
    Applying,
    /// Published when a pass fails, immediately followed by `Idle`
    Failed,
}

/// What started a pass, recorded on its tracing span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Background,
    Manual,
}

impl SyncTrigger {
    fn as_str(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Manual => "manual",
        }
    }
}

/// Single-flight driver for reconciliation passes
pub struct SyncOrchestrator {
    client: Arc<dyn RemoteWorkflowClient>,
    engine: ReconciliationEngine,
    /// Upper bound on the remote fetch
    fetch_timeout: Duration,
    /// Held for the whole fetch/diff/apply sequence
    guard: Mutex<()>,
    state_tx: watch::Sender<SyncState>,
}

impl SyncOrchestrator {
    pub fn new(
        client: Arc<dyn RemoteWorkflowClient>,
        engine: ReconciliationEngine,
        fetch_timeout: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(SyncState::Idle);
        Self {
            client,
            engine,
            fetch_timeout,
            guard: Mutex::new(()),
            state_tx,
        }
    }

    /// Current phase
    pub fn state(&self) -> SyncState {
        *self.state_tx.borrow()
    }

    /// Subscribe to phase changes
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state_tx.subscribe()
    }

    /// Run one pass, queuing behind any pass already in flight
    pub async fn sync_once(&self) -> Result<SyncResult> {
        self.sync_queued(SyncTrigger::Manual).await
    }

    async fn sync_queued(&self, trigger: SyncTrigger) -> Result<SyncResult> {
        let _permit = self.guard.lock().await;
        self.run_pass(trigger).await
    }

    /// Run one pass now, or fail with `SyncInProgress` if one is in flight
    pub async fn try_sync_once(&self) -> Result<SyncResult> {
        let _permit = match self.guard.try_lock() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!("⏳ Sync requested while another pass is running");
                return Err(SyncError::SyncInProgress);
            }
        };
        self.run_pass(SyncTrigger::Manual).await
    }

    async fn run_pass(&self, trigger: SyncTrigger) -> Result<SyncResult> {
        let span = tracing::info_span!(
            "sync",
            sync_id = %uuid::Uuid::new_v4(),
            trigger = trigger.as_str()
        );

        async move {
            let started = std::time::Instant::now();
            let result = self.fetch_diff_apply().await;

            match &result {
                Ok(counts) => {
                    self.state_tx.send_replace(SyncState::Idle);
                    tracing::info!(
                        inserted = counts.inserted,
                        deleted = counts.deleted,
                        updated = counts.updated,
                        "✅ Workflow synchronization completed in {:?}",
                        started.elapsed()
                    );
                }
                Err(e) => {
                    self.state_tx.send_replace(SyncState::Failed);
                    tracing::debug!("Workflow synchronization failed after {:?}: {}", started.elapsed(), e);
                    self.state_tx.send_replace(SyncState::Idle);
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn fetch_diff_apply(&self) -> Result<SyncResult> {
        self.state_tx.send_replace(SyncState::Fetching);

        let remote_fetch = async {
            match tokio::time::timeout(self.fetch_timeout, self.client.list_workflows()).await {
                Ok(result) => result,
                Err(_) => Err(SyncError::Timeout {
                    operation: "list workflows".into(),
                    seconds: self.fetch_timeout.as_secs(),
                }),
            }
        };
        let local_fetch = self.engine.repository().list_all();

        let (remote, local) = tokio::try_join!(remote_fetch, local_fetch)?;
        tracing::debug!("📥 Fetched {} remote and {} local workflows", remote.len(), local.len());

        validate_remote(&remote)?;

        self.state_tx.send_replace(SyncState::Diffing);
        let changes = self.engine.diff(&remote, local);
        let result = SyncResult {
            inserted: changes.to_insert.len(),
            deleted: changes.to_delete.len(),
            updated: changes.to_update.len(),
        };

        self.state_tx.send_replace(SyncState::Applying);
        self.engine.apply(&changes).await?;

        Ok(result)
    }

    /// Repeat a queued pass with a fixed delay after each pass until shutdown
    ///
    /// Failures are logged and the loop carries on with the next interval.
    pub async fn run_background_loop(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let span = tracing::info_span!("background_sync");

        async move {
            let _ = shutdown_rx.borrow_and_update();
            tracing::info!(interval_secs = interval.as_secs(), "🔄 Workflow sync service is starting");

            loop {
                if *shutdown_rx.borrow() {
                    break;
                }

                if let Err(e) = self.sync_queued(SyncTrigger::Background).await {
                    tracing::error!("❌ Error occurred during workflow synchronization: {}", e);
                }

                tokio::select! {
                    biased;

                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }

                    _ = tokio::time::sleep(interval) => {}
                }
            }

            tracing::info!("⏹️ Workflow sync service is stopping");
        }
        .instrument(span)
        .await
    }

    /// Spawn [`Self::run_background_loop`] on the runtime
    pub fn spawn_background_loop(
        self: &Arc<Self>,
        interval: Duration,
        shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run_background_loop(interval, shutdown_rx))
    }
}

/// Reject snapshots the local table cannot hold
fn validate_remote(remote: &[RemoteWorkflowRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(remote.len());
    for record in remote {
        if !seen.insert(record.id) {
            return Err(SyncError::InvalidRemoteData(format!(
                "duplicate workflow id {} in remote list",
                record.id
            )));
        }
        record.validate().map_err(SyncError::InvalidRemoteData)?;
    }
    Ok(())
}
