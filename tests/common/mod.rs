//! Shared fakes for integration tests.
//!
//! `MemoryRepository` keeps rows in a map and records how many batch commits
//! overlapped. `FakeRemote` serves a scripted workflow list with an optional
//! delay and records trigger calls.

#![allow(dead_code)]

use async_trait::async_trait;
use icesync::{
    error::{Result, SyncError},
    remote::RemoteWorkflowClient,
    workflow::{RemoteWorkflowRecord, WorkflowRecord, WorkflowRepository},
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn remote(id: i64, name: &str, active: bool, behavior: &str) -> RemoteWorkflowRecord {
    RemoteWorkflowRecord {
        id,
        name: name.into(),
        is_active: active,
        multi_exec_behavior: behavior.into(),
    }
}

pub fn local(id: i64, name: &str, active: bool, behavior: &str) -> WorkflowRecord {
    WorkflowRecord {
        id,
        name: name.into(),
        is_active: active,
        multi_exec_behavior: behavior.into(),
    }
}

/// Tracks how many callers are inside a section at once
#[derive(Default)]
pub struct ConcurrencyProbe {
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// In-memory workflow table
#[derive(Default)]
pub struct MemoryRepository {
    rows: Mutex<BTreeMap<i64, WorkflowRecord>>,
    pub persist_calls: AtomicUsize,
    pub commits: ConcurrencyProbe,
    pub fail_persist: AtomicBool,
    pub fail_list: AtomicBool,
    pub commit_delay: Duration,
}

impl MemoryRepository {
    pub fn with_rows(rows: Vec<WorkflowRecord>) -> Self {
        let repo = Self::default();
        repo.rows
            .lock()
            .unwrap()
            .extend(rows.into_iter().map(|w| (w.id, w)));
        repo
    }

    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    pub fn rows(&self) -> Vec<WorkflowRecord> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn persist_calls(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }
}

fn storage_failure() -> SyncError {
    SyncError::Persistence(sqlx::Error::PoolClosed)
}

#[async_trait]
impl WorkflowRepository for MemoryRepository {
    async fn list_all(&self) -> Result<Vec<WorkflowRecord>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(storage_failure());
        }
        Ok(self.rows())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<WorkflowRecord>> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn create(&self, workflow: &WorkflowRecord) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&workflow.id) {
            return Err(storage_failure());
        }
        rows.insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn update(&self, workflow: &WorkflowRecord) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&workflow.id) {
            Some(row) => {
                *row = workflow.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }

    async fn persist_batch(
        &self,
        to_insert: &[WorkflowRecord],
        to_delete: &[WorkflowRecord],
        to_update: &[WorkflowRecord],
    ) -> Result<u64> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        self.commits.enter();
        if !self.commit_delay.is_zero() {
            tokio::time::sleep(self.commit_delay).await;
        }

        let result = (|| {
            if self.fail_persist.load(Ordering::SeqCst) {
                return Err(storage_failure());
            }
            let mut rows = self.rows.lock().unwrap();
            let mut staged = rows.clone();
            let mut affected = 0u64;
            for w in to_insert {
                if staged.insert(w.id, w.clone()).is_some() {
                    return Err(storage_failure());
                }
                affected += 1;
            }
            for w in to_delete {
                if staged.remove(&w.id).is_some() {
                    affected += 1;
                }
            }
            for w in to_update {
                if let Some(row) = staged.get_mut(&w.id) {
                    *row = w.clone();
                    affected += 1;
                }
            }
            *rows = staged;
            Ok(affected)
        })();

        self.commits.exit();
        result
    }
}

/// Scriptable remote API
#[derive(Default)]
pub struct FakeRemote {
    workflows: Mutex<Vec<RemoteWorkflowRecord>>,
    pub fetch_delay: Duration,
    pub fail_list: AtomicBool,
    pub reject_triggers: AtomicBool,
    pub fail_triggers: AtomicBool,
    pub list_calls: AtomicUsize,
    pub fetches: ConcurrencyProbe,
    triggered: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn with_workflows(workflows: Vec<RemoteWorkflowRecord>) -> Self {
        let fake = Self::default();
        *fake.workflows.lock().unwrap() = workflows;
        fake
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn set_workflows(&self, workflows: Vec<RemoteWorkflowRecord>) {
        *self.workflows.lock().unwrap() = workflows;
    }

    pub fn triggered(&self) -> Vec<String> {
        self.triggered.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteWorkflowClient for FakeRemote {
    async fn list_workflows(&self) -> Result<Vec<RemoteWorkflowRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.fetches.enter();
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.fetches.exit();

        if self.fail_list.load(Ordering::SeqCst) {
            return Err(SyncError::Transport {
                operation: "list workflows".into(),
                message: "connection refused".into(),
                source: None,
            });
        }
        Ok(self.workflows.lock().unwrap().clone())
    }

    async fn trigger_workflow(&self, workflow_id: &str) -> Result<bool> {
        self.triggered.lock().unwrap().push(workflow_id.to_string());
        if self.fail_triggers.load(Ordering::SeqCst) {
            return Err(SyncError::Transport {
                operation: "trigger workflow".into(),
                message: "connection reset".into(),
                source: None,
            });
        }
        Ok(!self.reject_triggers.load(Ordering::SeqCst))
    }
}
