/// SQLite persistence layer for the local workflow table
///
/// Defines the [`WorkflowRepository`] seam used by the reconciliation engine and
/// the REST handlers, and its sqlx-backed implementation. Batches of inserts,
/// deletes and updates are committed in a single transaction.

use crate::error::Result;
use crate::workflow::types::WorkflowRecord;
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
    Row,
};
use std::str::FromStr;

/// Storage operations over the local workflow table
///
/// Each method is atomic on its own. `persist_batch` is the only multi-row write
/// and either applies every staged change or none of them.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// All rows, ordered by id
    async fn list_all(&self) -> Result<Vec<WorkflowRecord>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<WorkflowRecord>>;

    /// Insert a single row; fails if the id already exists
    async fn create(&self, workflow: &WorkflowRecord) -> Result<()>;

    /// Overwrite a single row; returns false if the id does not exist
    async fn update(&self, workflow: &WorkflowRecord) -> Result<bool>;

    /// Remove a single row; returns false if the id does not exist
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Stage inserts, deletes and updates and commit them together
    ///
    /// Returns the number of rows the database reports as affected.
    async fn persist_batch(
        &self,
        to_insert: &[WorkflowRecord],
        to_delete: &[WorkflowRecord],
        to_update: &[WorkflowRecord],
    ) -> Result<u64>;
}

/// SQLite-based workflow storage
#[derive(Debug, Clone)]
pub struct WorkflowStorage {
    /// SQLite connection pool for the workflow database
    pool: SqlitePool,
}

const INSERT_SQL: &str = r#"
    INSERT INTO workflows (workflow_id, workflow_name, is_active, multi_exec_behavior)
    VALUES (?, ?, ?, ?)
"#;

const UPDATE_SQL: &str = r#"
    UPDATE workflows
    SET workflow_name = ?, is_active = ?, multi_exec_behavior = ?
    WHERE workflow_id = ?
"#;

const DELETE_SQL: &str = "DELETE FROM workflows WHERE workflow_id = ?";

impl WorkflowStorage {
    /// Create new storage instance with database connection
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (and create if missing) the database behind `url`
    ///
    /// In-memory databases are limited to one pooled connection so every query
    /// sees the same database.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let in_memory = url.contains(":memory:");
        if !in_memory {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        sqlx::Error::Configuration(
                            format!(
                                "failed to create database directory '{}': {}",
                                parent.display(),
                                e
                            )
                            .into(),
                        )
                    })?;
                }
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(options)
            .await?;

        tracing::info!("🗄️ Connected workflow database: {}", url);
        Ok(Self::new(pool))
    }

    /// Initialize the workflow table
    ///
    /// Ids come from the remote API, so the key is never generated locally.
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                workflow_id INTEGER PRIMARY KEY NOT NULL,
                workflow_name TEXT NOT NULL CHECK (length(workflow_name) <= 255),
                is_active INTEGER NOT NULL DEFAULT 0,
                multi_exec_behavior TEXT
                    CHECK (multi_exec_behavior IS NULL OR length(multi_exec_behavior) <= 100)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn record_from_row(row: &SqliteRow) -> WorkflowRecord {
    let multi_exec_behavior: Option<String> = row.get("multi_exec_behavior");
    WorkflowRecord {
        id: row.get("workflow_id"),
        name: row.get("workflow_name"),
        is_active: row.get("is_active"),
        multi_exec_behavior: multi_exec_behavior.unwrap_or_default(),
    }
}

#[async_trait]
impl WorkflowRepository for WorkflowStorage {
    async fn list_all(&self) -> Result<Vec<WorkflowRecord>> {
        let rows = sqlx::query(
            "SELECT workflow_id, workflow_name, is_active, multi_exec_behavior FROM workflows ORDER BY workflow_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<WorkflowRecord>> {
        let row = sqlx::query(
            "SELECT workflow_id, workflow_name, is_active, multi_exec_behavior FROM workflows WHERE workflow_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn create(&self, workflow: &WorkflowRecord) -> Result<()> {
        sqlx::query(INSERT_SQL)
            .bind(workflow.id)
            .bind(&workflow.name)
            .bind(workflow.is_active)
            .bind(&workflow.multi_exec_behavior)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update(&self, workflow: &WorkflowRecord) -> Result<bool> {
        let result = sqlx::query(UPDATE_SQL)
            .bind(&workflow.name)
            .bind(workflow.is_active)
            .bind(&workflow.multi_exec_behavior)
            .bind(workflow.id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(DELETE_SQL)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn persist_batch(
        &self,
        to_insert: &[WorkflowRecord],
        to_delete: &[WorkflowRecord],
        to_update: &[WorkflowRecord],
    ) -> Result<u64> {
        // Dropping the transaction on any early return rolls it back.
        let mut tx = self.pool.begin().await?;
        let mut affected = 0u64;

        for workflow in to_insert {
            affected += sqlx::query(INSERT_SQL)
                .bind(workflow.id)
                .bind(&workflow.name)
                .bind(workflow.is_active)
                .bind(&workflow.multi_exec_behavior)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        for workflow in to_delete {
            affected += sqlx::query(DELETE_SQL)
                .bind(workflow.id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        for workflow in to_update {
            affected += sqlx::query(UPDATE_SQL)
                .bind(&workflow.name)
                .bind(workflow.is_active)
                .bind(&workflow.multi_exec_behavior)
                .bind(workflow.id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        Ok(affected)
    }
}
