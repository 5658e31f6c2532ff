// Durable record of an import job's cursor and status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lotline_common::types::{ItemFailure, JobStatus};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ImportJob {
    pub id: Uuid,
    pub batch_size: i64,
    pub current_offset: i64,
    pub total_items: i64,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error: Option<JobError>,
}

/// Persisted error payload. Either the per-item failures of the last batch
/// or a job-level failure reason, surfaced verbatim to operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobError {
    Items(Vec<ItemFailure>),
    Job(String),
}

impl ImportJob {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Create a new job at offset 0 with status in_progress.
    async fn create(&self, total_items: i64, batch_size: i64) -> Result<ImportJob>;

    async fn get(&self, job_id: Uuid) -> Result<Option<ImportJob>>;

    /// Commit the outcome of one batch in a single atomic write. The offset
    /// is guarded against regression: a stale concurrent caller loses.
    async fn update(
        &self,
        job_id: Uuid,
        offset: i64,
        status: JobStatus,
        failures: &[ItemFailure],
    ) -> Result<()>;

    /// Mark a job terminally failed with a reason. Reachable from any
    /// caller error path so jobs don't silently stay in_progress.
    async fn fail(&self, job_id: Uuid, reason: &str) -> Result<()>;
}
