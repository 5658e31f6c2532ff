// Drives an import job from creation to a terminal status, one batch per
// call. The cursor lives in the progress store, not in memory, so any
// invocation can pick the job up where the last one left it.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use lotline_common::dataset::SourceDataset;
use lotline_common::types::{ItemFailure, JobStatus};
use lotline_store::{ListingWriter, ProgressStore};

use crate::error::{ImportError, Result};
use crate::merger::{MergeError, RecordMerger};

pub struct BatchCoordinator {
    dataset: Arc<SourceDataset>,
    progress: Arc<dyn ProgressStore>,
    merger: RecordMerger,
}

#[derive(Debug, Clone, Copy)]
pub struct StartOutcome {
    pub job_id: Uuid,
    pub done: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct AdvanceOutcome {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub offset: i64,
    pub total_items: i64,
}

impl AdvanceOutcome {
    /// True once the job has reached any terminal status.
    pub fn done(&self) -> bool {
        self.status.is_terminal()
    }
}

impl BatchCoordinator {
    pub fn new(
        dataset: Arc<SourceDataset>,
        progress: Arc<dyn ProgressStore>,
        writer: Arc<dyn ListingWriter>,
    ) -> Self {
        Self {
            dataset,
            progress,
            merger: RecordMerger::new(writer),
        }
    }

    /// Create a new import job over the whole dataset and process its first
    /// batch immediately.
    pub async fn start_import(&self, batch_size: i64) -> Result<StartOutcome> {
        let batch_size = batch_size.max(1);
        let total_items = self.dataset.len().await as i64;
        let job = self.progress.create(total_items, batch_size).await?;

        info!(
            job_id = %job.id,
            total_items,
            batch_size,
            "Import started"
        );

        let outcome = self.advance(job.id).await?;
        Ok(StartOutcome {
            job_id: job.id,
            done: outcome.done(),
        })
    }

    /// Process the next batch of a job. Terminal jobs are returned as-is:
    /// a duplicate call never reprocesses, and a concurrent duplicate at
    /// the same offset re-applies an idempotent batch, which is a no-op in
    /// effect.
    pub async fn advance(&self, job_id: Uuid) -> Result<AdvanceOutcome> {
        let job = self
            .progress
            .get(job_id)
            .await?
            .ok_or(ImportError::JobNotFound(job_id))?;

        if job.status.is_terminal() {
            info!(job_id = %job.id, status = %job.status, "Job already terminal, nothing to do");
            return Ok(AdvanceOutcome {
                job_id,
                status: job.status,
                offset: job.current_offset,
                total_items: job.total_items,
            });
        }

        let start = job.current_offset;
        let end = (start + job.batch_size).min(job.total_items);
        let batch = self.dataset.slice(start as usize, end as usize).await;

        let mut failures: Vec<ItemFailure> = Vec::new();
        for (i, raw) in batch.iter().enumerate() {
            let index = start as usize + i;
            match self.merger.merge(raw).await {
                Ok(()) => {}
                Err(MergeError::Validation(reason)) => {
                    // One bad record never aborts the batch.
                    warn!(index, reason = reason.as_str(), "Skipping invalid record");
                    failures.push(ItemFailure {
                        listing_id: raw.id.clone(),
                        index,
                        reason,
                    });
                }
                Err(MergeError::Store(e)) => {
                    // Store writes failing is not an item problem; abort the
                    // batch and leave the job terminally failed.
                    error!(job_id = %job.id, index, error = %e, "Store write failed, failing job");
                    self.progress
                        .fail(job_id, &format!("store write failed at item {index}: {e}"))
                        .await?;
                    return Err(e.into());
                }
            }
        }

        let status = if end >= job.total_items {
            JobStatus::Completed
        } else {
            JobStatus::InProgress
        };
        self.progress.update(job_id, end, status, &failures).await?;

        info!(
            job_id = %job.id,
            offset = end,
            total = job.total_items,
            failed_items = failures.len(),
            status = %status,
            "Batch committed"
        );

        Ok(AdvanceOutcome {
            job_id,
            status,
            offset: end,
            total_items: job.total_items,
        })
    }

    /// Mark a job terminally failed. Used when a continuation cannot be
    /// dispatched; the operator has to start a fresh import.
    pub async fn fail_job(&self, job_id: Uuid, reason: &str) -> Result<()> {
        self.progress.fail(job_id, reason).await?;
        Ok(())
    }

    pub async fn job(&self, job_id: Uuid) -> Result<Option<lotline_store::ImportJob>> {
        Ok(self.progress.get(job_id).await?)
    }
}
