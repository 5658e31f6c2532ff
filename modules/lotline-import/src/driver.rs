// Two ways to keep a job moving after one advance:
//
// `run_to_completion` is the in-process poller, a loop over `advance`
// with a fixed inter-batch delay, used where the process lives long enough.
// `continue_with_dispatch` advances once and hands the rest to the
// configured dispatcher, for runtimes that are time-boxed per invocation.

use std::time::Duration;

use tracing::{error, info};
use uuid::Uuid;

use crate::continuation::ContinuationDispatcher;
use crate::coordinator::{AdvanceOutcome, BatchCoordinator};
use crate::error::Result;

/// Delay between batches, giving the destination store room to breathe.
pub const INTER_BATCH_DELAY: Duration = Duration::from_secs(1);

/// Loop `advance` until the job reaches a terminal status.
pub async fn run_to_completion(
    coordinator: &BatchCoordinator,
    job_id: Uuid,
) -> Result<AdvanceOutcome> {
    loop {
        let outcome = coordinator.advance(job_id).await?;
        if outcome.done() {
            info!(
                job_id = %job_id,
                status = %outcome.status,
                offset = outcome.offset,
                "Import run finished"
            );
            return Ok(outcome);
        }
        tokio::time::sleep(INTER_BATCH_DELAY).await;
    }
}

/// Advance one batch; if the job is not finished, dispatch a continuation.
/// A dispatch failure terminally fails the job: nothing would ever call
/// `advance` again, and a silently stuck job is worse than a failed one.
pub async fn continue_with_dispatch(
    coordinator: &BatchCoordinator,
    dispatcher: &dyn ContinuationDispatcher,
    job_id: Uuid,
) -> Result<AdvanceOutcome> {
    let outcome = coordinator.advance(job_id).await?;

    if !outcome.done() {
        if let Err(e) = dispatcher.dispatch(job_id).await {
            error!(job_id = %job_id, error = %e, "Continuation dispatch failed, failing job");
            coordinator
                .fail_job(job_id, &format!("continuation dispatch failed: {e}"))
                .await?;
            return Err(crate::error::ImportError::Dispatch(e.to_string()));
        }
    }

    Ok(outcome)
}
