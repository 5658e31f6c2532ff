// Multi-lane scrape runner. The work list is split round-robin across N
// lanes; each lane is a strictly sequential queue, so the only concurrency
// is across lanes and at most N browser sessions are ever live.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use lotline_common::dataset::SourceDataset;
use lotline_common::types::RawValuation;

use crate::address::clean_address;
use crate::rate_limit::RateLimiter;
use crate::retry::{RetryClassifier, RetryDecision};
use crate::valuation::{LookupOutcome, ValuationSource};

#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Found,
    NotFound,
    /// Blank or unusable address: recorded without consuming a browser
    /// session or any retry budget.
    Skipped,
    Failed {
        attempts: u32,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub address: String,
    pub lane: usize,
    pub result: TaskResult,
}

#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub address: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub outcomes: Vec<ScrapeOutcome>,
}

impl ScrapeReport {
    pub fn found(&self) -> usize {
        self.count(|r| matches!(r, TaskResult::Found))
    }

    pub fn not_found(&self) -> usize {
        self.count(|r| matches!(r, TaskResult::NotFound))
    }

    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, TaskResult::Skipped))
    }

    pub fn failures(&self) -> Vec<TaskFailure> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.result {
                TaskResult::Failed { reason, .. } => Some(TaskFailure {
                    address: o.address.clone(),
                    reason: reason.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&TaskResult) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.result)).count()
    }
}

pub struct ScrapeQueueManager {
    source: Arc<dyn ValuationSource>,
    dataset: Arc<SourceDataset>,
    classifier: RetryClassifier,
    min_spacing: Duration,
    max_attempts: u32,
    /// Recorded as the valuation source on every write-back.
    source_label: String,
}

impl ScrapeQueueManager {
    pub fn new(
        source: Arc<dyn ValuationSource>,
        dataset: Arc<SourceDataset>,
        classifier: RetryClassifier,
        min_spacing: Duration,
        max_attempts: u32,
        source_label: &str,
    ) -> Self {
        Self {
            source,
            dataset,
            classifier,
            min_spacing,
            max_attempts: max_attempts.max(1),
            source_label: source_label.to_string(),
        }
    }

    /// Run every address to a terminal result across `lane_count` lanes.
    pub async fn run(&self, addresses: Vec<String>, lane_count: usize) -> ScrapeReport {
        let lane_count = lane_count.max(1);
        let total = addresses.len();
        info!(total, lanes = lane_count, "Scrape run starting");

        let limiter = Arc::new(RateLimiter::new(lane_count, self.min_spacing));
        let queues = partition_round_robin(addresses, lane_count);

        let mut handles = Vec::with_capacity(lane_count);
        for (lane, queue) in queues.into_iter().enumerate() {
            let ctx = LaneContext {
                lane,
                source: self.source.clone(),
                dataset: self.dataset.clone(),
                limiter: limiter.clone(),
                classifier: self.classifier.clone(),
                max_attempts: self.max_attempts,
                source_label: self.source_label.clone(),
            };
            handles.push(tokio::spawn(run_lane(ctx, queue)));
        }

        let mut report = ScrapeReport::default();
        for handle in futures::future::join_all(handles).await {
            match handle {
                Ok(outcomes) => report.outcomes.extend(outcomes),
                Err(e) => error!(error = %e, "Lane task panicked"),
            }
        }

        let failures = report.failures();
        info!(
            total,
            found = report.found(),
            not_found = report.not_found(),
            skipped = report.skipped(),
            failed = failures.len(),
            "Scrape run complete"
        );
        for failure in &failures {
            warn!(
                address = failure.address.as_str(),
                reason = failure.reason.as_str(),
                "Address failed terminally"
            );
        }

        report
    }
}

struct LaneContext {
    lane: usize,
    source: Arc<dyn ValuationSource>,
    dataset: Arc<SourceDataset>,
    limiter: Arc<RateLimiter>,
    classifier: RetryClassifier,
    max_attempts: u32,
    source_label: String,
}

/// Split tasks across lanes by index (`i % lanes`). Order is preserved
/// within a lane only.
fn partition_round_robin(addresses: Vec<String>, lanes: usize) -> Vec<Vec<String>> {
    let mut queues: Vec<Vec<String>> = (0..lanes).map(|_| Vec::new()).collect();
    for (i, address) in addresses.into_iter().enumerate() {
        queues[i % lanes].push(address);
    }
    queues
}

async fn run_lane(ctx: LaneContext, queue: Vec<String>) -> Vec<ScrapeOutcome> {
    let mut outcomes = Vec::with_capacity(queue.len());

    for address in queue {
        let result = run_task(&ctx, &address).await;
        outcomes.push(ScrapeOutcome {
            address,
            lane: ctx.lane,
            result,
        });
    }

    outcomes
}

async fn run_task(ctx: &LaneContext, address: &str) -> TaskResult {
    let normalized = clean_address(Some(address));
    if normalized.is_empty() {
        warn!(lane = ctx.lane, address, "Blank address, skipping");
        return TaskResult::Skipped;
    }

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        ctx.limiter.wait_slot(ctx.lane).await;

        match ctx.source.lookup(&normalized).await {
            Ok(LookupOutcome::Found(reading)) => {
                write_back(ctx, address, RawValuation::found(&ctx.source_label, reading)).await;
                return TaskResult::Found;
            }
            Ok(LookupOutcome::NotFound) => {
                write_back(ctx, address, RawValuation::not_found(&ctx.source_label)).await;
                return TaskResult::NotFound;
            }
            Err(e) => {
                // The context chain carries the upstream status text the
                // classifier matches on.
                let reason = format!("{e:#}");
                match ctx.classifier.classify(&reason, attempt) {
                    RetryDecision::NotFound => {
                        write_back(ctx, address, RawValuation::not_found(&ctx.source_label)).await;
                        return TaskResult::NotFound;
                    }
                    RetryDecision::RetryAfter(wait) => {
                        if attempt >= ctx.max_attempts {
                            error!(
                                lane = ctx.lane,
                                address,
                                attempts = attempt,
                                reason = reason.as_str(),
                                "Max attempts reached, recording terminal failure"
                            );
                            return TaskResult::Failed {
                                attempts: attempt,
                                reason,
                            };
                        }
                        warn!(
                            lane = ctx.lane,
                            address,
                            attempt,
                            wait_ms = wait.as_millis() as u64,
                            reason = reason.as_str(),
                            "Attempt failed, backing off"
                        );
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }
    }
}

async fn write_back(ctx: &LaneContext, address: &str, valuation: RawValuation) {
    match ctx.dataset.set_valuation(address, valuation).await {
        Ok(true) => {}
        Ok(false) => warn!(address, "Scraped address not present in dataset"),
        // A failed write-back loses one enrichment, not the run.
        Err(e) => error!(address, error = %e, "Failed to write valuation back"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_partitions_by_index() {
        let addresses: Vec<String> = (0..7).map(|i| format!("addr-{i}")).collect();
        let queues = partition_round_robin(addresses, 3);

        assert_eq!(queues[0], vec!["addr-0", "addr-3", "addr-6"]);
        assert_eq!(queues[1], vec!["addr-1", "addr-4"]);
        assert_eq!(queues[2], vec!["addr-2", "addr-5"]);
    }

    #[test]
    fn partition_handles_more_lanes_than_work() {
        let queues = partition_round_robin(vec!["a".to_string()], 4);
        assert_eq!(queues.len(), 4);
        assert_eq!(queues[0], vec!["a"]);
        assert!(queues[1].is_empty());
    }
}
