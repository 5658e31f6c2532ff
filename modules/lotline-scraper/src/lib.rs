pub mod address;
pub mod queue;
pub mod rate_limit;
pub mod retry;
pub mod valuation;

pub use address::clean_address;
pub use queue::{ScrapeQueueManager, ScrapeReport, TaskFailure, TaskResult};
pub use rate_limit::RateLimiter;
pub use retry::{RetryClassifier, RetryDecision};
pub use valuation::{LookupOutcome, RebrowserValuationSource, ValuationSource};
