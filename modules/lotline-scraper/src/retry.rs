// Failure classification for scrape attempts. One ordered policy table,
// first match wins, shared by every lane. Replaces the per-script backoff
// literals the scraping side otherwise accumulates.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Transient: wait this long, then try the same task again.
    RetryAfter(Duration),
    /// The site has no record of this address. Terminal success with a
    /// placeholder result; retrying would never change the answer.
    NotFound,
}

#[derive(Debug, Clone)]
pub struct RetryClassifier {
    /// Connection aborted mid-flight usually means the remote took offense;
    /// back off on an hours scale before showing up again.
    pub connection_abort_wait: Duration,
    /// Upstream 5xx: short fixed wait.
    pub server_error_wait: Duration,
    /// Explicit rate-limit signal: the limiter's configured retry delay.
    pub rate_limit_wait: Duration,
    /// Fallback backoff: min(attempt * base, cap).
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for RetryClassifier {
    fn default() -> Self {
        Self {
            connection_abort_wait: Duration::from_secs(60 * 60),
            server_error_wait: Duration::from_secs(15),
            rate_limit_wait: Duration::from_secs(30),
            backoff_base: Duration::from_secs(5),
            backoff_cap: Duration::from_secs(120),
        }
    }
}

impl RetryClassifier {
    pub fn new(rate_limit_wait: Duration) -> Self {
        Self {
            rate_limit_wait,
            ..Self::default()
        }
    }

    /// Map an attempt failure to a wait-and-retry decision. `attempt` is
    /// 1-based; it only affects the fallback backoff arm.
    pub fn classify(&self, error: &str, attempt: u32) -> RetryDecision {
        let lowered = error.to_lowercase();

        if lowered.contains("connection aborted") || lowered.contains("err_connection_aborted") {
            return RetryDecision::RetryAfter(self.connection_abort_wait);
        }
        if lowered.contains("500")
            || lowered.contains("502")
            || lowered.contains("503")
            || lowered.contains("server error")
        {
            return RetryDecision::RetryAfter(self.server_error_wait);
        }
        if lowered.contains("429") || lowered.contains("rate limit") {
            return RetryDecision::RetryAfter(self.rate_limit_wait);
        }
        if lowered.contains("no property found") || lowered.contains("not found") {
            return RetryDecision::NotFound;
        }

        let backoff = self
            .backoff_base
            .saturating_mul(attempt.max(1))
            .min(self.backoff_cap);
        RetryDecision::RetryAfter(backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_abort_waits_on_an_hours_scale() {
        let classifier = RetryClassifier::default();
        assert_eq!(
            classifier.classify("net::ERR_CONNECTION_ABORTED", 1),
            RetryDecision::RetryAfter(Duration::from_secs(3600))
        );
    }

    #[test]
    fn server_errors_get_the_fixed_medium_wait() {
        let classifier = RetryClassifier::default();
        assert_eq!(
            classifier.classify("upstream returned 500", 3),
            RetryDecision::RetryAfter(Duration::from_secs(15))
        );
    }

    #[test]
    fn rate_limit_signals_use_the_configured_delay() {
        let classifier = RetryClassifier::new(Duration::from_secs(45));
        assert_eq!(
            classifier.classify("HTTP 429 Too Many Requests", 1),
            RetryDecision::RetryAfter(Duration::from_secs(45))
        );
        assert_eq!(
            classifier.classify("rate limit exceeded", 1),
            RetryDecision::RetryAfter(Duration::from_secs(45))
        );
    }

    #[test]
    fn not_found_is_terminal_not_a_retry() {
        let classifier = RetryClassifier::default();
        assert_eq!(
            classifier.classify("No property found for address", 1),
            RetryDecision::NotFound
        );
    }

    #[test]
    fn unknown_errors_back_off_linearly_up_to_the_cap() {
        let classifier = RetryClassifier::default();
        assert_eq!(
            classifier.classify("something exploded", 2),
            RetryDecision::RetryAfter(Duration::from_secs(10))
        );
        assert_eq!(
            classifier.classify("something exploded", 100),
            RetryDecision::RetryAfter(Duration::from_secs(120))
        );
    }

    #[test]
    fn first_matching_rule_wins() {
        // An aborted connection that also mentions a 500 takes the long wait.
        let classifier = RetryClassifier::default();
        assert_eq!(
            classifier.classify("connection aborted after 500", 1),
            RetryDecision::RetryAfter(Duration::from_secs(3600))
        );
    }
}
