// Continuation dispatch: trait boundary + the HTTP self-call used on
// time-boxed runtimes. The coordinator calls this without knowing what is
// on the other end; tests use MockContinuation.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait ContinuationDispatcher: Send + Sync {
    /// Ask the deployment to run `advance` for this job once more.
    async fn dispatch(&self, job_id: Uuid) -> Result<()>;
}

// ---------------------------------------------------------------------------
// HttpContinuation (production)
// ---------------------------------------------------------------------------

/// POSTs the trigger endpoint of our own deployment. Authorized with the
/// shared continuation secret when one is configured.
pub struct HttpContinuation {
    http: reqwest::Client,
    base_url: String,
    shared_secret: Option<String>,
}

impl HttpContinuation {
    pub fn new(base_url: impl Into<String>, shared_secret: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            shared_secret,
        }
    }
}

#[async_trait]
impl ContinuationDispatcher for HttpContinuation {
    async fn dispatch(&self, job_id: Uuid) -> Result<()> {
        let url = format!(
            "{}/api/trigger-import",
            self.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({ "importId": job_id });

        tracing::info!(url = url.as_str(), job_id = %job_id, "Dispatching continuation");

        let mut request = self.http.post(&url).json(&body);
        if let Some(ref secret) = self.shared_secret {
            request = request.bearer_auth(secret);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Continuation dispatch failed ({status}): {error_text}");
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockContinuation (for tests)
// ---------------------------------------------------------------------------

/// Records `dispatch()` calls for test assertions; optionally fails every
/// call to exercise the dispatch-failure path.
pub struct MockContinuation {
    calls: Mutex<Vec<Uuid>>,
    fail: bool,
}

impl MockContinuation {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<Uuid> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockContinuation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContinuationDispatcher for MockContinuation {
    async fn dispatch(&self, job_id: Uuid) -> Result<()> {
        self.calls.lock().unwrap().push(job_id);
        if self.fail {
            anyhow::bail!("dispatch refused (mock)");
        }
        Ok(())
    }
}
