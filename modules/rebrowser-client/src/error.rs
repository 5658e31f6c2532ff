use thiserror::Error;

pub type Result<T> = std::result::Result<T, RebrowserError>;

#[derive(Debug, Error)]
pub enum RebrowserError {
    #[error("Failed to connect to remote browser: {0}")]
    Connect(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("No element matched '{selector}' within {timeout_ms}ms")]
    ElementNotFound { selector: String, timeout_ms: u64 },

    #[error("Browser protocol error: {0}")]
    Protocol(String),
}

impl From<chromiumoxide::error::CdpError> for RebrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        RebrowserError::Protocol(err.to_string())
    }
}
