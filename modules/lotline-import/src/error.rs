use uuid::Uuid;

/// Result type alias for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Import job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Continuation dispatch failed: {0}")]
    Dispatch(String),

    #[error("Store error: {0}")]
    Store(#[from] lotline_store::StoreError),
}
