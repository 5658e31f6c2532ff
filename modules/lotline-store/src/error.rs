use uuid::Uuid;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Import job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
