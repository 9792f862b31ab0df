// Store error type

/// Failure reported by the record store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The statement succeeded but produced nothing the caller can use
    #[error("{0}")]
    NoRows(String),

    /// The backend rejected or failed to run the statement
    #[error(transparent)]
    Query(#[from] sqlx::Error),

    #[error("Unsupported database url '{0}': expected mysql:// or sqlite:")]
    UnsupportedUrl(String),
}

impl StoreError {
    pub fn no_rows(message: impl Into<String>) -> Self {
        Self::NoRows(message.into())
    }
}
