use thiserror::Error;

/// Result type alias for watcher operations
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Error types for the contract-watching pipeline
#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("explorer request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upstream returned {status} for {url}")]
    Upstream { status: u16, url: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unexpected data shape: {0}")]
    DataShape(String),

    #[error("watcher already registered for {0}")]
    DuplicateWatcher(String),
}

impl WatcherError {
    /// Create a new data-shape error
    pub fn data_shape<S: Into<String>>(message: S) -> Self {
        Self::DataShape(message.into())
    }

    /// Check if this error is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            WatcherError::Network(_) => true,
            WatcherError::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
