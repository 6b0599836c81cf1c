use thiserror::Error;

/// Main error type for the bot
#[derive(Error, Debug)]
pub enum BuzzError {
    // Configuration errors
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Provider error: HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    // Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    // Platform rejected the post as duplicate content
    #[error("Duplicate post: {0}")]
    DuplicatePost(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    // Scheduler errors
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for BuzzError
pub type Result<T> = std::result::Result<T, BuzzError>;

impl BuzzError {
    /// True for errors worth retrying on the next scheduled cycle
    /// (transport failures and rate limits), false for everything else.
    pub fn is_transient(&self) -> bool {
        matches!(self, BuzzError::Http(_) | BuzzError::RateLimited(_))
    }
}

impl From<tokio_cron_scheduler::JobSchedulerError> for BuzzError {
    fn from(err: tokio_cron_scheduler::JobSchedulerError) -> Self {
        BuzzError::Scheduler(err.to_string())
    }
}
