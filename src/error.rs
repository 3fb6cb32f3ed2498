use reqwest::StatusCode;
use tokio_cron_scheduler::JobSchedulerError;

/// Custom Error and Result types to unify errors from all sources.
pub type BotResult<T> = Result<T, BotError>;

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    // Upstream classification
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rate limited by upstream API")]
    RateLimited,
    #[error("Upstream API error: {0}")]
    Upstream(u16),

    // Transport
    #[error("HTTP Error: {0}")]
    Http(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Parse Error: {0}")]
    Parse(String),

    // Local infrastructure
    #[error("Storage Error: {0}")]
    Storage(String),
    #[error("Scheduler Error: {0}")]
    Scheduler(String),
    #[error("Slack Error: {0}")]
    Slack(String),
    #[error("Channel Error: {0}")]
    ChannelSend(String),
    #[error("Configuration Error: {0}")]
    Config(String),
}

impl BotError {
    /// Errors worth another attempt later on.
    pub fn is_transient(&self) -> bool {
        match self {
            BotError::RateLimited | BotError::Timeout | BotError::Http(_) => true,
            BotError::Upstream(status) => *status >= 500,
            _ => false,
        }
    }

    /// Maps a non-success upstream status code to its error class.
    pub fn from_status(status: StatusCode, subject: &str) -> Self {
        match status {
            StatusCode::NOT_FOUND => BotError::NotFound(subject.to_string()),
            StatusCode::TOO_MANY_REQUESTS => BotError::RateLimited,
            other => BotError::Upstream(other.as_u16()),
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            BotError::Timeout
        } else {
            BotError::Http(error.to_string())
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(error: std::io::Error) -> Self {
        BotError::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for BotError {
    fn from(error: serde_json::Error) -> Self {
        BotError::Storage(error.to_string())
    }
}

impl From<JobSchedulerError> for BotError {
    fn from(error: JobSchedulerError) -> Self {
        BotError::Scheduler(error.to_string())
    }
}

impl From<figment::Error> for BotError {
    fn from(error: figment::Error) -> Self {
        BotError::Config(error.to_string())
    }
}
