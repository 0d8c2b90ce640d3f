use thiserror::Error;

#[derive(Debug, Error)]
pub enum MdmError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("orchestration not found: {0}")]
    OrchestrationNotFound(String),

    #[error("invalid parameters for '{code}': {reason}")]
    InvalidParameters { code: String, reason: String },

    #[error("{operation} failed with status {status}: {message}")]
    Remote {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("timed out after {elapsed_secs}s waiting for '{strategy}' to complete")]
    PollTimeout { strategy: String, elapsed_secs: u64 },

    #[error("orchestration '{code}' requests {mode} mode, which is not supported")]
    UnsupportedMode { code: String, mode: String },

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MdmError>;
