use thiserror::Error;

#[derive(Error, Debug)]
pub enum NlqError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NlqError {
    /// Store-side failures are worth retrying as-is; validation failures
    /// need a rephrased request first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NlqError::Execution(_))
    }
}

pub type Result<T> = std::result::Result<T, NlqError>;
