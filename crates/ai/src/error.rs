use thiserror::Error;

/// Failure of a single completion call.
///
/// Every variant is treated as transient by the retry engine; a timeout is
/// just another failure for backoff purposes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AiError {
    #[error("completion request failed: {0}")]
    Transport(String),

    #[error("rate limited by completion service")]
    RateLimited,

    #[error("completion request timed out")]
    Timeout,

    #[error("malformed completion output: {0}")]
    MalformedOutput(String),

    #[error("invalid completion input: {0}")]
    InvalidInput(String),
}

impl AiError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedOutput(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}
