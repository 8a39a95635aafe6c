use thiserror::Error;

/// Failure of the underlying remote call itself (connect, timeout, bad body).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError(format!("request timed out: {}", err))
        } else {
            TransportError(err.to_string())
        }
    }
}

/// Run-level errors. Every variant is fatal to the run; per-item problems
/// are reported as `DeleteOutcome` values instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweepError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("remote error: has_more was set without a next cursor")]
    MissingCursor,

    #[error("missing required parameter: {0}")]
    Config(String),
}

impl From<TransportError> for SweepError {
    fn from(err: TransportError) -> Self {
        SweepError::Transport(err.0)
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;
