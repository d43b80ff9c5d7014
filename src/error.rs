//! Structured error kinds for the partial dependence core.
//!
//! Every stage of the pipeline reports one of these kinds and the caller
//! decides how to present it. Nothing in the core swallows or retries an
//! error; the only local recovery is removal of temporary scoring artifacts.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the partial dependence pipeline.
#[derive(Debug, Error)]
pub enum PdError {
    /// Empty or invalid grids, unknown columns, unsupported column types.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The base dataset cannot supply the rows the computation needs.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Transport/process failure or a malformed response from the scoring port.
    #[error("scoring failed: {0}")]
    Scoring(String),

    /// The scoring port did not answer within the allowed wait.
    #[error("scoring timed out after {0:?}")]
    Timeout(Duration),

    /// The visualization collaborator could not produce an image.
    #[error("rendering failed: {0}")]
    Render(String),
}

/// Result alias used throughout the crate.
pub type PdResult<T> = Result<T, PdError>;

impl PdError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn insufficient(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    pub fn scoring(msg: impl Into<String>) -> Self {
        Self::Scoring(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// True for the timeout kind, which callers usually treat as retryable.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
