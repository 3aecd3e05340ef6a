use thiserror::Error;

/// Errors raised by the processing stages.
#[derive(Debug, Error)]
pub enum PpgError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("insufficient data for {metric}: need at least {needed}, found {found}")]
    InsufficientData {
        metric: &'static str,
        needed: usize,
        found: usize,
    },
    #[error("plot error: {0}")]
    Plot(String),
}

impl PpgError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        PpgError::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PpgError>;
