//! Error types for large action space exploration.

use thiserror::Error;

/// Result type alias for exploration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid interaction: {0}")]
    InvalidInteraction(String),

    #[error("unsupported combination: {0}")]
    Unsupported(String),

    // Input errors (20-29)
    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("score count {scores} does not match action count {actions}")]
    ScoreMismatch { scores: usize, actions: usize },

    #[error("label references action {action} but batch has {actions} actions")]
    LabelOutOfRange { action: usize, actions: usize },

    // Numerical errors (30-39)
    #[error("numerical instability detected: {0}")]
    NumericalInstability(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Internal errors (90-99)
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidInteraction(_) => 11,
            Error::Unsupported(_) => 12,
            Error::InvalidBatch(_) => 20,
            Error::ScoreMismatch { .. } => 21,
            Error::LabelOutOfRange { .. } => 22,
            Error::NumericalInstability(_) => 30,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
            Error::ThreadPool(_) => 90,
        }
    }

    /// Whether the error originates from configuration rather than input data.
    pub fn is_config(&self) -> bool {
        (10..20).contains(&self.code())
    }
}

impl From<crate::interaction::InteractionParseError> for Error {
    fn from(err: crate::interaction::InteractionParseError) -> Self {
        Error::InvalidInteraction(err.to_string())
    }
}
