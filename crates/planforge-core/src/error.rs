//! Error types for PlanForge

use thiserror::Error;

/// Main error type for PlanForge operations
#[derive(Debug, Error)]
pub enum PlanForgeError {
    /// Malformed or missing input (features, request fields, ids)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Dataset too small to train a model
    #[error("Insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// History too short to build a forecast window
    #[error("Insufficient history for {series}: need at least {required} points, got {actual}")]
    InsufficientHistory {
        series: String,
        required: usize,
        actual: usize,
    },

    /// No individual satisfies the hard constraints
    #[error("Constraint infeasible: {0}")]
    ConstraintInfeasible(String),

    /// Unknown model id or version
    #[error("Model not found: {model_id}{}", version.map(|v| format!(" (version {v})")).unwrap_or_default())]
    ModelNotFound {
        model_id: String,
        version: Option<u32>,
    },

    /// Blob or metadata store failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Training diverged or produced unusable weights
    #[error("Training failed: {0}")]
    Training(String),

    /// Unknown optimization result id
    #[error("Result not found: {0}")]
    ResultNotFound(String),

    /// Operation was cancelled before producing any result
    #[error("Operation was cancelled")]
    Cancelled,

    /// Internal error (should not occur in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlanForgeError {
    /// Returns true for failures that may succeed when retried.
    ///
    /// Only persistence failures are transient; everything else is a
    /// property of the input and surfaces immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlanForgeError::Persistence(_))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        PlanForgeError::Validation(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        PlanForgeError::Persistence(msg.into())
    }
}

impl From<std::io::Error> for PlanForgeError {
    fn from(err: std::io::Error) -> Self {
        PlanForgeError::Persistence(err.to_string())
    }
}

/// Result type alias for PlanForge operations
pub type Result<T> = std::result::Result<T, PlanForgeError>;
