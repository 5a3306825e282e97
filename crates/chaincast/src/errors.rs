//! # Error Types

/// Errors from chaincast operations.
#[derive(Debug, thiserror::Error)]
pub enum ChaincastError {
    /// Invalid run configuration; reported at startup, never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown optimizer name in the run configuration.
    #[error("unknown optimizer '{name}' (expected adam, adagrad, or sgd)")]
    UnknownOptimizer {
        /// The name that failed to parse.
        name: String,
    },

    /// A corpus line failed to parse; the run aborts (no per-line recovery).
    #[error("corpus error: {0}")]
    Corpus(String),

    /// Checkpoint state does not match the model it is being loaded into.
    #[error("checkpoint shape mismatch: expected {expected} parameters, found {found}")]
    CheckpointShape {
        /// The parameter count the model expects.
        expected: usize,
        /// The parameter count found in the checkpoint.
        found: usize,
    },

    /// Error from an external estimator component.
    #[error("estimator error: {0}")]
    Estimator(String),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl From<jsonl::ReadError> for ChaincastError {
    fn from(err: jsonl::ReadError) -> Self {
        ChaincastError::Corpus(err.to_string())
    }
}

/// Result type for chaincast operations.
pub type CcResult<T> = core::result::Result<T, ChaincastError>;
