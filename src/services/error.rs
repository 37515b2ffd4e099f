use thiserror::Error;

/// Terminal failure modes of the prediction pipeline. None of these are
/// retried beyond the model-fallback chain in `generation`; each maps to a
/// distinct caller-facing message.
#[derive(Debug, Error)]
pub(crate) enum PredictionError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("all candidate models failed, last error: {last_error}")]
    AllModelsExhausted { last_error: String },

    #[error("generation time budget exceeded after {elapsed_seconds:.1}s")]
    Timeout { elapsed_seconds: f64 },

    #[error("model response could not be parsed: {reason}")]
    UnparsableResponse { reason: String },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
