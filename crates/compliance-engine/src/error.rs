use thiserror::Error;

/// Errors surfaced to the caller. AI failures are deliberately absent: the
/// engine degrades to the rule engine instead of erroring.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("analysis task failed: {0}")]
    Internal(String),
}
