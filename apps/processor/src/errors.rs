use thiserror::Error;
use uuid::Uuid;

use crate::ai_client::AiError;
use crate::models::resume::ResumeStatus;

/// Pipeline-level error type. Every job handler returns this; the
/// orchestrator classifies it into retry, terminal failure, or the quota
/// downgrade via `is_retryable` / `is_quota`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("{0}")]
    TextTooSparse(String),

    #[error("{0}")]
    TextTooLong(String),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Resume {0} not found")]
    ResumeNotFound(Uuid),

    #[error("Job posting {0} not found")]
    PostingNotFound(Uuid),

    #[error("Job posting {0} is no longer active")]
    PostingInactive(Uuid),

    #[error("Job posting {0} has expired")]
    PostingExpired(Uuid),

    #[error("Invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: ResumeStatus, to: ResumeStatus },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PipelineError {
    /// Whether the job layer should spend a retry attempt on this error.
    ///
    /// Deterministic failures (bad format, sparse text, contract-violating
    /// AI output, inactive postings) retry to the same result and are
    /// terminal on first sight.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Storage(_)
            | PipelineError::Database(_)
            | PipelineError::Internal(_) => true,
            PipelineError::Ai(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Whether this is a quota/rate-limit failure that should suppress
    /// further automatic retries (the job is completed, not failed, and
    /// the résumé enters its quota-failure state).
    pub fn is_quota(&self) -> bool {
        matches!(self, PipelineError::Ai(AiError::RateLimited { .. }))
    }
}
