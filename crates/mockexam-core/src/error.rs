//! Error types for the exam engine and its external services.
//!
//! `ProviderError` lives here rather than in `mockexam-providers` so the
//! question set builder can downcast service failures and decide whether a
//! retry is worthwhile without string matching.

use thiserror::Error;

use crate::model::ContentArea;
use crate::orchestrator::Phase;

/// Errors that can occur when interacting with an LLM provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Invalid inputs to the scoring curve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    /// There is nothing to score.
    #[error("cannot score an exam with zero items")]
    EmptyExam,

    /// Correct and unanswered counts do not fit inside the item total.
    #[error("inconsistent counts: {correct} correct + {unanswered} unanswered exceeds {total} items")]
    InconsistentCounts {
        total: usize,
        correct: usize,
        unanswered: usize,
    },
}

/// Errors surfaced by the exam session state machine.
#[derive(Debug, Error)]
pub enum ExamError {
    /// The configuration was rejected before any network call.
    #[error("invalid exam configuration: {0}")]
    Configuration(String),

    /// Generating the item set failed; the session stays in selection.
    #[error("failed to generate items for {area}: {source:#}")]
    Generation {
        area: ContentArea,
        #[source]
        source: anyhow::Error,
    },

    /// The operation is not allowed in the current phase.
    #[error("cannot {operation} while the session is in the {phase} phase")]
    InvalidPhase { operation: &'static str, phase: Phase },

    /// The item number does not exist in this session.
    #[error("no item numbered {0} in this session")]
    UnknownItem(u32),

    /// The essay phase was requested for a configuration without an essay.
    #[error("this exam does not include an essay")]
    EssayNotIncluded,

    /// The clock ran out; answers and essay are frozen until grading succeeds.
    #[error("cannot {operation}: time is up")]
    TimeUp { operation: &'static str },

    /// An outcome arrived for a session that has since been replaced.
    #[error("outcome belongs to a superseded session")]
    StaleSession,

    /// The scoring curve rejected its inputs.
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    /// An external payload failed schema validation.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl ExamError {
    pub(crate) fn invalid_phase(operation: &'static str, phase: Phase) -> Self {
        ExamError::InvalidPhase { operation, phase }
    }
}
