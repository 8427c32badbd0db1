//! Error taxonomy for the pipeline.
//!
//! `Cancelled` and `Degraded` are deliberately *not* propagated as `Err` by
//! the orchestrator (`validator::CrossSourceValidator`) — they surface as
//! structured outcomes instead, matching the "not an error in logs" rule.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("transient store error: {0}")]
    TransientStore(String),

    #[error("permanent store error: {0}")]
    PermanentStore(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("rule misconfiguration in {rule}: {reason}")]
    RuleMisconfiguration { rule: String, reason: String },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Non-error outcomes that still need to be communicated up the call chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedReason {
    NoSimilarityProvider,
    SimilarityProviderFailed,
    ValidationDeadlineExceeded,
    InternalFailure,
}

impl DegradedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradedReason::NoSimilarityProvider => "no_similarity_provider",
            DegradedReason::SimilarityProviderFailed => "similarity_provider_failed",
            DegradedReason::ValidationDeadlineExceeded => "validation_deadline_exceeded",
            DegradedReason::InternalFailure => "internal_failure",
        }
    }
}
