//! Failure taxonomy of the generation pipeline

use thiserror::Error;

use super::ServiceError;

/// Field-level problems found while validating a candidate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Normalized text was not a JSON object
    #[error("parse: {0}")]
    Parse(String),

    #[error("missing_field: {0}")]
    MissingField(String),

    /// Identifier does not match the external system's id format
    #[error("invalid_identifier: {field} = {value:?}")]
    InvalidIdentifier { field: String, value: String },
}

impl ValidationError {
    /// Short machine-friendly kind, e.g. `missing_field`
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::Parse(_) => "parse",
            ValidationError::MissingField(_) => "missing_field",
            ValidationError::InvalidIdentifier { .. } => "invalid_identifier",
        }
    }
}

/// Outcomes of the authoritative lookup that disqualify a candidate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("not_found: no resource with id {0}")]
    NotFound(String),

    #[error("low_quality: {id} has {views} views, minimum is {minimum}")]
    LowQuality { id: String, views: u64, minimum: u64 },

    #[error("format_mismatch: {0}")]
    FormatMismatch(String),
}

impl VerificationError {
    pub fn kind(&self) -> &'static str {
        match self {
            VerificationError::NotFound(_) => "not_found",
            VerificationError::LowQuality { .. } => "low_quality",
            VerificationError::FormatMismatch(_) => "format_mismatch",
        }
    }
}

/// Error raised by any stage of a generation run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Transport or model-side failure (generation or lookup endpoint)
    #[error("upstream error: {0}")]
    Upstream(#[from] ServiceError),

    /// No recoverable JSON object in the model's answer
    #[error("normalization error: {0}")]
    Normalization(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("verification error: {0}")]
    Verification(#[from] VerificationError),

    /// Caller misuse: unknown content type or missing required parameter
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("generation cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn normalization(message: impl Into<String>) -> Self {
        PipelineError::Normalization(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        PipelineError::Configuration(message.into())
    }

    /// Retryable failures trigger a fresh attempt; everything else ends the run.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Upstream(_)
            | PipelineError::Normalization(_)
            | PipelineError::Validation(_)
            | PipelineError::Verification(_) => true,
            PipelineError::Configuration(_) | PipelineError::Cancelled => false,
        }
    }

    /// Failure kind as logged per attempt, e.g. `not_found`
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Upstream(_) => "upstream",
            PipelineError::Normalization(_) => "normalization",
            PipelineError::Validation(err) => err.kind(),
            PipelineError::Verification(err) => err.kind(),
            PipelineError::Configuration(_) => "configuration",
            PipelineError::Cancelled => "cancelled",
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, PipelineError::Upstream(_))
    }

    /// Human-readable reason handed back to callers
    pub fn reason(&self) -> String {
        match self {
            PipelineError::Upstream(err) => format!("The generation service failed: {}", err),
            PipelineError::Normalization(_) => {
                "The model's answer did not contain a JSON object".to_string()
            }
            PipelineError::Validation(err) => format!("Generated content was invalid ({})", err),
            PipelineError::Verification(err) => {
                format!("Generated content failed verification ({})", err)
            }
            PipelineError::Configuration(msg) => format!("Invalid request: {}", msg),
            PipelineError::Cancelled => "Generation was cancelled".to_string(),
        }
    }
}
