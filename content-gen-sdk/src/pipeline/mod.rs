//! Structured-generation pipeline
//!
//! Turns a free-text model answer into typed, validated and (for videos)
//! externally verified content:
//!
//! ```text
//! PromptBuilder -> GenerationClient -> ResponseNormalizer -> SchemaValidator
//!     -> ExternalVerifier (optional) -> RetryController -> GenerationOutcome
//! ```
//!
//! `ContentSuggestionService` is the entry point; everything else is public so
//! the stages can be used and tested on their own.

pub mod controller;
pub mod normalize;
pub mod prompt;
pub mod schema;
pub mod service;
pub mod verify;

pub use controller::{AttemptOutcome, CancellationFlag, GenerationOutcome, PipelineState, RetryController};
pub use normalize::{NormalizedJson, Recovery, ResponseNormalizer};
pub use prompt::PromptBuilder;
pub use schema::{
    canonicalize_duration, format_duration, Coercion, LessonSuggestion, ProjectSuggestion, RoadmapResource,
    RoadmapStep, RoadmapSuggestion, SchemaValidator, Validated, ValidatedContent, VideoSuggestion,
};
pub use service::ContentSuggestionService;
pub use verify::{ExternalVerifier, GeneratedContent, VerifiedContent, VerifiedVideo, VideoVerifier};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::util::generate_request_id;

/// What a generation run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Roadmap,
    Lesson,
    Project,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Video,
        ContentType::Roadmap,
        ContentType::Lesson,
        ContentType::Project,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Roadmap => "roadmap",
            ContentType::Lesson => "lesson",
            ContentType::Project => "project",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "video" => Ok(ContentType::Video),
            "roadmap" => Ok(ContentType::Roadmap),
            "lesson" => Ok(ContentType::Lesson),
            "project" => Ok(ContentType::Project),
            other => Err(PipelineError::configuration(format!("unknown content type: {:?}", other))),
        }
    }
}

/// A caller-supplied parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Number(f64),
}

impl ParamValue {
    /// True for blank text; numbers always carry a value
    pub fn is_blank(&self) -> bool {
        matches!(self, ParamValue::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => f.write_str(s.trim()),
            ParamValue::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            ParamValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value as f64)
    }
}

pub type Parameters = BTreeMap<String, ParamValue>;

/// One caller invocation. Never mutated; retries work on `next_attempt()` copies.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    request_id: String,
    content_type: ContentType,
    parameters: Parameters,
    attempt: u32,
}

impl GenerationRequest {
    pub fn new(content_type: ContentType, parameters: Parameters) -> Self {
        Self {
            request_id: generate_request_id(),
            content_type,
            parameters,
            attempt: 0,
        }
    }

    /// Same request with the attempt counter set explicitly
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Zero-based attempt counter
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}

/// Build a `Parameters` map from `(key, value)` pairs
pub fn params<K, V, I>(pairs: I) -> Parameters
where
    K: Into<String>,
    V: Into<ParamValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_str() {
        assert_eq!("Video".parse::<ContentType>().unwrap(), ContentType::Video);
        assert_eq!(" roadmap ".parse::<ContentType>().unwrap(), ContentType::Roadmap);
        let err = "podcast".parse::<ContentType>().unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_next_attempt_copies() {
        let request = GenerationRequest::new(ContentType::Lesson, params([("topic", "ownership")]));
        let next = request.next_attempt();
        assert_eq!(request.attempt(), 0);
        assert_eq!(next.attempt(), 1);
        assert_eq!(next.request_id(), request.request_id());
        assert_eq!(next.parameters(), request.parameters());
    }

    #[test]
    fn test_param_value_display() {
        assert_eq!(ParamValue::from(5i64).to_string(), "5");
        assert_eq!(ParamValue::from(2.5).to_string(), "2.5");
        assert_eq!(ParamValue::from("  trees ").to_string(), "trees");
        assert!(ParamValue::from(" ").is_blank());
    }
}
