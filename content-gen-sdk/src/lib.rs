//! # Content Generation SDK
//!
//! Turns free-text answers of a generative model into typed, validated and
//! externally verified content suggestions for the portfolio admin: videos,
//! learning roadmaps, lessons and project ideas.
//!
//! This crate provides:
//!
//! - A structured-generation pipeline (prompt, normalize, validate, verify, retry)
//! - Typed clients for the generation endpoint (OpenAI) and the video lookup (YouTube)
//! - Error taxonomy separating upstream, content and caller failures
//! - Configuration management utilities
//!
//! ## Architecture
//!
//! - `GenerationClient`: sends a prompt, returns raw text
//! - `VideoLookup`: authoritative source for video facts
//! - `ContentSuggestionService`: the entry point wiring every stage together
//! - `PipelineError` / `ServiceError`: pipeline and transport failures

pub mod core;
pub use core::{GenerationClient, ServiceClient, VideoLookup};

pub mod services;
pub use services::{openai, youtube};

pub mod error;
pub use error::{ErrorContext, PipelineError, Result, ServiceError, ValidationError, VerificationError};

pub mod pipeline;
pub use pipeline::{
    params, CancellationFlag, ContentSuggestionService, ContentType, GeneratedContent, GenerationOutcome,
    GenerationRequest, ParamValue, Parameters,
};

pub mod config;
pub use config::{ConfigProvider, PipelineConfig, ServiceConfig};

mod util;

#[cfg(test)]
mod tests;

/// Service wired to OpenAI and YouTube from `PORTFOLIO_*` environment variables
pub fn content_service_from_env() -> std::result::Result<ContentSuggestionService, PipelineError> {
    ContentSuggestionService::from_env()
}
