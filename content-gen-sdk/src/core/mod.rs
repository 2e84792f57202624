//! Core abstractions for the content generation SDK
//!
//! The pipeline only talks to the outside world through these traits:
//!
//! - `ServiceClient`: identity and health of an upstream HTTP service
//! - `GenerationClient`: sends a prompt to a generative-text endpoint
//! - `VideoLookup`: authoritative lookup of a video by id

use async_trait::async_trait;

use crate::error::Result;
use crate::services::youtube::VideoMetadata;

/// Base trait for all service clients
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// The client name/identifier
    fn name(&self) -> &str;

    fn base_url(&self) -> &str;

    /// Health check for the service
    async fn health_check(&self) -> Result<bool>;
}

/// A generative-text endpoint.
///
/// Implementations perform exactly one request per call and never retry;
/// retry policy belongs to the pipeline's controller. An empty or missing
/// answer is an error, not an empty string.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn send(&self, prompt: &str) -> Result<String>;
}

/// Authoritative source of truth for videos.
///
/// `Ok(None)` means the lookup succeeded and no such video exists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoLookup: Send + Sync {
    async fn lookup_video(&self, video_id: &str) -> Result<Option<VideoMetadata>>;
}
