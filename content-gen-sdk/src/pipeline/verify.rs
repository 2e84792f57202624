//! Verification of validated content against an authoritative source

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serde::Serialize;
use url::Url;

use super::schema::{ValidatedContent, VideoSuggestion};
use super::ContentType;
use crate::config::PipelineConfig;
use crate::core::VideoLookup;
use crate::error::{PipelineError, VerificationError};
use crate::services::youtube::VideoMetadata;

/// A video suggestion confirmed by the lookup, with the lookup's own facts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedVideo {
    #[serde(flatten)]
    pub suggestion: VideoSuggestion,
    pub metadata: VideoMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VerifiedContent {
    Video(VerifiedVideo),
}

/// What a successful run hands back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GeneratedContent {
    /// Content type without a verifier
    Validated(ValidatedContent),
    Verified(VerifiedContent),
}

impl GeneratedContent {
    pub fn content_type(&self) -> ContentType {
        match self {
            GeneratedContent::Validated(content) => content.content_type(),
            GeneratedContent::Verified(VerifiedContent::Video(_)) => ContentType::Video,
        }
    }

    pub fn as_verified_video(&self) -> Option<&VerifiedVideo> {
        match self {
            GeneratedContent::Verified(VerifiedContent::Video(video)) => Some(video),
            GeneratedContent::Validated(_) => None,
        }
    }

    pub fn as_validated(&self) -> Option<&ValidatedContent> {
        match self {
            GeneratedContent::Validated(content) => Some(content),
            GeneratedContent::Verified(_) => None,
        }
    }
}

/// Content-type-specific check against an external source of truth
#[async_trait]
pub trait ExternalVerifier: Send + Sync {
    /// The content type this verifier accepts
    fn content_type(&self) -> ContentType;

    async fn verify(&self, content: &ValidatedContent) -> Result<VerifiedContent, PipelineError>;
}

/// Confirms that a suggested video exists, is popular enough and has a
/// thumbnail served from the expected image host.
pub struct VideoVerifier<L: VideoLookup + ?Sized> {
    lookup: Arc<L>,
    min_view_count: u64,
    thumbnail_host: Regex,
}

impl<L: VideoLookup + ?Sized> VideoVerifier<L> {
    /// Verifier with the default view threshold and thumbnail host pattern
    pub fn new(lookup: Arc<L>) -> Result<Self, PipelineError> {
        Self::from_config(lookup, &PipelineConfig::default())
    }

    pub fn from_config(lookup: Arc<L>, config: &PipelineConfig) -> Result<Self, PipelineError> {
        let thumbnail_host = config
            .thumbnail_host_regex()
            .map_err(|e| PipelineError::configuration(e.to_string()))?;

        Ok(Self {
            lookup,
            min_view_count: config.min_view_count,
            thumbnail_host,
        })
    }

    pub fn with_min_view_count(mut self, min_view_count: u64) -> Self {
        self.min_view_count = min_view_count;
        self
    }

    pub fn min_view_count(&self) -> u64 {
        self.min_view_count
    }

    async fn verify_video(&self, suggestion: &VideoSuggestion) -> Result<VerifiedVideo, PipelineError> {
        let id = suggestion.youtube_id.as_str();
        debug!("Verifying video {}", id);

        let metadata = self
            .lookup
            .lookup_video(id)
            .await?
            .ok_or_else(|| VerificationError::NotFound(id.to_string()))?;

        if metadata.view_count < self.min_view_count {
            return Err(VerificationError::LowQuality {
                id: id.to_string(),
                views: metadata.view_count,
                minimum: self.min_view_count,
            }
            .into());
        }

        self.check_thumbnail(&metadata)?;

        debug!("Video {} verified with {} views", id, metadata.view_count);
        Ok(VerifiedVideo {
            suggestion: suggestion.clone(),
            metadata,
        })
    }

    fn check_thumbnail(&self, metadata: &VideoMetadata) -> Result<(), VerificationError> {
        let raw = metadata
            .thumbnail_url
            .as_deref()
            .ok_or_else(|| VerificationError::FormatMismatch(format!("{} has no thumbnail", metadata.id)))?;

        let url = Url::parse(raw)
            .map_err(|_| VerificationError::FormatMismatch(format!("thumbnail URL {:?} is not a URL", raw)))?;

        if url.scheme() != "https" {
            return Err(VerificationError::FormatMismatch(format!(
                "thumbnail URL {:?} is not https",
                raw
            )));
        }

        match url.host_str() {
            Some(host) if self.thumbnail_host.is_match(host) => Ok(()),
            _ => Err(VerificationError::FormatMismatch(format!(
                "thumbnail host of {:?} is not an authoritative image host",
                raw
            ))),
        }
    }
}

impl<L: VideoLookup + ?Sized> std::fmt::Debug for VideoVerifier<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoVerifier")
            .field("min_view_count", &self.min_view_count)
            .field("thumbnail_host", &self.thumbnail_host.as_str())
            .finish()
    }
}

#[async_trait]
impl<L: VideoLookup + ?Sized + 'static> ExternalVerifier for VideoVerifier<L> {
    fn content_type(&self) -> ContentType {
        ContentType::Video
    }

    async fn verify(&self, content: &ValidatedContent) -> Result<VerifiedContent, PipelineError> {
        match content {
            ValidatedContent::Video(video) => Ok(VerifiedContent::Video(self.verify_video(video).await?)),
            other => Err(PipelineError::configuration(format!(
                "video verifier cannot verify {} content",
                other.content_type()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MockVideoLookup;
    use crate::error::ServiceError;
    use mockall::predicate::eq;

    fn suggestion() -> ValidatedContent {
        ValidatedContent::Video(VideoSuggestion {
            title: "Graph Traversal".to_string(),
            youtube_id: "dQw4w9WgXcQ".to_string(),
            description: String::new(),
            duration: "0:04:26".to_string(),
            category: "Other".to_string(),
            tags: vec![],
        })
    }

    fn metadata(views: u64, thumbnail: Option<&str>) -> VideoMetadata {
        VideoMetadata {
            id: "dQw4w9WgXcQ".to_string(),
            title: "Graph Traversal (official)".to_string(),
            channel_title: "CS Channel".to_string(),
            published_at: None,
            thumbnail_url: thumbnail.map(str::to_string),
            view_count: views,
            like_count: Some(10),
            duration: Some("0:04:26".to_string()),
        }
    }

    fn verifier_returning(result: Option<VideoMetadata>) -> VideoVerifier<MockVideoLookup> {
        let mut lookup = MockVideoLookup::new();
        lookup
            .expect_lookup_video()
            .with(eq("dQw4w9WgXcQ"))
            .times(1)
            .returning(move |_| Ok(result.clone()));
        VideoVerifier::new(Arc::new(lookup)).unwrap()
    }

    #[tokio::test]
    async fn test_verified_video_carries_lookup_metadata() {
        let verifier = verifier_returning(Some(metadata(
            2_000_000,
            Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"),
        )));

        let VerifiedContent::Video(video) = verifier.verify(&suggestion()).await.unwrap();
        assert_eq!(video.metadata.view_count, 2_000_000);
        assert_eq!(video.metadata.title, "Graph Traversal (official)");
        assert_eq!(video.suggestion.title, "Graph Traversal");
    }

    #[tokio::test]
    async fn test_not_found() {
        let err = verifier_returning(None).verify(&suggestion()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Verification(VerificationError::NotFound(ref id)) if id == "dQw4w9WgXcQ"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_low_quality_checked_before_thumbnail() {
        let verifier = verifier_returning(Some(metadata(99_999, Some("http://evil.example.com/x.jpg"))));
        let err = verifier.verify(&suggestion()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Verification(VerificationError::LowQuality { views: 99_999, minimum: 100_000, .. })
        ));
    }

    #[tokio::test]
    async fn test_view_threshold_is_inclusive() {
        let verifier = verifier_returning(Some(metadata(100_000, Some("https://i9.ytimg.com/vi/x/default.jpg"))));
        assert!(verifier.verify(&suggestion()).await.is_ok());
    }

    #[tokio::test]
    async fn test_thumbnail_format_mismatch() {
        for thumbnail in [
            None,
            Some("http://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg"),
            Some("https://cdn.example.com/dQw4w9WgXcQ.jpg"),
            Some("https://i.ytimg.com.evil.net/x.jpg"),
            Some("not a url"),
        ] {
            let verifier = verifier_returning(Some(metadata(500_000, thumbnail)));
            let err = verifier.verify(&suggestion()).await.unwrap_err();
            assert!(
                matches!(err, PipelineError::Verification(VerificationError::FormatMismatch(_))),
                "thumbnail {:?}",
                thumbnail
            );
        }
    }

    #[tokio::test]
    async fn test_lookup_failure_is_upstream() {
        let mut lookup = MockVideoLookup::new();
        lookup
            .expect_lookup_video()
            .returning(|_| Err(ServiceError::rate_limit("quota exceeded")));
        let verifier = VideoVerifier::new(Arc::new(lookup)).unwrap();

        let err = verifier.verify(&suggestion()).await.unwrap_err();
        assert!(err.is_upstream());
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_custom_threshold_and_wrong_content_type() {
        let verifier = verifier_returning(Some(metadata(5_000, Some("https://img.youtube.com/vi/x/0.jpg"))))
            .with_min_view_count(1_000);
        assert!(verifier.verify(&suggestion()).await.is_ok());

        let lesson = ValidatedContent::Lesson(crate::pipeline::LessonSuggestion {
            title: "t".to_string(),
            summary: String::new(),
            content: "c".to_string(),
            difficulty: "Beginner".to_string(),
            duration: "0:00:00".to_string(),
            tags: vec![],
        });
        let verifier = VideoVerifier::new(Arc::new(MockVideoLookup::new())).unwrap();
        let err = verifier.verify(&lesson).await.unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
