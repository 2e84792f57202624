//! YouTube Data API client implementation
//!
//! The authoritative source the pipeline verifies suggested videos against.
//! Only `videos.list` is used.

mod models;
pub use models::*;

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use url::Url;

use crate::config::{ServiceConfig, YouTubeConfig, DEFAULT_PROVIDER};
use crate::core::{ServiceClient, VideoLookup};
use crate::error::{Result, ServiceError};
use crate::services::common::{build_http_client, parse_error_response, UserAgent};
use crate::util::sanitize_for_logging;

const VIDEO_PARTS: &str = "snippet,statistics,contentDetails";

/// YouTube Data API client
pub struct YouTubeClient {
    http_client: Client,

    config: YouTubeConfig,
}

impl YouTubeClient {
    /// Create a client from configuration loaded out of the environment
    pub fn from_env() -> Result<Self> {
        let config = YouTubeConfig::from_provider(&**DEFAULT_PROVIDER)?;
        Self::new_with_config(config)
    }

    pub fn new_with_config(config: YouTubeConfig) -> Result<Self> {
        config.validate()?;

        let http_client = build_http_client(
            Some(UserAgent::for_client("YouTube-Client")),
            Some(Duration::from_secs(config.timeout_seconds)),
        )?;

        Ok(Self { http_client, config })
    }

    /// Fetch a batch of videos by id; unknown ids are simply absent from the result
    pub async fn list_videos(&self, ids: &[&str]) -> Result<VideoListResponse> {
        let url = self.videos_url(ids)?;
        debug!("Sending request to YouTube: GET {}", sanitize_for_logging(url.as_str()));

        let response = self.http_client.get(url).send().await?;

        if response.status().is_success() {
            Ok(response.json::<VideoListResponse>().await?)
        } else {
            let error = parse_error_response("youtube", "videos", response).await;
            warn!("YouTube lookup failed: {}", error);
            Err(error)
        }
    }

    fn videos_url(&self, ids: &[&str]) -> Result<Url> {
        let base = format!("{}/videos", self.config.base_url.trim_end_matches('/'));
        let mut url = Url::parse(&base)
            .map_err(|e| ServiceError::configuration(format!("Invalid YouTube base URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("part", VIDEO_PARTS)
            .append_pair("id", &ids.join(","))
            .append_pair("key", &self.config.api_key);

        Ok(url)
    }
}

#[async_trait]
impl ServiceClient for YouTubeClient {
    fn name(&self) -> &str {
        "youtube"
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn health_check(&self) -> Result<bool> {
        // a well-known public video; an empty result still proves the key works
        match self.list_videos(&["jNQXAC9IVRw"]).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("YouTube health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl VideoLookup for YouTubeClient {
    async fn lookup_video(&self, video_id: &str) -> Result<Option<VideoMetadata>> {
        let response = self.list_videos(&[video_id]).await?;

        Ok(response
            .items
            .into_iter()
            .find(|item| item.id == video_id)
            .map(VideoMetadata::from))
    }
}
