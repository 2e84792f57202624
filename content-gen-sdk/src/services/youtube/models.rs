//! YouTube Data API v3 data models

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// `videos.list` response
#[derive(Debug, Clone, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoResource {
    pub id: String,

    pub snippet: Option<VideoSnippet>,

    pub statistics: Option<VideoStatistics>,

    #[serde(rename = "contentDetails")]
    pub content_details: Option<ContentDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: String,

    #[serde(default)]
    pub channel_title: String,

    pub published_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    pub default: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
    pub standard: Option<Thumbnail>,
    pub maxres: Option<Thumbnail>,
}

impl Thumbnails {
    /// Largest available thumbnail
    pub fn best(&self) -> Option<&Thumbnail> {
        self.maxres
            .as_ref()
            .or(self.standard.as_ref())
            .or(self.high.as_ref())
            .or(self.medium.as_ref())
            .or(self.default.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

/// Counters arrive as decimal strings; hidden counters are absent
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentDetails {
    /// ISO 8601 duration, e.g. `PT4M26S`
    pub duration: Option<String>,
}

/// Facts about a video as reported by the authoritative source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub channel_title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
    pub view_count: u64,
    pub like_count: Option<u64>,
    /// Canonical `H:MM:SS`
    pub duration: Option<String>,
}

impl From<VideoResource> for VideoMetadata {
    fn from(resource: VideoResource) -> Self {
        let snippet = resource.snippet;
        let statistics = resource.statistics;

        let count = |value: Option<&String>| value.and_then(|v| v.parse::<u64>().ok());

        Self {
            title: snippet.as_ref().map(|s| s.title.clone()).unwrap_or_default(),
            channel_title: snippet.as_ref().map(|s| s.channel_title.clone()).unwrap_or_default(),
            published_at: snippet.as_ref().and_then(|s| s.published_at),
            thumbnail_url: snippet
                .as_ref()
                .and_then(|s| s.thumbnails.best())
                .map(|t| t.url.clone()),
            view_count: count(statistics.as_ref().and_then(|s| s.view_count.as_ref())).unwrap_or(0),
            like_count: count(statistics.as_ref().and_then(|s| s.like_count.as_ref())),
            duration: resource
                .content_details
                .and_then(|d| d.duration)
                .and_then(|d| iso8601_duration_seconds(&d))
                .map(crate::pipeline::format_duration),
            id: resource.id,
        }
    }
}

static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").expect("valid duration regex")
});

/// Total seconds of an ISO 8601 duration as used by YouTube (`P1DT2H3M4S`)
pub fn iso8601_duration_seconds(value: &str) -> Option<u64> {
    let caps = ISO_DURATION.captures(value.trim())?;

    let mut total: u64 = 0;
    for (index, unit) in [(1, 86_400u64), (2, 3_600), (3, 60), (4, 1)] {
        if let Some(m) = caps.get(index) {
            let amount = m.as_str().parse::<u64>().ok()?;
            total = total.checked_add(amount.checked_mul(unit)?)?;
        }
    }
    Some(total)
}
