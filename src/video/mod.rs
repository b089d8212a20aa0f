//! Video identification and metadata.
//!
//! A [`VideoId`] is the canonical key for everything stored about a video:
//! its cached transcript, its chunks and their embeddings.

mod youtube;

pub use youtube::{build_http_client, YoutubeMetadataSource};

use crate::error::{Result, TubeQaError};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use url::Url;

static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("video id pattern is valid"));

/// Canonical YouTube video identifier (11 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Extract a video id from a YouTube URL or a bare id.
    ///
    /// Supports `watch?v=`, `youtu.be/`, `/embed/`, `/shorts/`, `/live/` and `/v/` forms.
    pub fn parse(input: &str) -> Result<Self> {
        Self::extract(input)
            .ok_or_else(|| TubeQaError::InvalidInput(format!("Not a YouTube video URL or ID: {}", input)))
    }

    fn extract(input: &str) -> Option<Self> {
        let input = input.trim();
        if VIDEO_ID_RE.is_match(input) {
            return Some(Self(input.to_string()));
        }

        let url = if input.contains("://") {
            Url::parse(input).ok()?
        } else {
            Url::parse(&format!("https://{}", input)).ok()?
        };

        let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
        let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

        let candidate = match host {
            "youtu.be" => segments.next().map(str::to_string),
            "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
                match segments.next()? {
                    "watch" => url
                        .query_pairs()
                        .find(|(key, _)| key == "v")
                        .map(|(_, value)| value.into_owned()),
                    "embed" | "shorts" | "live" | "v" => segments.next().map(str::to_string),
                    _ => None,
                }
            }
            _ => None,
        }?;

        VIDEO_ID_RE.is_match(&candidate).then_some(Self(candidate))
    }

    /// Wrap an id read back from storage, where it was validated on the way in.
    pub(crate) fn from_stored(id: String) -> Self {
        Self(id)
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Watch URL for this video.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Descriptive metadata about a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Video id.
    pub id: VideoId,
    /// Title.
    pub title: String,
    /// Description (if available).
    pub description: Option<String>,
    /// Channel or author name (if available).
    pub channel: Option<String>,
    /// Thumbnail URL (if available).
    pub thumbnail_url: Option<String>,
    /// View count (only available through the Data API).
    pub view_count: Option<u64>,
}

/// Trait for video metadata providers.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch metadata for a video.
    async fn fetch(&self, video_id: &VideoId) -> Result<VideoMetadata>;
}
