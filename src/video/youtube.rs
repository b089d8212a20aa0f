//! YouTube metadata lookup.
//!
//! Uses the YouTube Data API when a key is configured and falls back to the
//! public oEmbed endpoint otherwise.

use super::{MetadataSource, VideoId, VideoMetadata};
use crate::error::{Result, TubeQaError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

const DATA_API_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
const OEMBED_URL: &str = "https://www.youtube.com/oembed";

/// Build the HTTP client used for YouTube requests.
///
/// YouTube serves localized pages, so English is requested explicitly.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("tubeqa/", env!("CARGO_PKG_VERSION"))),
    );

    reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| TubeQaError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// YouTube metadata provider.
pub struct YoutubeMetadataSource {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl YoutubeMetadataSource {
    /// Create a metadata source. Without an API key only oEmbed data is available.
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    async fn fetch_data_api(&self, video_id: &VideoId, api_key: &str) -> Result<VideoMetadata> {
        let response = self
            .client
            .get(DATA_API_URL)
            .query(&[
                ("part", "snippet,statistics"),
                ("id", video_id.as_str()),
                ("key", api_key),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TubeQaError::Metadata(format!(
                "YouTube Data API returned {} for {}",
                response.status(),
                video_id
            )));
        }

        let json: Value = response.json().await?;
        parse_data_api_response(video_id, &json)
    }

    async fn fetch_oembed(&self, video_id: &VideoId) -> Result<VideoMetadata> {
        let response = self
            .client
            .get(OEMBED_URL)
            .query(&[("url", video_id.watch_url().as_str()), ("format", "json")])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                return Err(TubeQaError::Metadata(format!(
                    "Video {} not found",
                    video_id
                )));
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(TubeQaError::Metadata(format!(
                    "Video {} is private or cannot be embedded",
                    video_id
                )));
            }
            status => {
                return Err(TubeQaError::Metadata(format!(
                    "oEmbed returned {} for {}",
                    status, video_id
                )));
            }
        }

        let json: Value = response.json().await?;
        parse_oembed_response(video_id, &json)
    }
}

#[async_trait]
impl MetadataSource for YoutubeMetadataSource {
    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &VideoId) -> Result<VideoMetadata> {
        match &self.api_key {
            Some(key) => {
                debug!("Fetching metadata from the YouTube Data API");
                self.fetch_data_api(video_id, key).await
            }
            None => {
                debug!("Fetching metadata from oEmbed");
                self.fetch_oembed(video_id).await
            }
        }
    }
}

/// Parse a `videos.list` response from the YouTube Data API.
fn parse_data_api_response(video_id: &VideoId, json: &Value) -> Result<VideoMetadata> {
    let item = json["items"]
        .as_array()
        .and_then(|items| items.first())
        .ok_or_else(|| TubeQaError::Metadata(format!("Video {} not found", video_id)))?;

    let snippet = &item["snippet"];
    let thumbnails = &snippet["thumbnails"];
    let thumbnail_url = ["high", "medium", "default"]
        .iter()
        .find_map(|size| thumbnails[*size]["url"].as_str())
        .map(|s| s.to_string());

    // The API reports counts as decimal strings.
    let view_count = item["statistics"]["viewCount"]
        .as_str()
        .and_then(|s| s.parse::<u64>().ok());

    Ok(VideoMetadata {
        id: video_id.clone(),
        title: snippet["title"].as_str().unwrap_or("Unknown Title").to_string(),
        description: snippet["description"].as_str().map(|s| s.to_string()),
        channel: snippet["channelTitle"].as_str().map(|s| s.to_string()),
        thumbnail_url,
        view_count,
    })
}

/// Parse an oEmbed response.
fn parse_oembed_response(video_id: &VideoId, json: &Value) -> Result<VideoMetadata> {
    let title = json["title"]
        .as_str()
        .ok_or_else(|| TubeQaError::Metadata(format!("oEmbed response for {} has no title", video_id)))?;

    Ok(VideoMetadata {
        id: video_id.clone(),
        title: title.to_string(),
        description: None,
        channel: json["author_name"].as_str().map(|s| s.to_string()),
        thumbnail_url: json["thumbnail_url"].as_str().map(|s| s.to_string()),
        view_count: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id() -> VideoId {
        VideoId::parse("dQw4w9WgXcQ").unwrap()
    }

    #[test]
    fn test_parse_data_api_response() {
        let body = json!({
            "items": [{
                "snippet": {
                    "title": "Why the sky is blue",
                    "description": "Rayleigh scattering explained",
                    "channelTitle": "Science Hour",
                    "thumbnails": {
                        "default": { "url": "https://i.ytimg.com/default.jpg" },
                        "high": { "url": "https://i.ytimg.com/high.jpg" }
                    }
                },
                "statistics": { "viewCount": "12345" }
            }]
        });

        let meta = parse_data_api_response(&id(), &body).unwrap();
        assert_eq!(meta.title, "Why the sky is blue");
        assert_eq!(meta.channel.as_deref(), Some("Science Hour"));
        assert_eq!(meta.thumbnail_url.as_deref(), Some("https://i.ytimg.com/high.jpg"));
        assert_eq!(meta.view_count, Some(12345));
    }

    #[test]
    fn test_parse_data_api_empty_items() {
        let body = json!({ "items": [] });
        assert!(matches!(
            parse_data_api_response(&id(), &body),
            Err(TubeQaError::Metadata(_))
        ));
    }

    #[test]
    fn test_parse_oembed_response() {
        let body = json!({
            "title": "Why the sky is blue",
            "author_name": "Science Hour",
            "thumbnail_url": "https://i.ytimg.com/hq.jpg"
        });

        let meta = parse_oembed_response(&id(), &body).unwrap();
        assert_eq!(meta.title, "Why the sky is blue");
        assert_eq!(meta.channel.as_deref(), Some("Science Hour"));
        assert!(meta.description.is_none());
        assert!(meta.view_count.is_none());
    }

    #[test]
    fn test_blank_api_key_uses_oembed() {
        let source = YoutubeMetadataSource::new(reqwest::Client::new(), Some("  ".to_string()));
        assert!(source.api_key.is_none());
    }
}
