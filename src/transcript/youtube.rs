//! YouTube caption fetcher.
//!
//! Reads the caption track list embedded in the watch page, picks a track in
//! one of the accepted languages and downloads it in the `json3` timed-text
//! format.

use super::{Transcript, TranscriptFetcher, TranscriptSegment};
use crate::error::{Result, TubeQaError};
use crate::video::VideoId;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::{debug, info, instrument};
use url::Url;

static PLAYABILITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""playabilityStatus":\{"status":"([A-Z_]+)""#).expect("playability pattern is valid")
});

const CAPTION_TRACKS_KEY: &str = "\"captionTracks\":";

/// A caption track advertised on the watch page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    /// `"asr"` for auto-generated captions.
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    fn matches_language(&self, language: &str) -> bool {
        let code = self.language_code.to_ascii_lowercase();
        let language = language.to_ascii_lowercase();
        code == language || code.starts_with(&format!("{}-", language))
    }
}

#[derive(Debug, Deserialize)]
struct Json3Body {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Fetches captions directly from YouTube.
pub struct YoutubeTranscriptFetcher {
    client: reqwest::Client,
    languages: Vec<String>,
}

impl YoutubeTranscriptFetcher {
    /// Create a fetcher accepting the given languages, most preferred first.
    pub fn new(client: reqwest::Client, languages: Vec<String>) -> Self {
        let languages = if languages.is_empty() {
            vec!["en".to_string()]
        } else {
            languages
        };
        Self { client, languages }
    }

    async fn get_text(&self, video_id: &VideoId, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TubeQaError::fetch(video_id.as_str(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TubeQaError::fetch(
                video_id.as_str(),
                format!("YouTube returned {}", status),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| TubeQaError::fetch(video_id.as_str(), e.to_string()))
    }
}

#[async_trait]
impl TranscriptFetcher for YoutubeTranscriptFetcher {
    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript> {
        let html = self.get_text(video_id, &video_id.watch_url()).await?;

        let tracks = caption_tracks(video_id, &html)?;
        debug!("Found {} caption tracks", tracks.len());

        let track = select_track(&tracks, &self.languages)
            .ok_or_else(|| TubeQaError::NoTranscriptAvailable(video_id.to_string()))?;
        debug!(
            "Using {} caption track ({})",
            track.language_code,
            if track.is_generated() { "generated" } else { "manual" }
        );

        let url = json3_url(&track.base_url)
            .map_err(|e| TubeQaError::fetch(video_id.as_str(), format!("Bad caption URL: {}", e)))?;
        let body = self.get_text(video_id, url.as_str()).await?;

        let segments = parse_json3(&body)
            .map_err(|e| TubeQaError::fetch(video_id.as_str(), format!("Unreadable captions: {}", e)))?;

        if segments.is_empty() {
            return Err(TubeQaError::NoTranscriptAvailable(video_id.to_string()));
        }

        info!("Fetched {} transcript segments for {}", segments.len(), video_id);
        Ok(Transcript::new(video_id.clone(), track.language_code.clone(), segments))
    }
}

/// Extract the caption track list from a watch page.
///
/// An unplayable video is a fetch failure; a playable video without a track
/// list has no transcript.
fn caption_tracks(video_id: &VideoId, html: &str) -> Result<Vec<CaptionTrack>> {
    if html.contains("class=\"g-recaptcha\"") {
        return Err(TubeQaError::fetch(
            video_id.as_str(),
            "YouTube is rate limiting requests (captcha challenge)",
        ));
    }

    if let Some(caps) = PLAYABILITY_RE.captures(html) {
        let status = &caps[1];
        if matches!(status, "ERROR" | "UNPLAYABLE" | "LOGIN_REQUIRED") {
            return Err(TubeQaError::fetch(
                video_id.as_str(),
                format!("Video is unavailable ({})", status),
            ));
        }
    }

    let Some(start) = html.find(CAPTION_TRACKS_KEY) else {
        return Err(TubeQaError::NoTranscriptAvailable(video_id.to_string()));
    };

    let rest = &html[start + CAPTION_TRACKS_KEY.len()..];
    let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Vec<CaptionTrack>>();

    match stream.next() {
        Some(Ok(tracks)) => Ok(tracks),
        Some(Err(e)) => Err(TubeQaError::fetch(
            video_id.as_str(),
            format!("Malformed caption track list: {}", e),
        )),
        None => Err(TubeQaError::NoTranscriptAvailable(video_id.to_string())),
    }
}

/// Pick the best track: manual captions before generated ones, then by
/// language preference.
fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    [false, true].into_iter().find_map(|generated| {
        languages.iter().find_map(|language| {
            tracks
                .iter()
                .find(|t| t.is_generated() == generated && t.matches_language(language))
        })
    })
}

/// Rewrite a caption URL to request the `json3` format.
fn json3_url(base_url: &str) -> std::result::Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url)?;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "fmt")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("fmt", "json3");
    Ok(url)
}

/// Parse a `json3` timed-text body into ordered segments.
fn parse_json3(body: &str) -> serde_json::Result<Vec<TranscriptSegment>> {
    let parsed: Json3Body = serde_json::from_str(body)?;

    let segments = parsed
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs?.into_iter().map(|s| s.utf8).collect();
            let text = text.replace('\n', " ").trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment::new(
                text,
                event.t_start_ms as f64 / 1000.0,
                event.d_duration_ms as f64 / 1000.0,
            ))
        })
        .collect();

    Ok(segments)
}
