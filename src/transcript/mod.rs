//! Transcript retrieval for YouTube videos.
//!
//! Transcripts come from the captions YouTube publishes for a video. Only
//! the configured languages (English by default) are accepted; a video
//! without a matching caption track has no transcript.

mod cache;
mod youtube;

pub use cache::{CachedFetcher, TranscriptCache};
pub use youtube::YoutubeTranscriptFetcher;

use crate::error::Result;
use crate::video::VideoId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single timed caption segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Caption text.
    pub text: String,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// Duration in seconds.
    pub duration_seconds: f64,
}

impl TranscriptSegment {
    /// Create a new transcript segment.
    pub fn new(text: impl Into<String>, start_seconds: f64, duration_seconds: f64) -> Self {
        Self {
            text: text.into(),
            start_seconds,
            duration_seconds,
        }
    }

    /// End time of this segment in seconds.
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }
}

/// The ordered captions of one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Video this transcript belongs to.
    pub video_id: VideoId,
    /// Language code of the caption track.
    pub language: String,
    /// Segments in playback order.
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Create a new transcript from segments.
    pub fn new(video_id: VideoId, language: impl Into<String>, segments: Vec<TranscriptSegment>) -> Self {
        Self {
            video_id,
            language: language.into(),
            segments,
        }
    }

    /// Concatenated text of all segments, separated by single spaces.
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Total duration covered by the captions.
    pub fn duration_seconds(&self) -> f64 {
        self.segments
            .last()
            .map(|s| s.end_seconds())
            .unwrap_or(0.0)
    }

    /// Whether the transcript holds any text.
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.text.trim().is_empty())
    }
}

/// Trait for transcript providers.
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    /// Fetch the ordered transcript segments of a video.
    ///
    /// Fails with `NoTranscriptAvailable` when the video has no captions in a
    /// supported language and with `Fetch` on network or service failure.
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript>;
}
