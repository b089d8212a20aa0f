//! Error types for TubeQA.

use thiserror::Error;

/// Library-level error type for TubeQA operations.
#[derive(Error, Debug)]
pub enum TubeQaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transcript fetch failed for video {video_id}: {message}")]
    Fetch { video_id: String, message: String },

    #[error("No English transcript available for video {0}")]
    NoTranscriptAvailable(String),

    #[error("Invalid chunk configuration: {0}")]
    InvalidChunkConfig(String),

    #[error("Indexing failed for video {video_id}: {message}")]
    Indexing { video_id: String, message: String },

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Video metadata lookup failed: {0}")]
    Metadata(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl TubeQaError {
    /// Build a fetch error for a video.
    pub fn fetch(video_id: &str, message: impl Into<String>) -> Self {
        Self::Fetch {
            video_id: video_id.to_string(),
            message: message.into(),
        }
    }

    /// Build an indexing error for a video.
    pub fn indexing(video_id: &str, message: impl std::fmt::Display) -> Self {
        Self::Indexing {
            video_id: video_id.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for TubeQA operations.
pub type Result<T> = std::result::Result<T, TubeQaError>;
