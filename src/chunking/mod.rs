//! Transcript chunking.
//!
//! Splits transcript text into fixed-size windows that overlap their
//! predecessor, the unit of embedding and retrieval. Windows are measured in
//! characters or whitespace-separated words.

use crate::error::{Result, TubeQaError};
use crate::video::VideoId;
use serde::{Deserialize, Serialize};

/// Unit that window sizes are measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkUnit {
    /// Unicode scalar values.
    #[default]
    Chars,
    /// Whitespace-separated words; windows are re-joined with single spaces.
    Words,
}

impl std::str::FromStr for ChunkUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chars" | "characters" => Ok(ChunkUnit::Chars),
            "words" => Ok(ChunkUnit::Words),
            _ => Err(format!("Unknown chunk unit: {}", s)),
        }
    }
}

impl std::fmt::Display for ChunkUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkUnit::Chars => write!(f, "chars"),
            ChunkUnit::Words => write!(f, "words"),
        }
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Window size in units.
    pub chunk_size: usize,
    /// Units each window shares with the previous one.
    pub overlap: usize,
    /// Unit of measure.
    pub unit: ChunkUnit,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
            unit: ChunkUnit::Chars,
        }
    }
}

impl ChunkingConfig {
    /// Check that windows always advance.
    pub fn validate(&self) -> Result<()> {
        if self.overlap >= self.chunk_size {
            return Err(TubeQaError::InvalidChunkConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// A window of transcript text belonging to one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Video this chunk was cut from.
    pub video_id: VideoId,
    /// Text content of this chunk.
    pub text: String,
    /// Position of this chunk in the video's chunk sequence.
    pub sequence_index: usize,
}

/// Splits text into overlapping windows.
#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkingConfig,
}

impl TextChunker {
    /// Create a chunker, rejecting configurations where `overlap >= chunk_size`.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Split `text` into ordered chunks. The last chunk may be shorter than
    /// `chunk_size`; empty text yields no chunks.
    pub fn chunk(&self, video_id: &VideoId, text: &str) -> Vec<Chunk> {
        let pieces: Vec<String> = match self.config.unit {
            ChunkUnit::Chars => {
                let bounds: Vec<usize> = text
                    .char_indices()
                    .map(|(i, _)| i)
                    .chain(std::iter::once(text.len()))
                    .collect();
                windows(bounds.len() - 1, &self.config)
                    .map(|(start, end)| text[bounds[start]..bounds[end]].to_string())
                    .collect()
            }
            ChunkUnit::Words => {
                let words: Vec<&str> = text.split_whitespace().collect();
                windows(words.len(), &self.config)
                    .map(|(start, end)| words[start..end].join(" "))
                    .collect()
            }
        };

        pieces
            .into_iter()
            .enumerate()
            .map(|(sequence_index, text)| Chunk {
                video_id: video_id.clone(),
                text,
                sequence_index,
            })
            .collect()
    }
}

/// Split `text` for `video_id` with the given configuration.
pub fn chunk_text(video_id: &VideoId, text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    Ok(TextChunker::new(*config)?.chunk(video_id, text))
}

/// Half-open unit ranges of each window over `len` units.
fn windows(len: usize, config: &ChunkingConfig) -> impl Iterator<Item = (usize, usize)> {
    let size = config.chunk_size;
    let step = config.chunk_size - config.overlap;
    let mut start = 0;
    let mut done = len == 0;

    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let end = (start + size).min(len);
        let window = (start, end);
        if end == len {
            done = true;
        } else {
            start += step;
        }
        Some(window)
    })
}
