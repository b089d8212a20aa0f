//! Vector store abstraction for TubeQA.
//!
//! [`VectorStore`] is the persistence backend: it stores embedded chunks per
//! video and answers nearest-neighbor queries restricted to a set of videos.
//! [`VectorIndex`] sits on top of a backend and an [`Embedder`](crate::embedding::Embedder)
//! and implements ingestion and retrieval for the rest of the crate.

mod index;
mod memory;
mod sqlite;

pub use index::{IndexOutcome, RetrievedChunk, VectorIndex};
pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::Chunk;
use crate::error::Result;
use crate::video::VideoId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// An embedded chunk persisted in the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Unique entry ID.
    pub id: Uuid,
    /// Video this entry belongs to.
    pub video_id: VideoId,
    /// Title of the video.
    pub video_title: String,
    /// Chunk text.
    pub text: String,
    /// Position of the chunk within its video.
    pub sequence_index: usize,
    /// Embedding of `text`.
    pub embedding: Vec<f32>,
    /// When this entry was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl IndexEntry {
    /// Create an entry for a chunk and its embedding.
    pub fn new(chunk: &Chunk, video_title: &str, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            video_id: chunk.video_id.clone(),
            video_title: video_title.to_string(),
            text: chunk.text.clone(),
            sequence_index: chunk.sequence_index,
            embedding,
            indexed_at: Utc::now(),
        }
    }

    /// The chunk this entry was created from.
    pub fn to_chunk(&self) -> Chunk {
        Chunk {
            video_id: self.video_id.clone(),
            text: self.text.clone(),
            sequence_index: self.sequence_index,
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    /// The matched entry.
    pub entry: IndexEntry,
    /// Cosine similarity to the query (higher is better).
    pub score: f32,
}

/// Summary information about an indexed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedVideo {
    /// Video ID.
    pub video_id: VideoId,
    /// Video title.
    pub video_title: String,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// When the video was indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Atomically store all entries of a video.
    ///
    /// Returns `false` and writes nothing if the video is already present.
    /// Either every entry becomes visible together with the video, or none does.
    async fn insert_video(
        &self,
        video_id: &VideoId,
        video_title: &str,
        entries: &[IndexEntry],
    ) -> Result<bool>;

    /// Check if a video is completely indexed.
    async fn contains_video(&self, video_id: &VideoId) -> Result<bool>;

    /// Nearest-neighbor search over the entries of the given videos.
    ///
    /// Results are ordered by descending score; equal scores keep insertion order.
    async fn search(
        &self,
        query_embedding: &[f32],
        video_ids: &[VideoId],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredEntry>>;

    /// List all indexed videos, most recent first.
    async fn list_videos(&self) -> Result<Vec<IndexedVideo>>;

    /// Delete a video and its entries. Returns the number of entries removed.
    async fn delete_by_video_id(&self, video_id: &VideoId) -> Result<usize>;

    /// Delete everything. Returns the number of entries removed.
    async fn clear(&self) -> Result<usize>;

    /// Get total entry count.
    async fn entry_count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score candidates in insertion order, drop those under `min_score` and keep the best `limit`.
fn rank<I>(candidates: I, query_embedding: &[f32], limit: usize, min_score: f32) -> Vec<ScoredEntry>
where
    I: IntoIterator<Item = IndexEntry>,
{
    let mut results: Vec<ScoredEntry> = candidates
        .into_iter()
        .map(|entry| {
            let score = cosine_similarity(query_embedding, &entry.embedding);
            ScoredEntry { entry, score }
        })
        .filter(|r| r.score >= min_score)
        .collect();

    // Stable sort: ties stay in insertion order.
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    results.truncate(limit);
    results
}
