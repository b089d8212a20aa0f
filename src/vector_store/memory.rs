//! In-memory vector store implementation.
//!
//! Useful for testing and one-off sessions.

use super::{rank, IndexEntry, IndexedVideo, ScoredEntry, VectorStore};
use crate::error::{Result, TubeQaError};
use crate::video::VideoId;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct MemoryState {
    videos: Vec<IndexedVideo>,
    /// Entries in insertion order.
    entries: Vec<IndexEntry>,
}

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    state: RwLock<MemoryState>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|e| TubeQaError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|e| TubeQaError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn insert_video(
        &self,
        video_id: &VideoId,
        video_title: &str,
        entries: &[IndexEntry],
    ) -> Result<bool> {
        let mut state = self.write()?;

        if state.videos.iter().any(|v| &v.video_id == video_id) {
            return Ok(false);
        }

        state.entries.extend(entries.iter().cloned());
        state.videos.push(IndexedVideo {
            video_id: video_id.clone(),
            video_title: video_title.to_string(),
            chunk_count: entries.len() as u32,
            indexed_at: Utc::now(),
        });
        Ok(true)
    }

    async fn contains_video(&self, video_id: &VideoId) -> Result<bool> {
        let state = self.read()?;
        Ok(state.videos.iter().any(|v| &v.video_id == video_id))
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        video_ids: &[VideoId],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredEntry>> {
        let state = self.read()?;

        let candidates = state
            .entries
            .iter()
            .filter(|e| video_ids.contains(&e.video_id))
            .cloned();

        Ok(rank(candidates, query_embedding, limit, min_score))
    }

    async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        let state = self.read()?;
        let mut videos = state.videos.clone();
        videos.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));
        Ok(videos)
    }

    async fn delete_by_video_id(&self, video_id: &VideoId) -> Result<usize> {
        let mut state = self.write()?;
        let initial_len = state.entries.len();
        state.entries.retain(|e| &e.video_id != video_id);
        state.videos.retain(|v| &v.video_id != video_id);
        Ok(initial_len - state.entries.len())
    }

    async fn clear(&self) -> Result<usize> {
        let mut state = self.write()?;
        let removed = state.entries.len();
        state.entries.clear();
        state.videos.clear();
        Ok(removed)
    }

    async fn entry_count(&self) -> Result<usize> {
        Ok(self.read()?.entries.len())
    }
}
