//! Embedding-backed index over a [`VectorStore`].

use super::{IndexEntry, VectorStore};
use crate::chunking::Chunk;
use crate::embedding::Embedder;
use crate::error::{Result, TubeQaError};
use crate::video::VideoId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

/// Result of indexing a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The video's chunks were embedded and stored.
    Indexed { chunks: usize },
    /// The video was already indexed; nothing was embedded.
    AlreadyIndexed,
}

/// A chunk returned by a similarity search.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Title of the video the chunk belongs to.
    pub video_title: String,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// Stores chunk embeddings and answers similarity queries restricted to a set of videos.
///
/// Indexing a video is idempotent: a video that is already present is never
/// re-embedded, and concurrent calls for the same video are serialized.
pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl VectorIndex {
    /// Create an index over the given store and embedder.
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Whether the video has been completely indexed.
    pub async fn is_indexed(&self, video_id: &VideoId) -> Result<bool> {
        self.store
            .contains_video(video_id)
            .await
            .map_err(|e| TubeQaError::indexing(video_id.as_str(), e))
    }

    fn video_lock(&self, video_id: &VideoId) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| TubeQaError::indexing(video_id.as_str(), format!("Failed to acquire lock: {}", e)))?;
        Ok(locks.entry(video_id.as_str().to_string()).or_default().clone())
    }

    /// Drop the video's lock from the map once no other caller holds it.
    fn release_video_lock(&self, video_id: &VideoId, lock: Arc<tokio::sync::Mutex<()>>) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        // One reference in the map, one in `lock`.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(video_id.as_str());
        }
    }

    /// Embed and store the chunks of a video unless it is already indexed.
    #[instrument(skip(self, chunks), fields(video_id = %video_id, chunks = chunks.len()))]
    pub async fn index(
        &self,
        video_id: &VideoId,
        video_title: &str,
        chunks: &[Chunk],
    ) -> Result<IndexOutcome> {
        let lock = self.video_lock(video_id)?;
        let outcome = {
            let _guard = lock.lock().await;
            self.index_locked(video_id, video_title, chunks).await
        };
        self.release_video_lock(video_id, lock);
        outcome
    }

    async fn index_locked(
        &self,
        video_id: &VideoId,
        video_title: &str,
        chunks: &[Chunk],
    ) -> Result<IndexOutcome> {
        if self.is_indexed(video_id).await? {
            debug!("Video {} already indexed, skipping", video_id);
            return Ok(IndexOutcome::AlreadyIndexed);
        }

        if chunks.is_empty() {
            return Err(TubeQaError::indexing(video_id.as_str(), "no chunks to index"));
        }

        if let Some(stray) = chunks.iter().find(|c| &c.video_id != video_id) {
            return Err(TubeQaError::indexing(
                video_id.as_str(),
                format!("chunk {} belongs to video {}", stray.sequence_index, stray.video_id),
            ));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| TubeQaError::indexing(video_id.as_str(), e))?;

        if embeddings.len() != chunks.len() {
            return Err(TubeQaError::indexing(
                video_id.as_str(),
                format!("expected {} embeddings, got {}", chunks.len(), embeddings.len()),
            ));
        }

        let entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry::new(chunk, video_title, embedding))
            .collect();

        let inserted = self
            .store
            .insert_video(video_id, video_title, &entries)
            .await
            .map_err(|e| TubeQaError::indexing(video_id.as_str(), e))?;

        if !inserted {
            return Ok(IndexOutcome::AlreadyIndexed);
        }

        info!("Indexed {} chunks for video {}", entries.len(), video_id);
        Ok(IndexOutcome::Indexed {
            chunks: entries.len(),
        })
    }

    /// Return up to `top_k` chunks of the given videos most similar to `query`.
    pub async fn search(
        &self,
        query: &str,
        video_ids: &[VideoId],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        self.search_with_threshold(query, video_ids, top_k, f32::MIN)
            .await
    }

    /// Like [`search`](Self::search), dropping chunks that score below `min_score`.
    #[instrument(skip(self, query, video_ids), fields(videos = video_ids.len()))]
    pub async fn search_with_threshold(
        &self,
        query: &str,
        video_ids: &[VideoId],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<RetrievedChunk>> {
        if video_ids.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let results = self
            .store
            .search(&query_embedding, video_ids, top_k, min_score)
            .await?;

        debug!("Retrieved {} chunks", results.len());

        Ok(results
            .into_iter()
            .map(|r| RetrievedChunk {
                chunk: r.entry.to_chunk(),
                video_title: r.entry.video_title,
                score: r.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{chunk_text, ChunkingConfig, ChunkUnit};
    use crate::testing::HashEmbedder;
    use crate::vector_store::{MemoryVectorStore, SqliteVectorStore};

    fn video(id: &str) -> VideoId {
        VideoId::parse(id).unwrap()
    }

    fn chunks(video_id: &VideoId, text: &str) -> Vec<Chunk> {
        let config = ChunkingConfig {
            chunk_size: 20,
            overlap: 5,
            unit: ChunkUnit::Chars,
        };
        chunk_text(video_id, text, &config).unwrap()
    }

    fn memory_index(embedder: Arc<HashEmbedder>) -> VectorIndex {
        VectorIndex::new(Arc::new(MemoryVectorStore::new()), embedder)
    }

    #[tokio::test]
    async fn test_index_is_idempotent() {
        let embedder = Arc::new(HashEmbedder::new());
        let index = memory_index(embedder.clone());
        let id = video("aaaaaaaaaaa");
        let chunks = chunks(&id, "The sky is blue. Grass is green.");

        let first = index.index(&id, "Colors", &chunks).await.unwrap();
        assert_eq!(first, IndexOutcome::Indexed { chunks: 2 });
        assert!(index.is_indexed(&id).await.unwrap());

        let second = index.index(&id, "Colors", &chunks).await.unwrap();
        assert_eq!(second, IndexOutcome::AlreadyIndexed);
        assert_eq!(embedder.batch_calls(), 1);
        assert_eq!(index.store().entry_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_indexing_embeds_once() {
        let embedder = Arc::new(HashEmbedder::new());
        let index = VectorIndex::new(Arc::new(SqliteVectorStore::in_memory().unwrap()), embedder.clone());
        let id = video("aaaaaaaaaaa");
        let chunks = chunks(&id, "The sky is blue. Grass is green.");

        let (a, b) = tokio::join!(
            index.index(&id, "Colors", &chunks),
            index.index(&id, "Colors", &chunks)
        );

        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|o| matches!(o, IndexOutcome::AlreadyIndexed));
        assert_eq!(
            outcomes,
            vec![IndexOutcome::Indexed { chunks: 2 }, IndexOutcome::AlreadyIndexed]
        );
        assert_eq!(embedder.batch_calls(), 1);
        assert_eq!(index.store().entry_count().await.unwrap(), 2);
        assert!(index.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_video_locks_are_dropped_after_indexing() {
        let index = memory_index(Arc::new(HashEmbedder::new()));
        let ids: Vec<VideoId> = ["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"]
            .into_iter()
            .map(video)
            .collect();

        let index = &index;
        let runs = ids.iter().flat_map(|id| {
            let chunks = chunks(id, "The sky is blue.");
            [(id.clone(), chunks.clone()), (id.clone(), chunks)]
        });
        let results = futures::future::join_all(
            runs.map(|(id, chunks)| async move { index.index(&id, "Video", &chunks).await }),
        )
        .await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(index.locks.lock().unwrap().is_empty());

        // Failed attempts release their lock too.
        let failing = memory_index(Arc::new(HashEmbedder::failing()));
        let id = video("ddddddddddd");
        assert!(failing.index(&id, "Video", &chunks(&id, "text")).await.is_err());
        assert!(failing.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_only_returns_requested_videos() {
        let index = memory_index(Arc::new(HashEmbedder::new()));
        let sky = video("aaaaaaaaaaa");
        let cooking = video("bbbbbbbbbbb");

        index
            .index(&sky, "Sky", &chunks(&sky, "The sky is blue. Grass is green."))
            .await
            .unwrap();
        index
            .index(&cooking, "Cooking", &chunks(&cooking, "Boil pasta in salted water."))
            .await
            .unwrap();

        let results = index.search("sky blue", &[cooking.clone()], 8).await.unwrap();
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.chunk.video_id == cooking));
        assert!(results.iter().all(|r| r.video_title == "Cooking"));

        let results = index.search("sky blue", &[sky.clone(), cooking.clone()], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.video_id, sky);
        assert!(results[0].chunk.text.contains("sky is blue"));
    }

    #[tokio::test]
    async fn test_search_results_are_sorted_by_score() {
        let index = memory_index(Arc::new(HashEmbedder::new()));
        let id = video("aaaaaaaaaaa");
        let text = "Rust has ownership. Python has a garbage collector. Go has goroutines.";
        index.index(&id, "Languages", &chunks(&id, text)).await.unwrap();

        let results = index.search("ownership in rust", &[id], 10).await.unwrap();
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_empty_video_list_skips_embedding() {
        let embedder = Arc::new(HashEmbedder::new());
        let index = memory_index(embedder.clone());

        assert!(index.search("anything", &[], 8).await.unwrap().is_empty());
        assert_eq!(embedder.single_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_embedding_leaves_video_unindexed() {
        let embedder = Arc::new(HashEmbedder::failing());
        let index = memory_index(embedder);
        let id = video("aaaaaaaaaaa");

        let result = index.index(&id, "Colors", &chunks(&id, "The sky is blue.")).await;
        assert!(matches!(result, Err(TubeQaError::Indexing { .. })));
        assert!(!index.is_indexed(&id).await.unwrap());
        assert_eq!(index.store().entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejects_empty_and_foreign_chunks() {
        let index = memory_index(Arc::new(HashEmbedder::new()));
        let id = video("aaaaaaaaaaa");
        let other = video("bbbbbbbbbbb");

        assert!(matches!(
            index.index(&id, "Empty", &[]).await,
            Err(TubeQaError::Indexing { .. })
        ));
        assert!(matches!(
            index.index(&id, "Foreign", &chunks(&other, "Not mine.")).await,
            Err(TubeQaError::Indexing { .. })
        ));
        assert!(!index.is_indexed(&id).await.unwrap());
    }
}
