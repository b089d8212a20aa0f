//! SQLite-based vector store implementation.
//!
//! Embeddings are stored as little-endian `f32` blobs and cosine similarity
//! is computed in Rust. A video row is written in the same transaction as its
//! entries, so a video is either fully indexed or absent.

use super::{rank, IndexEntry, IndexedVideo, ScoredEntry, VectorStore};
use crate::error::{Result, TubeQaError};
use crate::video::VideoId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS videos (
    video_id TEXT PRIMARY KEY,
    video_title TEXT NOT NULL,
    chunk_count INTEGER NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS entries (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    video_id TEXT NOT NULL,
    text TEXT NOT NULL,
    sequence_index INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL,
    UNIQUE (video_id, sequence_index)
);

CREATE INDEX IF NOT EXISTS idx_entries_video_id ON entries(video_id);
"#;

const ENTRY_COLUMNS: &str = r#"
    e.id, e.video_id, v.video_title, e.text, e.sequence_index, e.embedding, e.indexed_at
    FROM entries e
    JOIN videos v ON v.video_id = e.video_id
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a SQLite vector store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TubeQaError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    /// Map a row selected with [`ENTRY_COLUMNS`].
    fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<IndexEntry> {
        let id_str: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(5)?;
        let sequence_index: i64 = row.get(4)?;
        let indexed_at_str: String = row.get(6)?;

        Ok(IndexEntry {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            video_id: VideoId::from_stored(row.get(1)?),
            video_title: row.get(2)?,
            text: row.get(3)?,
            sequence_index: sequence_index as usize,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            indexed_at: Self::parse_timestamp(&indexed_at_str),
        })
    }

    fn row_to_video(row: &Row<'_>) -> rusqlite::Result<IndexedVideo> {
        let indexed_at_str: String = row.get(3)?;
        Ok(IndexedVideo {
            video_id: VideoId::from_stored(row.get(0)?),
            video_title: row.get(1)?,
            chunk_count: row.get(2)?,
            indexed_at: Self::parse_timestamp(&indexed_at_str),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, entries), fields(video_id = %video_id, count = entries.len()))]
    async fn insert_video(
        &self,
        video_id: &VideoId,
        video_title: &str,
        entries: &[IndexEntry],
    ) -> Result<bool> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let inserted = tx.execute(
            r#"
            INSERT OR IGNORE INTO videos (video_id, video_title, chunk_count, indexed_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                video_id.as_str(),
                video_title,
                entries.len() as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;

        if inserted == 0 {
            debug!("Video {} already present, nothing written", video_id);
            return Ok(false);
        }

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO entries (id, video_id, text, sequence_index, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;

            for entry in entries {
                stmt.execute(params![
                    entry.id.to_string(),
                    entry.video_id.as_str(),
                    entry.text,
                    entry.sequence_index as i64,
                    Self::embedding_to_bytes(&entry.embedding),
                    entry.indexed_at.to_rfc3339(),
                ])?;
            }
        }

        tx.commit()?;
        info!("Stored {} entries for video {}", entries.len(), video_id);
        Ok(true)
    }

    async fn contains_video(&self, video_id: &VideoId) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM videos WHERE video_id = ?1",
            params![video_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    #[instrument(skip(self, query_embedding, video_ids), fields(videos = video_ids.len()))]
    async fn search(
        &self,
        query_embedding: &[f32],
        video_ids: &[VideoId],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredEntry>> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;

        let placeholders = vec!["?"; video_ids.len()].join(", ");
        let sql = format!(
            "SELECT {} WHERE e.video_id IN ({}) ORDER BY e.seq",
            ENTRY_COLUMNS, placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let candidates = stmt
            .query_map(params_from_iter(video_ids.iter().map(|v| v.as_str())), Self::row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let results = rank(candidates, query_embedding, limit, min_score);
        debug!("Found {} matching entries", results.len());
        Ok(results)
    }

    async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT video_id, video_title, chunk_count, indexed_at
            FROM videos
            ORDER BY indexed_at DESC
            "#,
        )?;

        let videos = stmt
            .query_map([], Self::row_to_video)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(videos)
    }

    #[instrument(skip(self))]
    async fn delete_by_video_id(&self, video_id: &VideoId) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let deleted = tx.execute(
            "DELETE FROM entries WHERE video_id = ?1",
            params![video_id.as_str()],
        )?;
        tx.execute(
            "DELETE FROM videos WHERE video_id = ?1",
            params![video_id.as_str()],
        )?;
        tx.commit()?;

        info!("Deleted {} entries for video {}", deleted, video_id);
        Ok(deleted)
    }

    async fn clear(&self) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let deleted = tx.execute("DELETE FROM entries", [])?;
        tx.execute("DELETE FROM videos", [])?;
        tx.commit()?;

        info!("Cleared vector store ({} entries)", deleted);
        Ok(deleted)
    }

    async fn entry_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;

    fn entries(video: &VideoId, embeddings: &[Vec<f32>]) -> Vec<IndexEntry> {
        embeddings
            .iter()
            .enumerate()
            .map(|(i, embedding)| {
                let chunk = Chunk {
                    video_id: video.clone(),
                    text: format!("{} chunk {}", video, i),
                    sequence_index: i,
                };
                IndexEntry::new(&chunk, "ignored", embedding.clone())
            })
            .collect()
    }

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let video = VideoId::parse("aaaaaaaaaaa").unwrap();

        let inserted = store
            .insert_video(&video, "Test Video", &entries(&video, &[vec![1.0, 0.0, 0.0]]))
            .await
            .unwrap();
        assert!(inserted);

        let videos = store.list_videos().await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].video_id, video);
        assert_eq!(videos[0].chunk_count, 1);

        let results = store.search(&[1.0, 0.0, 0.0], &[video.clone()], 10, 0.0).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].entry.video_title, "Test Video");
        assert_eq!(results[0].entry.embedding, vec![1.0, 0.0, 0.0]);

        let deleted = store.delete_by_video_id(&video).await.unwrap();
        assert_eq!(deleted, 1);

        assert!(store.list_videos().await.unwrap().is_empty());
        assert!(!store.contains_video(&video).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_insert_writes_nothing() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let video = VideoId::parse("aaaaaaaaaaa").unwrap();

        assert!(store
            .insert_video(&video, "Test Video", &entries(&video, &[vec![1.0], vec![0.5]]))
            .await
            .unwrap());
        assert!(!store
            .insert_video(&video, "Test Video", &entries(&video, &[vec![1.0], vec![0.5]]))
            .await
            .unwrap());

        assert_eq!(store.entry_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_no_video_behind() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let video = VideoId::parse("aaaaaaaaaaa").unwrap();

        // Duplicate sequence indexes violate the unique constraint mid-transaction.
        let mut batch = entries(&video, &[vec![1.0], vec![0.5]]);
        batch[1].sequence_index = 0;

        assert!(store.insert_video(&video, "Test Video", &batch).await.is_err());
        assert!(!store.contains_video(&video).await.unwrap());
        assert_eq!(store.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_restriction_and_tie_order() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let a = VideoId::parse("aaaaaaaaaaa").unwrap();
        let b = VideoId::parse("bbbbbbbbbbb").unwrap();

        store
            .insert_video(&a, "A", &entries(&a, &[vec![0.5, 0.5], vec![0.5, 0.5]]))
            .await
            .unwrap();
        store.insert_video(&b, "B", &entries(&b, &[vec![1.0, 0.0]])).await.unwrap();

        let results = store.search(&[1.0, 0.0], &[a.clone()], 10, -1.0).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.entry.video_id == a));
        assert_eq!(results[0].entry.sequence_index, 0);
        assert_eq!(results[1].entry.sequence_index, 1);

        let both = store.search(&[1.0, 0.0], &[a.clone(), b.clone()], 1, -1.0).await.unwrap();
        assert_eq!(both[0].entry.video_id, b);
    }

    #[tokio::test]
    async fn test_entries_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("vectors.db");
        let video = VideoId::parse("aaaaaaaaaaa").unwrap();

        {
            let store = SqliteVectorStore::new(&path).unwrap();
            store
                .insert_video(&video, "Test Video", &entries(&video, &[vec![1.0], vec![0.0]]))
                .await
                .unwrap();
        }

        let store = SqliteVectorStore::new(&path).unwrap();
        assert!(store.contains_video(&video).await.unwrap());
        let stored = store.search(&[1.0], &[video.clone()], 10, f32::MIN).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].entry.text, "aaaaaaaaaaa chunk 1");

        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.entry_count().await.unwrap(), 0);
    }
}
