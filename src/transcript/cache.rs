//! Local transcript cache.
//!
//! Fetched transcripts are kept in a single JSON file keyed by video id so a
//! video is only fetched from YouTube once.

use super::{Transcript, TranscriptFetcher};
use crate::error::{Result, TubeQaError};
use crate::video::VideoId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

/// JSON-file backed transcript cache.
pub struct TranscriptCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, Transcript>>,
}

impl TranscriptCache {
    /// Open the cache at `path`, loading existing entries.
    ///
    /// An unreadable cache file is treated as empty and replaced on the next write.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Ignoring corrupt transcript cache at {:?}: {}", path, e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        debug!("Loaded {} cached transcripts from {:?}", entries.len(), path);

        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    /// Look up a cached transcript.
    pub fn get(&self, video_id: &VideoId) -> Result<Option<Transcript>> {
        let entries = self.lock()?;
        Ok(entries.get(video_id.as_str()).cloned())
    }

    /// Store a transcript and persist the cache file.
    pub fn insert(&self, transcript: &Transcript) -> Result<()> {
        let mut entries = self.lock()?;
        entries.insert(transcript.video_id.to_string(), transcript.clone());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&*entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Remove every cached transcript. Returns whether a cache file existed.
    pub fn clear(&self) -> Result<bool> {
        let mut entries = self.lock()?;
        entries.clear();

        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!("Removed transcript cache at {:?}", self.path);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Transcript>>> {
        self.entries
            .lock()
            .map_err(|e| TubeQaError::Config(format!("Transcript cache lock poisoned: {}", e)))
    }
}

/// A fetcher that serves transcripts from the cache before asking its inner fetcher.
///
/// Only successful fetches are cached.
pub struct CachedFetcher {
    inner: Arc<dyn TranscriptFetcher>,
    cache: Arc<TranscriptCache>,
}

impl CachedFetcher {
    pub fn new(inner: Arc<dyn TranscriptFetcher>, cache: Arc<TranscriptCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl TranscriptFetcher for CachedFetcher {
    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript> {
        if let Some(transcript) = self.cache.get(video_id)? {
            info!("Transcript for {} loaded from cache", video_id);
            return Ok(transcript);
        }

        let transcript = self.inner.fetch(video_id).await?;

        if let Err(e) = self.cache.insert(&transcript) {
            warn!("Failed to cache transcript for {}: {}", video_id, e);
        }

        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedFetcher;
    use crate::transcript::TranscriptSegment;

    fn id(s: &str) -> VideoId {
        VideoId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(TranscriptCache::open(&dir.path().join("cache.json")).unwrap());
        let inner = Arc::new(ScriptedFetcher::new().with_text("aaaaaaaaaaa", "The sky is blue."));
        let fetcher = CachedFetcher::new(inner.clone(), cache.clone());

        let first = fetcher.fetch(&id("aaaaaaaaaaa")).await.unwrap();
        let second = fetcher.fetch(&id("aaaaaaaaaaa")).await.unwrap();

        assert_eq!(first.full_text(), second.full_text());
        assert_eq!(inner.calls(), 1);
        assert!(cache.get(&id("aaaaaaaaaaa")).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(TranscriptCache::open(&dir.path().join("cache.json")).unwrap());
        let inner = Arc::new(ScriptedFetcher::new());
        let fetcher = CachedFetcher::new(inner.clone(), cache.clone());

        for _ in 0..2 {
            let err = fetcher.fetch(&id("bbbbbbbbbbb")).await.unwrap_err();
            assert!(matches!(err, TubeQaError::NoTranscriptAvailable(_)));
        }
        assert_eq!(inner.calls(), 2);
        assert!(cache.get(&id("bbbbbbbbbbb")).unwrap().is_none());
    }

    #[test]
    fn test_cache_persists_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let cache = TranscriptCache::open(&path).unwrap();
        let transcript = Transcript::new(
            id("aaaaaaaaaaa"),
            "en",
            vec![TranscriptSegment::new("hello", 0.0, 1.0)],
        );
        cache.insert(&transcript).unwrap();

        let reopened = TranscriptCache::open(&path).unwrap();
        let cached = reopened.get(&id("aaaaaaaaaaa")).unwrap().unwrap();
        assert_eq!(cached.segments, transcript.segments);

        assert!(reopened.clear().unwrap());
        assert!(!path.exists());
        assert!(!reopened.clear().unwrap());
        assert!(reopened.get(&id("aaaaaaaaaaa")).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_cache_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json").unwrap();

        let cache = TranscriptCache::open(&path).unwrap();
        assert!(cache.get(&id("aaaaaaaaaaa")).unwrap().is_none());
    }
}
