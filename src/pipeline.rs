//! Pipeline orchestrator for TubeQA.
//!
//! Coordinates the whole process from transcript retrieval to answering:
//! fetch → chunk → embed and index → retrieve → generate.

use crate::chunking::TextChunker;
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, TubeQaError};
use crate::llm::{LanguageModel, OpenAIChatModel};
use crate::qa::{Answer, QaAgent};
use crate::transcript::{CachedFetcher, TranscriptCache, TranscriptFetcher, YoutubeTranscriptFetcher};
use crate::vector_store::{
    IndexOutcome, IndexedVideo, MemoryVectorStore, RetrievedChunk, SqliteVectorStore, VectorIndex,
    VectorStore,
};
use crate::video::{build_http_client, MetadataSource, VideoId, VideoMetadata, YoutubeMetadataSource};
use futures::future::{join_all, try_join_all};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Result of ingesting one video.
#[derive(Debug, Clone)]
pub struct IngestResult {
    /// Video that was ingested.
    pub video_id: VideoId,
    /// Video title (the id when metadata was unavailable).
    pub title: String,
    /// Number of chunks embedded and stored.
    pub chunks_indexed: usize,
    /// True when the video was already indexed and nothing was done.
    pub skipped: bool,
}

impl IngestResult {
    fn skipped(video_id: VideoId) -> Self {
        Self {
            title: video_id.to_string(),
            video_id,
            chunks_indexed: 0,
            skipped: true,
        }
    }
}

/// The main orchestrator for the TubeQA pipeline.
pub struct Pipeline {
    settings: Settings,
    fetcher: Arc<dyn TranscriptFetcher>,
    transcript_cache: Option<Arc<TranscriptCache>>,
    metadata: Arc<dyn MetadataSource>,
    index: Arc<VectorIndex>,
    agent: QaAgent,
    chunker: TextChunker,
}

impl Pipeline {
    /// Create a pipeline backed by YouTube and OpenAI as configured in `settings`.
    pub fn new(settings: Settings) -> Result<Self> {
        let http = build_http_client(Duration::from_secs(settings.transcript.timeout_seconds))?;

        let fetcher: Arc<dyn TranscriptFetcher> = Arc::new(YoutubeTranscriptFetcher::new(
            http.clone(),
            settings.transcript.languages.clone(),
        ));
        let metadata: Arc<dyn MetadataSource> =
            Arc::new(YoutubeMetadataSource::new(http, settings.youtube.api_key.clone()));

        let store: Arc<dyn VectorStore> = match settings.vector_store.provider.as_str() {
            "sqlite" => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
            "memory" => Arc::new(MemoryVectorStore::new()),
            other => {
                return Err(TubeQaError::Config(format!(
                    "Unknown vector store provider: {} (expected sqlite or memory)",
                    other
                )))
            }
        };

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )?);

        let model: Arc<dyn LanguageModel> = Arc::new(
            OpenAIChatModel::new(&settings.qa.model)?
                .with_temperature(settings.qa.temperature)
                .with_max_tokens(settings.qa.max_tokens),
        );

        let cache_enabled = settings.transcript.cache_enabled;
        let cache_path = settings.transcript_cache_path();
        let pipeline = Self::with_components(settings, fetcher, metadata, store, embedder, model)?;

        if cache_enabled {
            let cache = Arc::new(TranscriptCache::open(&cache_path)?);
            Ok(pipeline.with_transcript_cache(cache))
        } else {
            Ok(pipeline)
        }
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        settings: Settings,
        fetcher: Arc<dyn TranscriptFetcher>,
        metadata: Arc<dyn MetadataSource>,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let chunker = TextChunker::new(settings.chunking.to_config()?)?;
        let index = Arc::new(VectorIndex::new(store, embedder));
        let mut agent = QaAgent::new(index.clone(), model)
            .with_prompts(prompts)
            .with_top_k(settings.qa.top_k);
        if let Some(min_score) = settings.qa.min_score {
            agent = agent.with_min_score(min_score);
        }

        Ok(Self {
            settings,
            fetcher,
            transcript_cache: None,
            metadata,
            index,
            agent,
            chunker,
        })
    }

    /// Serve transcripts through a local cache.
    pub fn with_transcript_cache(mut self, cache: Arc<TranscriptCache>) -> Self {
        self.fetcher = Arc::new(CachedFetcher::new(self.fetcher, cache.clone()));
        self.transcript_cache = Some(cache);
        self
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the vector index.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Fetch, chunk and index a video unless it is already indexed.
    #[instrument(skip(self), fields(input = %input))]
    pub async fn ingest(&self, input: &str) -> Result<IngestResult> {
        let video_id = VideoId::parse(input)?;
        self.ingest_video(video_id).await
    }

    async fn ingest_video(&self, video_id: VideoId) -> Result<IngestResult> {
        if self.index.is_indexed(&video_id).await? {
            info!("Video {} is already indexed, skipping", video_id);
            return Ok(IngestResult::skipped(video_id));
        }

        let title = match self.metadata.fetch(&video_id).await {
            Ok(metadata) => metadata.title,
            Err(e) => {
                warn!("Could not fetch metadata for {}: {}", video_id, e);
                video_id.to_string()
            }
        };

        info!("Fetching transcript for: {}", title);
        let transcript = self.fetcher.fetch(&video_id).await?;
        if transcript.is_empty() {
            return Err(TubeQaError::NoTranscriptAvailable(video_id.to_string()));
        }

        debug!(
            "Transcript has {} segments covering {:.0}s",
            transcript.segments.len(),
            transcript.duration_seconds()
        );

        let chunks = self.chunker.chunk(&video_id, &transcript.full_text());
        info!("Created {} chunks", chunks.len());

        match self.index.index(&video_id, &title, &chunks).await? {
            IndexOutcome::Indexed { chunks } => Ok(IngestResult {
                video_id,
                title,
                chunks_indexed: chunks,
                skipped: false,
            }),
            IndexOutcome::AlreadyIndexed => Ok(IngestResult::skipped(video_id)),
        }
    }

    /// Ingest several videos concurrently.
    ///
    /// Each input gets its own result; one failure does not stop the others.
    pub async fn ingest_all(&self, inputs: &[String]) -> Vec<(String, Result<IngestResult>)> {
        let results = join_all(inputs.iter().map(|input| self.ingest(input))).await;
        inputs.iter().cloned().zip(results).collect()
    }

    /// Ingest the given videos, then answer `question` from their transcripts only.
    ///
    /// Any ingestion failure aborts the request.
    #[instrument(skip(self, inputs), fields(videos = inputs.len()))]
    pub async fn ask(&self, question: &str, inputs: &[String]) -> Result<Answer> {
        let video_ids = self.prepare(inputs).await?;
        self.answer(question, &video_ids).await
    }

    /// Make sure every given video is indexed and return their ids.
    ///
    /// Inputs naming the same video are ingested once. Any failure aborts.
    pub async fn prepare(&self, inputs: &[String]) -> Result<Vec<VideoId>> {
        let mut video_ids: Vec<VideoId> = Vec::with_capacity(inputs.len());
        for input in inputs {
            let video_id = VideoId::parse(input)?;
            if !video_ids.contains(&video_id) {
                video_ids.push(video_id);
            }
        }

        try_join_all(video_ids.iter().map(|id| self.ingest_video(id.clone()))).await?;
        Ok(video_ids)
    }

    /// Answer `question` from the already indexed transcripts of `video_ids`.
    pub async fn answer(&self, question: &str, video_ids: &[VideoId]) -> Result<Answer> {
        self.agent.answer(question, video_ids).await
    }

    /// Return the passages of the given videos most similar to `query`.
    pub async fn search(
        &self,
        query: &str,
        inputs: &[String],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let video_ids = inputs
            .iter()
            .map(|input| VideoId::parse(input))
            .collect::<Result<Vec<_>>>()?;
        self.index.search(query, &video_ids, limit).await
    }

    /// Look up a video's metadata.
    pub async fn metadata(&self, input: &str) -> Result<VideoMetadata> {
        let video_id = VideoId::parse(input)?;
        self.metadata.fetch(&video_id).await
    }

    /// List indexed videos, most recent first.
    pub async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        self.index.store().list_videos().await
    }

    /// Delete the transcript cache. Returns whether anything was removed.
    pub fn clear_transcript_cache(&self) -> Result<bool> {
        match &self.transcript_cache {
            Some(cache) => cache.clear(),
            None => Ok(false),
        }
    }

    /// Remove one video from the index. Returns the number of entries removed.
    #[instrument(skip(self), fields(input = %input))]
    pub async fn remove_video(&self, input: &str) -> Result<usize> {
        let video_id = VideoId::parse(input)?;
        let removed = self.index.store().delete_by_video_id(&video_id).await?;
        info!("Removed {} entries for video {}", removed, video_id);
        Ok(removed)
    }

    /// Delete every indexed video. Returns the number of entries removed.
    pub async fn clear_index(&self) -> Result<usize> {
        self.index.store().clear().await
    }
}
